//! Handlers for `/subjects/{id}/alerts` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/subjects/{id}/alerts/active` | The active alert, or `null` |
//! | `POST` | `/subjects/{id}/alerts/{alert_id}/cancel` | Body: `{"reason":"..."}`; 404 unless active and owned |

use axum::{
  Json,
  extract::{Path, State},
};
use serde::Deserialize;
use uuid::Uuid;
use vigil_core::{
  alert::Alert,
  channel::{EmailSender, PushSender, SmsSender},
  store::MonitorStore,
};

use crate::{AppState, error::ApiError};

/// Longest cancellation reason kept; anything longer is truncated.
const MAX_REASON_CHARS: usize = 500;

// ─── Active ───────────────────────────────────────────────────────────────────

/// `GET /subjects/{id}/alerts/active`
pub async fn active<S, P, E, M>(
  State(state): State<AppState<S, P, E, M>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Option<Alert>>, ApiError>
where
  S: MonitorStore,
  P: PushSender,
  E: EmailSender,
  M: SmsSender,
{
  Ok(Json(state.engine.active_alert(id).await?))
}

// ─── Cancel ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct CancelBody {
  pub reason: Option<String>,
}

/// `POST /subjects/{id}/alerts/{alert_id}/cancel`
pub async fn cancel<S, P, E, M>(
  State(state): State<AppState<S, P, E, M>>,
  Path((id, alert_id)): Path<(Uuid, Uuid)>,
  Json(body): Json<CancelBody>,
) -> Result<Json<Alert>, ApiError>
where
  S: MonitorStore,
  P: PushSender,
  E: EmailSender,
  M: SmsSender,
{
  state.limiter.check("cancel", id)?;
  let reason = body
    .reason
    .map(|r| r.trim().chars().take(MAX_REASON_CHARS).collect::<String>())
    .filter(|r| !r.is_empty());
  let alert = state.engine.cancel_alert(id, alert_id, reason).await?;
  Ok(Json(alert))
}

//! Handlers for `/subjects/{id}/check-ins`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/subjects/{id}/check-ins` | Body: `{"method":"manual"}`; resolves any active alert |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;
use vigil_core::{
  channel::{EmailSender, PushSender, SmsSender},
  check_in::CheckInMethod,
  store::MonitorStore,
};

use crate::{AppState, error::ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct CreateBody {
  /// Defaults to `manual`.
  pub method: Option<CheckInMethod>,
}

/// `POST /subjects/{id}/check-ins`
pub async fn create<S, P, E, M>(
  State(state): State<AppState<S, P, E, M>>,
  Path(id): Path<Uuid>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MonitorStore,
  P: PushSender,
  E: EmailSender,
  M: SmsSender,
{
  state.limiter.check("check-in", id)?;
  let method = body.method.unwrap_or(CheckInMethod::Manual);
  let outcome = state.engine.record_check_in(id, method).await?;
  Ok((StatusCode::CREATED, Json(outcome)))
}

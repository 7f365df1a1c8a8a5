//! Scheduled-trigger endpoints, for an external cron.
//!
//! Both are idempotent and safe to call concurrently. A store failure while
//! listing the batch returns 503; failures on single items are counted in the
//! summary instead.

use axum::{Json, extract::State};
use vigil_core::{
  channel::{EmailSender, PushSender, SmsSender},
  store::MonitorStore,
};
use vigil_engine::{DueAlertsSummary, EscalationSummary};

use crate::{AppState, error::ApiError};

/// `POST /jobs/due-alerts`
pub async fn due_alerts<S, P, E, M>(
  State(state): State<AppState<S, P, E, M>>,
) -> Result<Json<DueAlertsSummary>, ApiError>
where
  S: MonitorStore,
  P: PushSender,
  E: EmailSender,
  M: SmsSender,
{
  Ok(Json(state.engine.process_due_alerts().await?))
}

/// `POST /jobs/escalations`
pub async fn escalations<S, P, E, M>(
  State(state): State<AppState<S, P, E, M>>,
) -> Result<Json<EscalationSummary>, ApiError>
where
  S: MonitorStore,
  P: PushSender,
  E: EmailSender,
  M: SmsSender,
{
  Ok(Json(state.engine.process_escalations().await?))
}

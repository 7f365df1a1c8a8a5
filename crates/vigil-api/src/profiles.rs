//! Handlers for `/subjects/{id}/profile` and `/subjects/{id}/next-due`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/subjects/{id}/profile` | Created with defaults on first read |
//! | `PUT`  | `/subjects/{id}/profile` | 400 on an invalid interval, timezone, or time |
//! | `GET`  | `/subjects/{id}/next-due` | `{"next_due_at": "..."}` |

use axum::{
  Json,
  extract::{Path, State},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use vigil_core::{
  channel::{EmailSender, PushSender, SmsSender},
  profile::{Profile, ProfileSettings},
  store::MonitorStore,
};

use crate::{AppState, error::ApiError};

/// `GET /subjects/{id}/profile`
pub async fn get_one<S, P, E, M>(
  State(state): State<AppState<S, P, E, M>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Profile>, ApiError>
where
  S: MonitorStore,
  P: PushSender,
  E: EmailSender,
  M: SmsSender,
{
  Ok(Json(state.engine.profile(id).await?))
}

/// `PUT /subjects/{id}/profile`
pub async fn update<S, P, E, M>(
  State(state): State<AppState<S, P, E, M>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ProfileSettings>,
) -> Result<Json<Profile>, ApiError>
where
  S: MonitorStore,
  P: PushSender,
  E: EmailSender,
  M: SmsSender,
{
  state.limiter.check("profile", id)?;
  let settings = body.validate()?;
  Ok(Json(state.engine.update_profile(id, settings).await?))
}

#[derive(Debug, Serialize)]
pub struct NextDue {
  pub next_due_at: DateTime<Utc>,
}

/// `GET /subjects/{id}/next-due`
pub async fn next_due<S, P, E, M>(
  State(state): State<AppState<S, P, E, M>>,
  Path(id): Path<Uuid>,
) -> Result<Json<NextDue>, ApiError>
where
  S: MonitorStore,
  P: PushSender,
  E: EmailSender,
  M: SmsSender,
{
  let next_due_at = state.engine.next_due(id).await?;
  Ok(Json(NextDue { next_due_at }))
}

//! Handlers for `/subjects/{id}/contacts` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/subjects/{id}/contacts` | Live contacts, priority order |
//! | `POST`   | `/subjects/{id}/contacts` | 400 unless `priority >= 1` |
//! | `DELETE` | `/subjects/{id}/contacts/{contact_id}` | Soft delete; 404 unless owned and live |

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
  contact::{Contact, NewContact},
  store::MonitorStore,
};

use crate::{AppState, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /subjects/{id}/contacts`
pub async fn list<S, P, E, M>(
  State(state): State<AppState<S, P, E, M>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Contact>>, ApiError>
where
  S: MonitorStore,
  P: PushSender,
  E: EmailSender,
  M: SmsSender,
{
  let mut contacts = state
    .engine
    .store()
    .list_contacts(id)
    .await
    .map_err(ApiError::store)?;
  contacts.retain(|c| !c.is_deleted());
  contacts.sort_by_key(|c| c.priority);
  Ok(Json(contacts))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name:            String,
  pub priority:        i64,
  #[serde(default)]
  pub notify_by_email: bool,
  #[serde(default)]
  pub notify_by_sms:   bool,
  pub email:           Option<String>,
  pub phone:           Option<String>,
}

/// `POST /subjects/{id}/contacts`
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
  state.limiter.check("contacts", id)?;
  let name = body.name.trim().to_owned();
  if name.is_empty() {
    return Err(ApiError::BadRequest("name must not be empty".to_owned()));
  }
  let input = NewContact {
    subject_id: id,
    name,
    priority: body.priority,
    notify_by_email: body.notify_by_email,
    notify_by_sms: body.notify_by_sms,
    email: body.email,
    phone: body.phone,
  };
  input.validated_priority()?;

  // Contacts hang off the profile.
  state.engine.profile(id).await?;
  let contact = state
    .engine
    .store()
    .add_contact(input, state.engine.now())
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(contact)))
}

// ─── Remove ───────────────────────────────────────────────────────────────────

/// `DELETE /subjects/{id}/contacts/{contact_id}`
pub async fn remove<S, P, E, M>(
  State(state): State<AppState<S, P, E, M>>,
  Path((id, contact_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError>
where
  S: MonitorStore,
  P: PushSender,
  E: EmailSender,
  M: SmsSender,
{
  state.limiter.check("contacts", id)?;
  let store = state.engine.store();
  let owned = store
    .list_contacts(id)
    .await
    .map_err(ApiError::store)?
    .iter()
    .any(|c| c.contact_id == contact_id && !c.is_deleted());
  if !owned {
    return Err(ApiError::NotFound(format!("contact {contact_id}")));
  }

  let deleted = store
    .soft_delete_contact(contact_id, state.engine.now())
    .await
    .map_err(ApiError::store)?;
  if !deleted {
    return Err(ApiError::NotFound(format!("contact {contact_id}")));
  }
  Ok(StatusCode::NO_CONTENT)
}

//! JSON REST API for Vigil.
//!
//! Exposes an axum [`Router`] over a [`vigil_engine::Engine`]. Authentication
//! and TLS are the caller's responsibility: the `{id}` in every subject path
//! is taken to be the authenticated subject.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", vigil_api::api_router(state))
//! ```

pub mod alerts;
pub mod check_ins;
pub mod contacts;
pub mod error;
pub mod jobs;
pub mod profiles;
pub mod rate_limit;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use vigil_core::{
  channel::{EmailSender, PushSender, SmsSender},
  store::MonitorStore,
};
use vigil_engine::Engine;

pub use error::ApiError;
pub use rate_limit::RateLimiter;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S, P, E, M> {
  pub engine:  Arc<Engine<S, P, E, M>>,
  pub limiter: RateLimiter,
}

impl<S, P, E, M> Clone for AppState<S, P, E, M> {
  fn clone(&self) -> Self {
    Self { engine: self.engine.clone(), limiter: self.limiter.clone() }
  }
}

impl<S, P, E, M> AppState<S, P, E, M> {
  pub fn new(engine: Arc<Engine<S, P, E, M>>, limiter: RateLimiter) -> Self {
    Self { engine, limiter }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, P, E, M>(state: AppState<S, P, E, M>) -> Router<()>
where
  S: MonitorStore + 'static,
  P: PushSender + 'static,
  E: EmailSender + 'static,
  M: SmsSender + 'static,
{
  Router::new()
    // Subject actions
    .route("/subjects/{id}/check-ins", post(check_ins::create::<S, P, E, M>))
    .route(
      "/subjects/{id}/alerts/active",
      get(alerts::active::<S, P, E, M>),
    )
    .route(
      "/subjects/{id}/alerts/{alert_id}/cancel",
      post(alerts::cancel::<S, P, E, M>),
    )
    // Profile
    .route(
      "/subjects/{id}/profile",
      get(profiles::get_one::<S, P, E, M>).put(profiles::update::<S, P, E, M>),
    )
    .route("/subjects/{id}/next-due", get(profiles::next_due::<S, P, E, M>))
    // Contacts
    .route(
      "/subjects/{id}/contacts",
      get(contacts::list::<S, P, E, M>).post(contacts::create::<S, P, E, M>),
    )
    .route(
      "/subjects/{id}/contacts/{contact_id}",
      delete(contacts::remove::<S, P, E, M>),
    )
    // Scheduled triggers
    .route("/jobs/due-alerts", post(jobs::due_alerts::<S, P, E, M>))
    .route("/jobs/escalations", post(jobs::escalations::<S, P, E, M>))
    .with_state(state)
}

//! Fixed-window limit on subject actions, backed by an [`ExpiringStore`].

use std::sync::Arc;

use chrono::Duration;
use uuid::Uuid;
use vigil_core::expiring::{ExpiringStore, MemoryExpiringStore};

use crate::error::ApiError;

#[derive(Clone)]
pub struct RateLimiter {
  store:        Arc<dyn ExpiringStore>,
  max_requests: u64,
  window:       Duration,
}

impl RateLimiter {
  pub fn new(store: Arc<dyn ExpiringStore>, max_requests: u64, window: Duration) -> Self {
    Self { store, max_requests, window }
  }

  /// An in-process limiter.
  pub fn in_memory(max_requests: u64, window: Duration) -> Self {
    Self::new(Arc::new(MemoryExpiringStore::new()), max_requests, window)
  }

  /// Count one `action` by `subject_id`, failing once the window is full.
  pub fn check(&self, action: &str, subject_id: Uuid) -> Result<(), ApiError> {
    let key = format!("rate:{action}:{subject_id}");
    if self.store.increment(&key, self.window) > self.max_requests {
      tracing::warn!(%subject_id, action, "rate limit exceeded");
      return Err(ApiError::RateLimited);
    }
    Ok(())
  }
}

//! Error type for `vigil-engine`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
  /// The alert does not exist, is no longer active, or belongs to someone
  /// else. Deliberately a single variant: callers must not be able to tell
  /// these apart.
  #[error("alert not found")]
  AlertNotFound,

  /// The store failed; nothing was partially applied and the caller may
  /// retry.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl EngineError {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  pub fn is_retryable(&self) -> bool { matches!(self, Self::Store(_)) }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

//! Error types for `vigil-core`.

use thiserror::Error;

use crate::alert::AlertLevel;

#[derive(Debug, Error)]
pub enum Error {
  #[error("check-in interval must be between 1 and 168 hours, got {0}")]
  InvalidInterval(i64),

  #[error("unknown timezone: {0:?}")]
  UnknownTimezone(String),

  #[error("invalid preferred check-in time {0:?}, expected HH:MM")]
  InvalidPreferredTime(String),

  #[error("contact priority must be at least 1, got {0}")]
  InvalidPriority(i64),

  #[error("invalid alert transition from {from} to {to}")]
  InvalidTransition { from: AlertLevel, to: AlertLevel },

  #[error("unknown alert level: {0:?}")]
  UnknownLevel(String),

  #[error("unknown check-in method: {0:?}")]
  UnknownMethod(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

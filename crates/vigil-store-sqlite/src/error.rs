//! Error type for `vigil-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] vigil_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored column held a value the domain types cannot represent.
  #[error("corrupt column {column}: {value:?}")]
  Decode { column: &'static str, value: String },

  #[error("profile not found: {0}")]
  ProfileNotFound(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use vigil_engine::EngineError;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("too many requests")]
  RateLimited,

  /// The store failed. Nothing was applied; the client may retry.
  #[error("service unavailable: {0}")]
  Unavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Unavailable(Box::new(e))
  }
}

impl From<EngineError> for ApiError {
  fn from(e: EngineError) -> Self {
    match e {
      EngineError::AlertNotFound => Self::NotFound("alert not found".to_owned()),
      EngineError::Store(e) => Self::Unavailable(e),
    }
  }
}

impl From<vigil_core::Error> for ApiError {
  fn from(e: vigil_core::Error) -> Self { Self::BadRequest(e.to_string()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
      ApiError::Unavailable(e) => {
        tracing::error!(error = %e, "request failed on store error");
        (StatusCode::SERVICE_UNAVAILABLE, "temporarily unavailable, try again".to_owned())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

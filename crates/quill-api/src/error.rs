//! API error taxonomy and [`axum::response::IntoResponse`] implementation.
//!
//! Every operation converts its failure into one of these variants; nothing
//! else crosses into the HTTP layer. Store failures are logged in full and
//! rendered as an opaque message — internals never leak to the caller.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API operation.
#[derive(Debug, Error)]
pub enum ApiError {
  /// No session at all.
  #[error("You must be logged in")]
  Unauthorized,

  /// Session present, but the caller lacks the role or ownership.
  #[error("{0}")]
  Forbidden(String),

  #[error("{0}")]
  Validation(String),

  #[error("{0}")]
  NotFound(String),

  /// The caller's identity record could not be provisioned.
  #[error("Failed to set up your profile")]
  Profile,

  #[error("A post with this slug already exists")]
  SlugTaken,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Wrap a persistence failure from any store backend.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    ApiError::Store(Box::new(err))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::Validation(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Profile => {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
      }
      ApiError::SlugTaken => (StatusCode::CONFLICT, self.to_string()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store operation failed");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          "Something went wrong".to_string(),
        )
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

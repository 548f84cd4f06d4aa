//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use nutri_core::LedgerFailure;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The targeted row exists but is no longer the latest of its sequence.
  #[error("conflict: {0}")]
  NotLatest(String),

  /// The latest row already carries a weight report.
  #[error("conflict: {0}")]
  AlreadyReported(String),

  #[error("not allowed: {message}")]
  NotAllowed {
    message:        String,
    allowed_from:   NaiveDate,
    days_remaining: i64,
  },

  /// A concurrent writer kept winning the week-number race.
  #[error("unavailable: {0}")]
  Unavailable(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a backend failure by the domain error it carries, falling back
  /// to an internal error for storage faults.
  pub fn from_store<E>(e: E) -> Self
  where
    E: std::error::Error + LedgerFailure + Send + Sync + 'static,
  {
    match e.ledger_error().and_then(classify) {
      Some(api) => api,
      None => ApiError::Store(Box::new(e)),
    }
  }
}

fn classify(e: &nutri_core::Error) -> Option<ApiError> {
  use nutri_core::Error as E;
  let message = e.to_string();
  Some(match e {
    E::Validation(_) => ApiError::BadRequest(message),
    E::ClientNotFound(_)
    | E::GroupNotFound(_)
    | E::TemplateNotFound(_)
    | E::AssignmentNotFound(_)
    | E::NoAssignment(_) => ApiError::NotFound(message),
    E::NotLatest { .. } => ApiError::NotLatest(message),
    E::WeightAlreadyReported(_) => ApiError::AlreadyReported(message),
    E::NotAllowed { allowed_from, days_remaining, .. } => ApiError::NotAllowed {
      message,
      allowed_from: *allowed_from,
      days_remaining: *days_remaining,
    },
    E::Conflict => ApiError::Unavailable(message),
    E::UnknownDietType(_) => return None,
  })
}

impl From<nutri_core::Error> for ApiError {
  fn from(e: nutri_core::Error) -> Self { ApiError::from_store(e) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "error": m })),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
      ApiError::NotLatest(m) | ApiError::AlreadyReported(m) => {
        (StatusCode::CONFLICT, json!({ "error": m }))
      }
      ApiError::NotAllowed { message, allowed_from, days_remaining } => (
        StatusCode::NOT_ACCEPTABLE,
        json!({
          "error": message,
          "allowed_from": allowed_from,
          "days_remaining": days_remaining,
        }),
      ),
      ApiError::Unavailable(m) => {
        (StatusCode::SERVICE_UNAVAILABLE, json!({ "error": m }))
      }
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() }))
      }
    };
    (status, Json(body)).into_response()
  }
}

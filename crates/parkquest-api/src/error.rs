//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error body has the shape `{"error": <message>, "code": <code>}`,
//! where `code` is a stable snake_case identifier clients can match on.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use parkquest_core::error::{
  AwardError, CancelError, CompleteError, DeletePostError, PickError,
  RevokeError, UnassignError,
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("missing or unknown caller")]
  Unauthorized,

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("{0}")]
  Conflict(String),

  /// A business rejection from the assignment engine.
  #[error("{message}")]
  Rejected {
    status:  StatusCode,
    code:    &'static str,
    message: String,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn rejected<R: Rejection>(rejection: R) -> Self {
    ApiError::Rejected {
      status:  rejection.status(),
      code:    rejection.into(),
      message: rejection.to_string(),
    }
  }

  fn code(&self) -> &'static str {
    match self {
      ApiError::NotFound(_) => "not_found",
      ApiError::BadRequest(_) => "bad_request",
      ApiError::Unauthorized => "unauthorized",
      ApiError::Forbidden(_) => "forbidden",
      ApiError::Conflict(_) => "conflict",
      ApiError::Rejected { code, .. } => *code,
      ApiError::Store(_) => "internal",
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::Rejected { status, .. } => *status,
      ApiError::Store(e) => {
        tracing::warn!(error = %e, "store failure");
        StatusCode::INTERNAL_SERVER_ERROR
      }
    };
    let body = json!({ "error": self.to_string(), "code": self.code() });
    (status, Json(body)).into_response()
  }
}

// ─── Rejections ──────────────────────────────────────────────────────────────

/// An engine rejection with a fixed HTTP status.
///
/// Missing rows are 404, ownership failures 403, lost races and state
/// conflicts 409, and requests that make no sense for the current state 422.
pub trait Rejection: std::error::Error + Copy + Into<&'static str> {
  fn status(self) -> StatusCode;
}

const CONFLICT: StatusCode = StatusCode::CONFLICT;
const UNPROCESSABLE: StatusCode = StatusCode::UNPROCESSABLE_ENTITY;

impl Rejection for PickError {
  fn status(self) -> StatusCode {
    match self {
      PickError::NotFound => StatusCode::NOT_FOUND,
      PickError::OutOfWindow => UNPROCESSABLE,
      PickError::NotAvailable
      | PickError::AlreadyTaken
      | PickError::AlreadyAssigned
      | PickError::AlreadyJoined => CONFLICT,
    }
  }
}

impl Rejection for CancelError {
  fn status(self) -> StatusCode {
    match self {
      CancelError::NotFound => StatusCode::NOT_FOUND,
      CancelError::NotYours => UNPROCESSABLE,
    }
  }
}

impl Rejection for CompleteError {
  fn status(self) -> StatusCode {
    match self {
      CompleteError::NotFound => StatusCode::NOT_FOUND,
      CompleteError::NotAssigned | CompleteError::NotJoined => UNPROCESSABLE,
      CompleteError::AlreadySubmitted | CompleteError::Closed => CONFLICT,
    }
  }
}

impl Rejection for AwardError {
  fn status(self) -> StatusCode {
    match self {
      AwardError::NotFound => StatusCode::NOT_FOUND,
      AwardError::NotOpen | AwardError::NoSubmission => UNPROCESSABLE,
      AwardError::AlreadyAwarded => CONFLICT,
    }
  }
}

impl Rejection for UnassignError {
  fn status(self) -> StatusCode {
    match self {
      UnassignError::NotFound => StatusCode::NOT_FOUND,
      UnassignError::NotAssigned => UNPROCESSABLE,
    }
  }
}

impl Rejection for RevokeError {
  fn status(self) -> StatusCode {
    match self {
      RevokeError::NotFound => StatusCode::NOT_FOUND,
      RevokeError::AlreadyRevoked => CONFLICT,
    }
  }
}

impl Rejection for DeletePostError {
  fn status(self) -> StatusCode {
    match self {
      DeletePostError::NotFound => StatusCode::NOT_FOUND,
      DeletePostError::Forbidden => StatusCode::FORBIDDEN,
    }
  }
}

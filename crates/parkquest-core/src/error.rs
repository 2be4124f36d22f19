//! Error types for `parkquest-core`.
//!
//! [`Error`] covers invalid input and undecodable stored values. The
//! per-operation rejection enums are the engine's business verdicts: expected,
//! recoverable outcomes that callers map to user-facing messages.

use strum::IntoStaticStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("challenge title must not be empty")]
  EmptyTitle,

  #[error("challenge points must be positive")]
  NonPositivePoints,

  #[error("challenge window ends before it starts")]
  InvertedWindow,

  #[error("challenge type cannot change while it is in progress or has entrants")]
  TypeLocked,

  #[error("comment content must not be empty")]
  EmptyComment,

  #[error("display name must not be empty")]
  EmptyDisplayName,

  #[error("unknown {kind} discriminant: {value:?}")]
  UnknownDiscriminant { kind: &'static str, value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Rejections ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum PickError {
  #[error("challenge not found")]
  NotFound,

  #[error("challenge is outside its active window")]
  OutOfWindow,

  #[error("challenge is not available")]
  NotAvailable,

  /// Lost the claim race: another user holds the challenge.
  #[error("challenge is already taken by another user")]
  AlreadyTaken,

  #[error("challenge is already assigned to you")]
  AlreadyAssigned,

  #[error("you have already joined this challenge")]
  AlreadyJoined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum CancelError {
  #[error("challenge not found")]
  NotFound,

  /// Not assigned to anyone, assigned to someone else, or the open-challenge
  /// entry already carries a submitted post.
  #[error("challenge is not yours to cancel")]
  NotYours,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum CompleteError {
  #[error("challenge not found")]
  NotFound,

  #[error("challenge is not assigned to you")]
  NotAssigned,

  #[error("you have not joined this challenge")]
  NotJoined,

  #[error("you have already submitted for this challenge")]
  AlreadySubmitted,

  #[error("challenge has already been awarded")]
  Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum AwardError {
  #[error("challenge not found")]
  NotFound,

  #[error("only open challenges can be awarded")]
  NotOpen,

  #[error("challenge has already been awarded")]
  AlreadyAwarded,

  #[error("user has no submission for this challenge")]
  NoSubmission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum UnassignError {
  #[error("challenge not found")]
  NotFound,

  #[error("challenge is not assigned")]
  NotAssigned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum RevokeError {
  #[error("post not found")]
  NotFound,

  #[error("post is already revoked")]
  AlreadyRevoked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum DeletePostError {
  #[error("post not found")]
  NotFound,

  #[error("post does not belong to you")]
  Forbidden,
}

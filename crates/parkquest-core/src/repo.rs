//! The `ChallengeRepo` trait: typed row access inside one open transaction.
//!
//! Implementations hold a live transaction and perform plain parameterised
//! reads and writes. They carry no business rules: every admissibility
//! decision is made by the [`AssignmentEngine`](crate::engine::AssignmentEngine).
//!
//! Methods returning `bool` are conditional writes. They report whether a row
//! matched the expected prior state, which is how the engine learns it won or
//! lost a race without a separate read.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  challenge::Challenge,
  post::{NewPost, Post},
  submission::Submission,
};

pub trait ChallengeRepo {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn challenge(&mut self, id: Uuid) -> Result<Option<Challenge>, Self::Error>;

  fn submission(
    &mut self,
    challenge_id: Uuid,
    user_id: Uuid,
  ) -> Result<Option<Submission>, Self::Error>;

  fn post(&mut self, id: Uuid) -> Result<Option<Post>, Self::Error>;

  // ── Exclusive assignment ──────────────────────────────────────────────

  /// `Available → InProgress` with `assigned_to = user_id`, only while the
  /// challenge is unassigned and available.
  fn claim(&mut self, challenge_id: Uuid, user_id: Uuid) -> Result<bool, Self::Error>;

  /// `InProgress → Available`, only while assigned to `user_id`.
  fn release(&mut self, challenge_id: Uuid, user_id: Uuid) -> Result<bool, Self::Error>;

  /// `InProgress → Available` regardless of assignee.
  fn force_release(&mut self, challenge_id: Uuid) -> Result<bool, Self::Error>;

  /// `InProgress → Completed` for the assignee, clearing `assigned_to` and
  /// recording the completion in the same statement.
  fn complete_assigned(
    &mut self,
    challenge_id: Uuid,
    user_id: Uuid,
    post_id: Uuid,
    at: DateTime<Utc>,
  ) -> Result<bool, Self::Error>;

  // ── Open entries ──────────────────────────────────────────────────────

  /// Insert a pending submission. Returns `false` if `(challenge, user)`
  /// already has one.
  fn join(
    &mut self,
    challenge_id: Uuid,
    user_id: Uuid,
    at: DateTime<Utc>,
  ) -> Result<bool, Self::Error>;

  /// Delete the submission only while it has no post.
  fn leave(&mut self, challenge_id: Uuid, user_id: Uuid) -> Result<bool, Self::Error>;

  /// Attach a post to a pending submission.
  fn attach_post(
    &mut self,
    challenge_id: Uuid,
    user_id: Uuid,
    post_id: Uuid,
  ) -> Result<bool, Self::Error>;

  /// `Available → Completed` naming `user_id` and `post_id` as the winner.
  fn award(
    &mut self,
    challenge_id: Uuid,
    user_id: Uuid,
    post_id: Uuid,
    at: DateTime<Utc>,
  ) -> Result<bool, Self::Error>;

  /// Remove whichever submission is backed by `post_id`, if any.
  fn drop_submission_for_post(&mut self, post_id: Uuid) -> Result<(), Self::Error>;

  // ── Posts & reopening ─────────────────────────────────────────────────

  fn insert_post(&mut self, input: NewPost, at: DateTime<Utc>) -> Result<Post, Self::Error>;

  /// Reset the challenge to `Available`, clearing assignee and completion
  /// fields together, but only if `post_id` is its recorded completion.
  fn reopen_completed_by_post(
    &mut self,
    challenge_id: Uuid,
    post_id: Uuid,
  ) -> Result<bool, Self::Error>;

  /// Flag an unrevoked post as revoked.
  fn revoke_post(&mut self, post_id: Uuid) -> Result<bool, Self::Error>;

  fn delete_post(&mut self, post_id: Uuid) -> Result<bool, Self::Error>;
}

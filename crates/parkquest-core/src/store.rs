//! The `ChallengeStore` trait.
//!
//! Implemented by storage backends (e.g. `parkquest-store-sqlite`). The HTTP
//! layer depends on this abstraction, not on any concrete backend.
//!
//! Engine operations return a nested result: the outer error is a store
//! failure, the inner one is the business rejection. A backend must commit an
//! engine operation's transaction only when the inner result is `Ok`.

use std::future::Future;

use uuid::Uuid;

use crate::{
  challenge::{Challenge, ChallengeUpdate, NewChallenge},
  engine::Completion,
  error::{
    AwardError, CancelError, CompleteError, DeletePostError, PickError,
    RevokeError, UnassignError,
  },
  post::{Comment, FeedItem, FeedQuery, Media, Post},
  scoring::{LeaderboardEntry, UserStats},
  submission::Submission,
  user::{NewUser, User},
};

/// Abstraction over a ParkQuest store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ChallengeStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn list_users(
    &self,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Change a user's display name. Returns `None` if the user does not exist.
  fn update_profile(
    &self,
    user_id: Uuid,
    display_name: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  // ── Challenge catalogue ───────────────────────────────────────────────

  /// Validate and persist a new `Available` challenge.
  fn create_challenge(
    &self,
    input: NewChallenge,
  ) -> impl Future<Output = Result<Challenge, Self::Error>> + Send + '_;

  /// Replace a challenge's catalogue fields. Returns `None` if it does not
  /// exist. Changing the type is refused while the challenge is in progress
  /// or has entrants.
  fn update_challenge(
    &self,
    id: Uuid,
    input: ChallengeUpdate,
  ) -> impl Future<Output = Result<Option<Challenge>, Self::Error>> + Send + '_;

  /// Delete a challenge with its submissions and posts. Returns `false` if it
  /// did not exist.
  fn delete_challenge(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn get_challenge(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Challenge>, Self::Error>> + Send + '_;

  /// Newest first. With a viewer, only what
  /// [`Challenge::is_visible_to`] admits; without one, everything.
  fn list_challenges(
    &self,
    visible_to: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Challenge>, Self::Error>> + Send + '_;

  /// Entrants of an open challenge, newest first.
  fn list_submissions(
    &self,
    challenge_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Submission>, Self::Error>> + Send + '_;

  // ── Assignment engine ─────────────────────────────────────────────────

  fn pick(
    &self,
    challenge_id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Result<(), PickError>, Self::Error>> + Send + '_;

  fn cancel(
    &self,
    challenge_id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Result<(), CancelError>, Self::Error>> + Send + '_;

  fn complete(
    &self,
    challenge_id: Uuid,
    user_id: Uuid,
    media: Media,
    caption: Option<String>,
  ) -> impl Future<Output = Result<Result<Completion, CompleteError>, Self::Error>>
  + Send
  + '_;

  fn award(
    &self,
    challenge_id: Uuid,
    winner: Uuid,
  ) -> impl Future<Output = Result<Result<(), AwardError>, Self::Error>> + Send + '_;

  fn unassign(
    &self,
    challenge_id: Uuid,
  ) -> impl Future<Output = Result<Result<(), UnassignError>, Self::Error>> + Send + '_;

  fn revoke_points(
    &self,
    post_id: Uuid,
  ) -> impl Future<Output = Result<Result<(), RevokeError>, Self::Error>> + Send + '_;

  fn delete_post(
    &self,
    post_id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Result<(), DeletePostError>, Self::Error>>
  + Send
  + '_;

  // ── Scoring ───────────────────────────────────────────────────────────

  fn user_stats(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<UserStats, Self::Error>> + Send + '_;

  fn leaderboard(
    &self,
  ) -> impl Future<Output = Result<Vec<LeaderboardEntry>, Self::Error>> + Send + '_;

  // ── Posts & social ────────────────────────────────────────────────────

  fn get_post(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Post>, Self::Error>> + Send + '_;

  fn feed(
    &self,
    query: FeedQuery,
  ) -> impl Future<Output = Result<Vec<FeedItem>, Self::Error>> + Send + '_;

  /// Idempotent. Returns `false` if the post does not exist.
  fn like(
    &self,
    post_id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Returns `false` if there was no like to remove.
  fn unlike(
    &self,
    post_id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Oldest first.
  fn list_comments(
    &self,
    post_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Comment>, Self::Error>> + Send + '_;

  /// Returns `None` if the post does not exist.
  fn add_comment(
    &self,
    post_id: Uuid,
    user_id: Uuid,
    content: String,
  ) -> impl Future<Output = Result<Option<Comment>, Self::Error>> + Send + '_;
}

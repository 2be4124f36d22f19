//! [`TxRepo`]: the SQLite implementation of [`ChallengeRepo`].
//!
//! Borrows the connection of an already-open transaction. Every conditional
//! write reports `affected rows == 1`, which is how the engine learns whether
//! it won a race.

use chrono::{DateTime, Utc};
use parkquest_core::{
  challenge::{Challenge, ChallengeUpdate},
  post::{NewPost, Post},
  repo::ChallengeRepo,
  submission::Submission,
};
use rusqlite::{Connection, OptionalExtension as _, params};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    CHALLENGE_COLUMNS, POST_COLUMNS, RawChallenge, RawPost, RawSubmission,
    SUBMISSION_COLUMNS, encode_challenge_type, encode_dt, encode_media_kind,
    encode_uuid,
  },
};

pub struct TxRepo<'a> {
  conn: &'a Connection,
}

impl<'a> TxRepo<'a> {
  /// `conn` must be a [`rusqlite::Transaction`] (via deref); the repository
  /// never commits or rolls back itself.
  pub fn new(conn: &'a Connection) -> Self { Self { conn } }

  fn changed(&self, sql: &str, params: impl rusqlite::Params) -> Result<bool> {
    Ok(self.conn.execute(sql, params)? == 1)
  }

  // ── Catalogue maintenance (not part of the engine contract) ─────────────

  pub fn has_submissions(&self, challenge_id: Uuid) -> Result<bool> {
    let found = self
      .conn
      .query_row(
        "SELECT 1 FROM submissions WHERE challenge_id = ?1 LIMIT 1",
        params![encode_uuid(challenge_id)],
        |_| Ok(()),
      )
      .optional()?;
    Ok(found.is_some())
  }

  /// Overwrite catalogue fields; assignment and completion columns are left
  /// alone.
  pub fn update_catalogue(
    &self,
    challenge_id: Uuid,
    input: &ChallengeUpdate,
  ) -> Result<bool> {
    self.changed(
      "UPDATE challenges
          SET title = ?2, description = ?3, image_url = ?4, points = ?5,
              challenge_type = ?6, starts_at = ?7, ends_at = ?8
        WHERE challenge_id = ?1",
      params![
        encode_uuid(challenge_id),
        input.title,
        input.description,
        input.image_url,
        input.points,
        encode_challenge_type(input.challenge_type),
        input.window.starts_at.map(encode_dt),
        input.window.ends_at.map(encode_dt),
      ],
    )
  }

  /// Remove a challenge along with its submissions and posts. Likes and
  /// comments go with the posts by cascade.
  pub fn delete_challenge(&self, challenge_id: Uuid) -> Result<bool> {
    let id = encode_uuid(challenge_id);
    self
      .conn
      .execute("DELETE FROM submissions WHERE challenge_id = ?1", params![id])?;
    self
      .conn
      .execute("DELETE FROM posts WHERE challenge_id = ?1", params![id])?;
    self.changed("DELETE FROM challenges WHERE challenge_id = ?1", params![id])
  }
}

impl ChallengeRepo for TxRepo<'_> {
  type Error = Error;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn challenge(&mut self, id: Uuid) -> Result<Option<Challenge>> {
    self
      .conn
      .query_row(
        &format!("SELECT {CHALLENGE_COLUMNS} FROM challenges WHERE challenge_id = ?1"),
        params![encode_uuid(id)],
        RawChallenge::from_row,
      )
      .optional()?
      .map(RawChallenge::into_challenge)
      .transpose()
  }

  fn submission(
    &mut self,
    challenge_id: Uuid,
    user_id: Uuid,
  ) -> Result<Option<Submission>> {
    self
      .conn
      .query_row(
        &format!(
          "SELECT {SUBMISSION_COLUMNS} FROM submissions
            WHERE challenge_id = ?1 AND user_id = ?2"
        ),
        params![encode_uuid(challenge_id), encode_uuid(user_id)],
        RawSubmission::from_row,
      )
      .optional()?
      .map(RawSubmission::into_submission)
      .transpose()
  }

  fn post(&mut self, id: Uuid) -> Result<Option<Post>> {
    self
      .conn
      .query_row(
        &format!("SELECT {POST_COLUMNS} FROM posts WHERE post_id = ?1"),
        params![encode_uuid(id)],
        RawPost::from_row,
      )
      .optional()?
      .map(RawPost::into_post)
      .transpose()
  }

  // ── Exclusive assignment ──────────────────────────────────────────────

  fn claim(&mut self, challenge_id: Uuid, user_id: Uuid) -> Result<bool> {
    self.changed(
      "UPDATE challenges
          SET status = 'in_progress', assigned_to = ?2
        WHERE challenge_id = ?1
          AND challenge_type = 'exclusive'
          AND status = 'available'
          AND assigned_to IS NULL",
      params![encode_uuid(challenge_id), encode_uuid(user_id)],
    )
  }

  fn release(&mut self, challenge_id: Uuid, user_id: Uuid) -> Result<bool> {
    self.changed(
      "UPDATE challenges
          SET status = 'available', assigned_to = NULL
        WHERE challenge_id = ?1
          AND status = 'in_progress'
          AND assigned_to = ?2",
      params![encode_uuid(challenge_id), encode_uuid(user_id)],
    )
  }

  fn force_release(&mut self, challenge_id: Uuid) -> Result<bool> {
    self.changed(
      "UPDATE challenges
          SET status = 'available', assigned_to = NULL
        WHERE challenge_id = ?1 AND status = 'in_progress'",
      params![encode_uuid(challenge_id)],
    )
  }

  fn complete_assigned(
    &mut self,
    challenge_id: Uuid,
    user_id: Uuid,
    post_id: Uuid,
    at: DateTime<Utc>,
  ) -> Result<bool> {
    self.changed(
      "UPDATE challenges
          SET status = 'completed', assigned_to = NULL,
              completed_by = ?2, completed_post = ?3, completed_at = ?4
        WHERE challenge_id = ?1
          AND status = 'in_progress'
          AND assigned_to = ?2",
      params![
        encode_uuid(challenge_id),
        encode_uuid(user_id),
        encode_uuid(post_id),
        encode_dt(at),
      ],
    )
  }

  // ── Open entries ──────────────────────────────────────────────────────

  fn join(
    &mut self,
    challenge_id: Uuid,
    user_id: Uuid,
    at: DateTime<Utc>,
  ) -> Result<bool> {
    self.changed(
      "INSERT INTO submissions (submission_id, challenge_id, user_id, created_at)
       VALUES (?1, ?2, ?3, ?4)
       ON CONFLICT (challenge_id, user_id) DO NOTHING",
      params![
        encode_uuid(Uuid::new_v4()),
        encode_uuid(challenge_id),
        encode_uuid(user_id),
        encode_dt(at),
      ],
    )
  }

  fn leave(&mut self, challenge_id: Uuid, user_id: Uuid) -> Result<bool> {
    self.changed(
      "DELETE FROM submissions
        WHERE challenge_id = ?1 AND user_id = ?2 AND post_id IS NULL",
      params![encode_uuid(challenge_id), encode_uuid(user_id)],
    )
  }

  fn attach_post(
    &mut self,
    challenge_id: Uuid,
    user_id: Uuid,
    post_id: Uuid,
  ) -> Result<bool> {
    self.changed(
      "UPDATE submissions SET post_id = ?3
        WHERE challenge_id = ?1 AND user_id = ?2 AND post_id IS NULL",
      params![
        encode_uuid(challenge_id),
        encode_uuid(user_id),
        encode_uuid(post_id),
      ],
    )
  }

  fn award(
    &mut self,
    challenge_id: Uuid,
    user_id: Uuid,
    post_id: Uuid,
    at: DateTime<Utc>,
  ) -> Result<bool> {
    self.changed(
      "UPDATE challenges
          SET status = 'completed',
              completed_by = ?2, completed_post = ?3, completed_at = ?4
        WHERE challenge_id = ?1
          AND challenge_type = 'open'
          AND status = 'available'",
      params![
        encode_uuid(challenge_id),
        encode_uuid(user_id),
        encode_uuid(post_id),
        encode_dt(at),
      ],
    )
  }

  fn drop_submission_for_post(&mut self, post_id: Uuid) -> Result<()> {
    self.conn.execute(
      "DELETE FROM submissions WHERE post_id = ?1",
      params![encode_uuid(post_id)],
    )?;
    Ok(())
  }

  // ── Posts & reopening ─────────────────────────────────────────────────

  fn insert_post(&mut self, input: NewPost, at: DateTime<Utc>) -> Result<Post> {
    let post = Post {
      post_id:      Uuid::new_v4(),
      user_id:      input.user_id,
      challenge_id: input.challenge_id,
      media:        input.media,
      caption:      input.caption,
      created_at:   at,
      revoked:      false,
    };

    self.conn.execute(
      "INSERT INTO posts (
         post_id, user_id, challenge_id, media_url, media_kind, caption,
         created_at, revoked
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)",
      params![
        encode_uuid(post.post_id),
        encode_uuid(post.user_id),
        encode_uuid(post.challenge_id),
        post.media.url,
        encode_media_kind(post.media.kind),
        post.caption,
        encode_dt(post.created_at),
      ],
    )?;
    Ok(post)
  }

  fn reopen_completed_by_post(
    &mut self,
    challenge_id: Uuid,
    post_id: Uuid,
  ) -> Result<bool> {
    self.changed(
      "UPDATE challenges
          SET status = 'available', assigned_to = NULL, completed_by = NULL,
              completed_post = NULL, completed_at = NULL
        WHERE challenge_id = ?1 AND completed_post = ?2",
      params![encode_uuid(challenge_id), encode_uuid(post_id)],
    )
  }

  fn revoke_post(&mut self, post_id: Uuid) -> Result<bool> {
    self.changed(
      "UPDATE posts SET revoked = 1 WHERE post_id = ?1 AND revoked = 0",
      params![encode_uuid(post_id)],
    )
  }

  fn delete_post(&mut self, post_id: Uuid) -> Result<bool> {
    self.changed(
      "DELETE FROM posts WHERE post_id = ?1",
      params![encode_uuid(post_id)],
    )
  }
}

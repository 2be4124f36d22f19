//! [`SqliteStore`]: the SQLite implementation of [`ChallengeStore`].

use std::{path::Path, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use parkquest_core::{
  challenge::{Challenge, ChallengeStatus, ChallengeUpdate, NewChallenge},
  clock::Clock,
  engine::{AssignmentEngine, Completion},
  error::{
    AwardError, CancelError, CompleteError, DeletePostError, PickError,
    RevokeError, UnassignError,
  },
  post::{Comment, FeedItem, FeedQuery, Media, Post},
  repo::ChallengeRepo as _,
  scoring::{self, LeaderboardEntry, ScoringFact, UserStats},
  store::ChallengeStore,
  submission::Submission,
  user::{NewUser, User},
};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    CHALLENGE_COLUMNS, POST_COLUMNS, RawChallenge, RawComment, RawFeedItem,
    RawPost, RawScoringFact, RawSubmission, RawUser, SUBMISSION_COLUMNS,
    USER_COLUMNS, encode_challenge_type, encode_dt, encode_role, encode_uuid,
  },
  repo::TxRepo,
  schema::SCHEMA,
};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Store ───────────────────────────────────────────────────────────────────

/// A ParkQuest store backed by a single SQLite file.
///
/// Cloning is cheap; clones share one connection thread.
#[derive(Clone)]
pub struct SqliteStore {
  conn:   tokio_rusqlite::Connection,
  engine: AssignmentEngine,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, engine: AssignmentEngine::default() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, engine: AssignmentEngine::default() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Replace the time source used for windows and timestamps.
  pub fn with_clock(self, clock: Arc<dyn Clock>) -> Self {
    Self { engine: AssignmentEngine::new(clock), ..self }
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  fn now(&self) -> DateTime<Utc> { self.engine.clock().now() }

  /// Run `op` inside one `IMMEDIATE` transaction. The transaction commits
  /// only if `op` succeeds and `commit_if` accepts its value; otherwise it is
  /// dropped, which rolls it back.
  pub(crate) async fn transact<T, F, C>(&self, op: F, commit_if: C) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&mut TxRepo<'_>) -> Result<T> + Send + 'static,
    C: FnOnce(&T) -> bool + Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = op(&mut TxRepo::new(&tx));
        let keep = match &out {
          Ok(value) => commit_if(value),
          Err(_) => false,
        };
        if keep {
          tx.commit()?;
        }
        Ok(out)
      })
      .await?
  }

  /// Every post paired with its challenge's scoring state, optionally for one
  /// author only.
  async fn scoring_facts(&self, user_id: Option<Uuid>) -> Result<Vec<ScoringFact>> {
    let user_str = user_id.map(encode_uuid);

    let raws = self
      .conn
      .call(move |conn| Ok(select_scoring_facts(conn, user_str)?))
      .await?;

    raws.into_iter().map(RawScoringFact::into_fact).collect()
  }
}

// ─── Shared reads ────────────────────────────────────────────────────────────

fn select_users(conn: &rusqlite::Connection) -> rusqlite::Result<Vec<RawUser>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, rowid"
  ))?;
  let rows = stmt
    .query_map([], RawUser::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

fn select_scoring_facts(
  conn: &rusqlite::Connection,
  user_str: Option<String>,
) -> rusqlite::Result<Vec<RawScoringFact>> {
  let mut stmt = conn.prepare(
    "SELECT p.user_id, p.post_id, p.challenge_id,
            c.challenge_type, c.status, c.completed_by, c.points, p.revoked
       FROM posts p
       JOIN challenges c ON c.challenge_id = p.challenge_id
      WHERE ?1 IS NULL OR p.user_id = ?1",
  )?;
  let rows = stmt
    .query_map(rusqlite::params![user_str], RawScoringFact::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

// ─── ChallengeStore impl ─────────────────────────────────────────────────────

impl ChallengeStore for SqliteStore {
  type Error = crate::Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn add_user(&self, input: NewUser) -> Result<User> {
    let user = User {
      user_id:      Uuid::new_v4(),
      username:     input.username,
      display_name: input.display_name,
      role:         input.role,
      created_at:   self.now(),
    };

    let id_str       = encode_uuid(user.user_id);
    let username     = user.username.clone();
    let display_name = user.display_name.clone();
    let role_str     = encode_role(user.role);
    let at_str       = encode_dt(user.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, username, display_name, role, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, username, display_name, role_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    tracing::info!(user_id = %user.user_id, username = %user.username, "user added");
    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
              rusqlite::params![id_str],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    let raws = self.conn.call(|conn| Ok(select_users(conn)?)).await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn update_profile(
    &self,
    user_id: Uuid,
    display_name: String,
  ) -> Result<Option<User>> {
    let display_name = display_name.trim().to_owned();
    if display_name.is_empty() {
      return Err(parkquest_core::Error::EmptyDisplayName.into());
    }

    let id_str = encode_uuid(user_id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE users SET display_name = ?2 WHERE user_id = ?1",
          rusqlite::params![id_str, display_name],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(Some(conn.query_row(
          &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
          rusqlite::params![id_str],
          RawUser::from_row,
        )?))
      })
      .await?;

    let user = raw.map(RawUser::into_user).transpose()?;
    if user.is_some() {
      tracing::info!(%user_id, "profile updated");
    }
    Ok(user)
  }

  // ── Challenge catalogue ───────────────────────────────────────────────────

  async fn create_challenge(&self, input: NewChallenge) -> Result<Challenge> {
    input.validate()?;

    let challenge = Challenge {
      challenge_id:   Uuid::new_v4(),
      title:          input.title,
      description:    input.description,
      image_url:      input.image_url,
      points:         input.points,
      challenge_type: input.challenge_type,
      status:         ChallengeStatus::Available,
      window:         input.window,
      assigned_to:    None,
      completed_by:   None,
      completed_post: None,
      completed_at:   None,
      created_at:     self.now(),
    };

    let id_str      = encode_uuid(challenge.challenge_id);
    let title       = challenge.title.clone();
    let description = challenge.description.clone();
    let image_url   = challenge.image_url.clone();
    let points      = challenge.points;
    let type_str    = encode_challenge_type(challenge.challenge_type);
    let starts_str  = challenge.window.starts_at.map(encode_dt);
    let ends_str    = challenge.window.ends_at.map(encode_dt);
    let at_str      = encode_dt(challenge.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO challenges (
             challenge_id, title, description, image_url, points,
             challenge_type, status, starts_at, ends_at, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'available', ?7, ?8, ?9)",
          rusqlite::params![
            id_str,
            title,
            description,
            image_url,
            points,
            type_str,
            starts_str,
            ends_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    tracing::info!(
      challenge_id = %challenge.challenge_id,
      challenge_type = ?challenge.challenge_type,
      points = challenge.points,
      "challenge created"
    );
    Ok(challenge)
  }

  async fn update_challenge(
    &self,
    id: Uuid,
    input: ChallengeUpdate,
  ) -> Result<Option<Challenge>> {
    input.validate()?;

    let updated = self
      .transact(
        move |repo| {
          let Some(current) = repo.challenge(id)? else {
            return Ok(None);
          };
          if current.challenge_type != input.challenge_type
            && (current.status == ChallengeStatus::InProgress
              || repo.has_submissions(id)?)
          {
            return Err(parkquest_core::Error::TypeLocked.into());
          }
          repo.update_catalogue(id, &input)?;
          repo.challenge(id)
        },
        |_| true,
      )
      .await?;

    if updated.is_some() {
      tracing::info!(challenge_id = %id, "challenge updated");
    }
    Ok(updated)
  }

  async fn delete_challenge(&self, id: Uuid) -> Result<bool> {
    let deleted = self
      .transact(move |repo| repo.delete_challenge(id), |deleted| *deleted)
      .await?;

    if deleted {
      tracing::info!(challenge_id = %id, "challenge deleted");
    }
    Ok(deleted)
  }

  async fn get_challenge(&self, id: Uuid) -> Result<Option<Challenge>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawChallenge> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {CHALLENGE_COLUMNS} FROM challenges WHERE challenge_id = ?1"
              ),
              rusqlite::params![id_str],
              RawChallenge::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawChallenge::into_challenge).transpose()
  }

  async fn list_challenges(&self, visible_to: Option<Uuid>) -> Result<Vec<Challenge>> {
    let raws: Vec<RawChallenge> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CHALLENGE_COLUMNS} FROM challenges
            ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map([], RawChallenge::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let challenges = raws
      .into_iter()
      .map(RawChallenge::into_challenge)
      .collect::<Result<Vec<_>>>()?;

    let Some(viewer) = visible_to else {
      return Ok(challenges);
    };
    let now = self.now();
    Ok(
      challenges
        .into_iter()
        .filter(|c| c.is_visible_to(viewer, now))
        .collect(),
    )
  }

  async fn list_submissions(&self, challenge_id: Uuid) -> Result<Vec<Submission>> {
    let id_str = encode_uuid(challenge_id);

    let raws: Vec<RawSubmission> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SUBMISSION_COLUMNS} FROM submissions
            WHERE challenge_id = ?1
            ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawSubmission::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubmission::into_submission).collect()
  }

  // ── Assignment engine ─────────────────────────────────────────────────────

  async fn pick(
    &self,
    challenge_id: Uuid,
    user_id: Uuid,
  ) -> Result<Result<(), PickError>> {
    let engine = self.engine.clone();
    let verdict = self
      .transact(
        move |repo| engine.pick(repo, challenge_id, user_id),
        Result::is_ok,
      )
      .await?;

    match &verdict {
      Ok(()) => tracing::info!(%challenge_id, %user_id, "challenge picked"),
      Err(reason) => {
        tracing::debug!(%challenge_id, %user_id, %reason, "pick rejected")
      }
    }
    Ok(verdict)
  }

  async fn cancel(
    &self,
    challenge_id: Uuid,
    user_id: Uuid,
  ) -> Result<Result<(), CancelError>> {
    let engine = self.engine.clone();
    let verdict = self
      .transact(
        move |repo| engine.cancel(repo, challenge_id, user_id),
        Result::is_ok,
      )
      .await?;

    match &verdict {
      Ok(()) => tracing::info!(%challenge_id, %user_id, "challenge cancelled"),
      Err(reason) => {
        tracing::debug!(%challenge_id, %user_id, %reason, "cancel rejected")
      }
    }
    Ok(verdict)
  }

  async fn complete(
    &self,
    challenge_id: Uuid,
    user_id: Uuid,
    media: Media,
    caption: Option<String>,
  ) -> Result<Result<Completion, CompleteError>> {
    let engine = self.engine.clone();
    let verdict = self
      .transact(
        move |repo| engine.complete(repo, challenge_id, user_id, media, caption),
        Result::is_ok,
      )
      .await?;

    match &verdict {
      Ok(done) => tracing::info!(
        %challenge_id,
        %user_id,
        post_id = %done.post_id,
        points_earned = done.points_earned,
        pending_review = done.pending_review,
        "challenge completed"
      ),
      Err(reason) => {
        tracing::debug!(%challenge_id, %user_id, %reason, "completion rejected")
      }
    }
    Ok(verdict)
  }

  async fn award(
    &self,
    challenge_id: Uuid,
    winner: Uuid,
  ) -> Result<Result<(), AwardError>> {
    let engine = self.engine.clone();
    let verdict = self
      .transact(
        move |repo| engine.award(repo, challenge_id, winner),
        Result::is_ok,
      )
      .await?;

    match &verdict {
      Ok(()) => tracing::info!(%challenge_id, %winner, "challenge awarded"),
      Err(reason) => {
        tracing::debug!(%challenge_id, %winner, %reason, "award rejected")
      }
    }
    Ok(verdict)
  }

  async fn unassign(&self, challenge_id: Uuid) -> Result<Result<(), UnassignError>> {
    let engine = self.engine.clone();
    let verdict = self
      .transact(move |repo| engine.unassign(repo, challenge_id), Result::is_ok)
      .await?;

    match &verdict {
      Ok(()) => tracing::info!(%challenge_id, "challenge unassigned"),
      Err(reason) => tracing::debug!(%challenge_id, %reason, "unassign rejected"),
    }
    Ok(verdict)
  }

  async fn revoke_points(&self, post_id: Uuid) -> Result<Result<(), RevokeError>> {
    let engine = self.engine.clone();
    let verdict = self
      .transact(move |repo| engine.revoke_points(repo, post_id), Result::is_ok)
      .await?;

    match &verdict {
      Ok(()) => tracing::info!(%post_id, "points revoked"),
      Err(reason) => tracing::debug!(%post_id, %reason, "revoke rejected"),
    }
    Ok(verdict)
  }

  async fn delete_post(
    &self,
    post_id: Uuid,
    user_id: Uuid,
  ) -> Result<Result<(), DeletePostError>> {
    let engine = self.engine.clone();
    let verdict = self
      .transact(
        move |repo| engine.delete_post(repo, post_id, user_id),
        Result::is_ok,
      )
      .await?;

    match &verdict {
      Ok(()) => tracing::info!(%post_id, %user_id, "post deleted"),
      Err(reason) => {
        tracing::debug!(%post_id, %user_id, %reason, "post deletion rejected")
      }
    }
    Ok(verdict)
  }

  // ── Scoring ───────────────────────────────────────────────────────────────

  async fn user_stats(&self, user_id: Uuid) -> Result<UserStats> {
    let facts = self.scoring_facts(Some(user_id)).await?;
    Ok(scoring::user_stats(user_id, &facts))
  }

  async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
    // Users and facts share one read snapshot.
    let (raw_users, raw_facts) = self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        let users = select_users(&tx)?;
        let facts = select_scoring_facts(&tx, None)?;
        tx.commit()?;
        Ok((users, facts))
      })
      .await?;

    let users = raw_users
      .into_iter()
      .map(RawUser::into_user)
      .collect::<Result<Vec<_>>>()?;
    let facts = raw_facts
      .into_iter()
      .map(RawScoringFact::into_fact)
      .collect::<Result<Vec<_>>>()?;
    Ok(scoring::leaderboard(&users, &facts))
  }

  // ── Posts & social ────────────────────────────────────────────────────────

  async fn get_post(&self, id: Uuid) -> Result<Option<Post>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawPost> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {POST_COLUMNS} FROM posts WHERE post_id = ?1"),
              rusqlite::params![id_str],
              RawPost::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPost::into_post).transpose()
  }

  async fn feed(&self, query: FeedQuery) -> Result<Vec<FeedItem>> {
    let (limit, offset) = query.bounds();
    let viewer_str = query.viewer.map(encode_uuid);

    let raws: Vec<RawFeedItem> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT p.post_id, p.user_id, p.challenge_id, p.media_url,
                  p.media_kind, p.caption, p.created_at, p.revoked,
                  u.username,
                  c.title, c.points, c.challenge_type, c.status, c.completed_by,
                  (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.post_id),
                  (SELECT COUNT(*) FROM comments m WHERE m.post_id = p.post_id),
                  EXISTS (SELECT 1 FROM likes l
                           WHERE l.post_id = p.post_id AND l.user_id = ?1)
             FROM posts p
             JOIN users u      ON u.user_id = p.user_id
             JOIN challenges c ON c.challenge_id = p.challenge_id
            ORDER BY p.created_at DESC, p.rowid DESC
            LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt
          .query_map(
            rusqlite::params![viewer_str, limit, offset],
            RawFeedItem::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFeedItem::into_feed_item).collect()
  }

  async fn like(&self, post_id: Uuid, user_id: Uuid) -> Result<bool> {
    let post_str = encode_uuid(post_id);
    let user_str = encode_uuid(user_id);
    let at_str   = encode_dt(self.now());

    let found = self
      .conn
      .call(move |conn| {
        let exists = conn
          .query_row(
            "SELECT 1 FROM posts WHERE post_id = ?1",
            rusqlite::params![post_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !exists {
          return Ok(false);
        }
        conn.execute(
          "INSERT INTO likes (user_id, post_id, created_at) VALUES (?1, ?2, ?3)
           ON CONFLICT (user_id, post_id) DO NOTHING",
          rusqlite::params![user_str, post_str, at_str],
        )?;
        Ok(true)
      })
      .await?;
    Ok(found)
  }

  async fn unlike(&self, post_id: Uuid, user_id: Uuid) -> Result<bool> {
    let post_str = encode_uuid(post_id);
    let user_str = encode_uuid(user_id);

    let removed = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM likes WHERE user_id = ?1 AND post_id = ?2",
          rusqlite::params![user_str, post_str],
        )?;
        Ok(n > 0)
      })
      .await?;
    Ok(removed)
  }

  async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>> {
    let post_str = encode_uuid(post_id);

    let raws: Vec<RawComment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT c.comment_id, c.post_id, c.user_id, u.username, c.content,
                  c.created_at
             FROM comments c
             JOIN users u ON u.user_id = c.user_id
            WHERE c.post_id = ?1
            ORDER BY c.created_at, c.rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![post_str], RawComment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawComment::into_comment).collect()
  }

  async fn add_comment(
    &self,
    post_id: Uuid,
    user_id: Uuid,
    content: String,
  ) -> Result<Option<Comment>> {
    let content = content.trim().to_owned();
    if content.is_empty() {
      return Err(parkquest_core::Error::EmptyComment.into());
    }

    let comment_str = encode_uuid(Uuid::new_v4());
    let post_str    = encode_uuid(post_id);
    let user_str    = encode_uuid(user_id);
    let at_str      = encode_dt(self.now());

    let raw: Option<RawComment> = self
      .conn
      .call(move |conn| {
        let exists = conn
          .query_row(
            "SELECT 1 FROM posts WHERE post_id = ?1",
            rusqlite::params![post_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !exists {
          return Ok(None);
        }
        conn.execute(
          "INSERT INTO comments (comment_id, post_id, user_id, content, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![comment_str, post_str, user_str, content, at_str],
        )?;
        let raw = conn.query_row(
          "SELECT c.comment_id, c.post_id, c.user_id, u.username, c.content,
                  c.created_at
             FROM comments c
             JOIN users u ON u.user_id = c.user_id
            WHERE c.comment_id = ?1",
          rusqlite::params![comment_str],
          RawComment::from_row,
        )?;
        Ok(Some(raw))
      })
      .await?;

    let comment = raw.map(RawComment::into_comment).transpose()?;
    if let Some(c) = &comment {
      tracing::debug!(comment_id = %c.comment_id, %post_id, %user_id, "comment added");
    }
    Ok(comment)
  }
}

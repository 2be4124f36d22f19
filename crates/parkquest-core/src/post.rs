//! Posts, the proof-of-completion artifacts, and the social layer around them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::challenge::{ChallengeStatus, ChallengeType};

// ─── Media ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
  Photo,
  Video,
}

/// A reference to already-stored media; no binary data lives in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
  pub url:  String,
  pub kind: MediaKind,
}

// ─── Post ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
  pub post_id:      Uuid,
  pub user_id:      Uuid,
  pub challenge_id: Uuid,
  pub media:        Media,
  pub caption:      Option<String>,
  pub created_at:   DateTime<Utc>,
  /// Set by an administrator; the row is kept as an audit record.
  pub revoked:      bool,
}

/// Input to [`crate::repo::ChallengeRepo::insert_post`].
#[derive(Debug, Clone)]
pub struct NewPost {
  pub user_id:      Uuid,
  pub challenge_id: Uuid,
  pub media:        Media,
  pub caption:      Option<String>,
}

// ─── Feed ────────────────────────────────────────────────────────────────────

/// A post joined with its author, challenge and engagement counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
  pub post:                    Post,
  pub username:                String,
  pub challenge_title:         String,
  pub challenge_points:        u32,
  pub challenge_type:          ChallengeType,
  pub challenge_status:        ChallengeStatus,
  pub challenge_completed_by:  Option<Uuid>,
  pub likes:                   u64,
  pub comments:                u64,
  pub liked_by_viewer:         bool,
}

/// Parameters for [`crate::store::ChallengeStore::feed`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedQuery {
  /// 1-based page number; `None` or `0` means the first page.
  pub page:   Option<u32>,
  /// Page size in `1..=MAX_FEED_LIMIT`; out-of-range values fall back to
  /// `DEFAULT_FEED_LIMIT`.
  pub limit:  Option<u32>,
  pub viewer: Option<Uuid>,
}

pub const DEFAULT_FEED_LIMIT: u32 = 20;
pub const MAX_FEED_LIMIT: u32 = 50;

impl FeedQuery {
  /// `(limit, offset)` after clamping.
  pub fn bounds(&self) -> (u32, u32) {
    let limit = match self.limit {
      Some(l) if (1..=MAX_FEED_LIMIT).contains(&l) => l,
      _ => DEFAULT_FEED_LIMIT,
    };
    let page = self.page.filter(|p| *p > 0).unwrap_or(1);
    (limit, (page - 1).saturating_mul(limit))
  }
}

// ─── Comments ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
  pub comment_id: Uuid,
  pub post_id:    Uuid,
  pub user_id:    Uuid,
  pub username:   String,
  pub content:    String,
  pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn feed_bounds_default_and_clamp() {
    assert_eq!(FeedQuery::default().bounds(), (20, 0));

    let q = FeedQuery { page: Some(3), limit: Some(10), viewer: None };
    assert_eq!(q.bounds(), (10, 20));

    // Out-of-range limits fall back to the default, like the mobile client expects.
    let q = FeedQuery { page: Some(0), limit: Some(500), viewer: None };
    assert_eq!(q.bounds(), (20, 0));
  }
}

//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`)
//! so that lexical order in SQL matches chronological order. UUIDs are stored
//! as hyphenated lowercase strings. Row structs hold the raw column values;
//! decoding happens outside the database thread.

use chrono::{DateTime, SecondsFormat, Utc};
use parkquest_core::{
  challenge::{ActiveWindow, Challenge, ChallengeStatus, ChallengeType},
  post::{Comment, FeedItem, Media, MediaKind, Post},
  scoring::ScoringFact,
  submission::Submission,
  user::{Role, User},
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<&str>) -> Result<Option<Uuid>> {
  s.map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

// ─── Discriminants ───────────────────────────────────────────────────────────

fn unknown(kind: &'static str, value: &str) -> Error {
  parkquest_core::Error::UnknownDiscriminant { kind, value: value.to_owned() }
    .into()
}

pub fn encode_challenge_type(t: ChallengeType) -> &'static str {
  match t {
    ChallengeType::Exclusive => "exclusive",
    ChallengeType::Open => "open",
  }
}

pub fn decode_challenge_type(s: &str) -> Result<ChallengeType> {
  match s {
    "exclusive" => Ok(ChallengeType::Exclusive),
    "open" => Ok(ChallengeType::Open),
    other => Err(unknown("challenge type", other)),
  }
}

pub fn decode_status(s: &str) -> Result<ChallengeStatus> {
  match s {
    "available" => Ok(ChallengeStatus::Available),
    "in_progress" => Ok(ChallengeStatus::InProgress),
    "completed" => Ok(ChallengeStatus::Completed),
    other => Err(unknown("challenge status", other)),
  }
}

pub fn encode_media_kind(k: MediaKind) -> &'static str {
  match k {
    MediaKind::Photo => "photo",
    MediaKind::Video => "video",
  }
}

pub fn decode_media_kind(s: &str) -> Result<MediaKind> {
  match s {
    "photo" => Ok(MediaKind::Photo),
    "video" => Ok(MediaKind::Video),
    other => Err(unknown("media kind", other)),
  }
}

pub fn encode_role(r: Role) -> &'static str {
  match r {
    Role::User => "user",
    Role::Admin => "admin",
  }
}

pub fn decode_role(s: &str) -> Result<Role> {
  match s {
    "user" => Ok(Role::User),
    "admin" => Ok(Role::Admin),
    other => Err(unknown("role", other)),
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "user_id, username, display_name, role, created_at";

pub struct RawUser {
  pub user_id:      String,
  pub username:     String,
  pub display_name: String,
  pub role:         String,
  pub created_at:   String,
}

impl RawUser {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:      row.get(0)?,
      username:     row.get(1)?,
      display_name: row.get(2)?,
      role:         row.get(3)?,
      created_at:   row.get(4)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:      decode_uuid(&self.user_id)?,
      username:     self.username,
      display_name: self.display_name,
      role:         decode_role(&self.role)?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

// ─── Challenges ──────────────────────────────────────────────────────────────

pub const CHALLENGE_COLUMNS: &str = "challenge_id, title, description, image_url, \
  points, challenge_type, status, starts_at, ends_at, assigned_to, \
  completed_by, completed_post, completed_at, created_at";

pub struct RawChallenge {
  pub challenge_id:   String,
  pub title:          String,
  pub description:    String,
  pub image_url:      Option<String>,
  pub points:         u32,
  pub challenge_type: String,
  pub status:         String,
  pub starts_at:      Option<String>,
  pub ends_at:        Option<String>,
  pub assigned_to:    Option<String>,
  pub completed_by:   Option<String>,
  pub completed_post: Option<String>,
  pub completed_at:   Option<String>,
  pub created_at:     String,
}

impl RawChallenge {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      challenge_id:   row.get(0)?,
      title:          row.get(1)?,
      description:    row.get(2)?,
      image_url:      row.get(3)?,
      points:         row.get(4)?,
      challenge_type: row.get(5)?,
      status:         row.get(6)?,
      starts_at:      row.get(7)?,
      ends_at:        row.get(8)?,
      assigned_to:    row.get(9)?,
      completed_by:   row.get(10)?,
      completed_post: row.get(11)?,
      completed_at:   row.get(12)?,
      created_at:     row.get(13)?,
    })
  }

  pub fn into_challenge(self) -> Result<Challenge> {
    Ok(Challenge {
      challenge_id:   decode_uuid(&self.challenge_id)?,
      title:          self.title,
      description:    self.description,
      image_url:      self.image_url,
      points:         self.points,
      challenge_type: decode_challenge_type(&self.challenge_type)?,
      status:         decode_status(&self.status)?,
      window:         ActiveWindow {
        starts_at: decode_opt_dt(self.starts_at.as_deref())?,
        ends_at:   decode_opt_dt(self.ends_at.as_deref())?,
      },
      assigned_to:    decode_opt_uuid(self.assigned_to.as_deref())?,
      completed_by:   decode_opt_uuid(self.completed_by.as_deref())?,
      completed_post: decode_opt_uuid(self.completed_post.as_deref())?,
      completed_at:   decode_opt_dt(self.completed_at.as_deref())?,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

// ─── Submissions ─────────────────────────────────────────────────────────────

pub const SUBMISSION_COLUMNS: &str =
  "submission_id, challenge_id, user_id, post_id, created_at";

pub struct RawSubmission {
  pub submission_id: String,
  pub challenge_id:  String,
  pub user_id:       String,
  pub post_id:       Option<String>,
  pub created_at:    String,
}

impl RawSubmission {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      submission_id: row.get(0)?,
      challenge_id:  row.get(1)?,
      user_id:       row.get(2)?,
      post_id:       row.get(3)?,
      created_at:    row.get(4)?,
    })
  }

  pub fn into_submission(self) -> Result<Submission> {
    Ok(Submission {
      submission_id: decode_uuid(&self.submission_id)?,
      challenge_id:  decode_uuid(&self.challenge_id)?,
      user_id:       decode_uuid(&self.user_id)?,
      post_id:       decode_opt_uuid(self.post_id.as_deref())?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

// ─── Posts ───────────────────────────────────────────────────────────────────

pub const POST_COLUMNS: &str = "post_id, user_id, challenge_id, media_url, \
  media_kind, caption, created_at, revoked";

pub struct RawPost {
  pub post_id:      String,
  pub user_id:      String,
  pub challenge_id: String,
  pub media_url:    String,
  pub media_kind:   String,
  pub caption:      Option<String>,
  pub created_at:   String,
  pub revoked:      bool,
}

impl RawPost {
  /// Reads the first eight columns in [`POST_COLUMNS`] order.
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      post_id:      row.get(0)?,
      user_id:      row.get(1)?,
      challenge_id: row.get(2)?,
      media_url:    row.get(3)?,
      media_kind:   row.get(4)?,
      caption:      row.get(5)?,
      created_at:   row.get(6)?,
      revoked:      row.get(7)?,
    })
  }

  pub fn into_post(self) -> Result<Post> {
    Ok(Post {
      post_id:      decode_uuid(&self.post_id)?,
      user_id:      decode_uuid(&self.user_id)?,
      challenge_id: decode_uuid(&self.challenge_id)?,
      media:        Media {
        url:  self.media_url,
        kind: decode_media_kind(&self.media_kind)?,
      },
      caption:      self.caption,
      created_at:   decode_dt(&self.created_at)?,
      revoked:      self.revoked,
    })
  }
}

/// A post row followed by the joined author, challenge and engagement
/// columns selected by the feed query.
pub struct RawFeedItem {
  pub post:                   RawPost,
  pub username:               String,
  pub challenge_title:        String,
  pub challenge_points:       u32,
  pub challenge_type:         String,
  pub challenge_status:       String,
  pub challenge_completed_by: Option<String>,
  pub likes:                  i64,
  pub comments:               i64,
  pub liked_by_viewer:        bool,
}

impl RawFeedItem {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      post:                   RawPost::from_row(row)?,
      username:               row.get(8)?,
      challenge_title:        row.get(9)?,
      challenge_points:       row.get(10)?,
      challenge_type:         row.get(11)?,
      challenge_status:       row.get(12)?,
      challenge_completed_by: row.get(13)?,
      likes:                  row.get(14)?,
      comments:               row.get(15)?,
      liked_by_viewer:        row.get(16)?,
    })
  }

  pub fn into_feed_item(self) -> Result<FeedItem> {
    Ok(FeedItem {
      post:                   self.post.into_post()?,
      username:               self.username,
      challenge_title:        self.challenge_title,
      challenge_points:       self.challenge_points,
      challenge_type:         decode_challenge_type(&self.challenge_type)?,
      challenge_status:       decode_status(&self.challenge_status)?,
      challenge_completed_by: decode_opt_uuid(
        self.challenge_completed_by.as_deref(),
      )?,
      likes:                  u64::try_from(self.likes).unwrap_or_default(),
      comments:               u64::try_from(self.comments).unwrap_or_default(),
      liked_by_viewer:        self.liked_by_viewer,
    })
  }
}

// ─── Comments ────────────────────────────────────────────────────────────────

pub struct RawComment {
  pub comment_id: String,
  pub post_id:    String,
  pub user_id:    String,
  pub username:   String,
  pub content:    String,
  pub created_at: String,
}

impl RawComment {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      comment_id: row.get(0)?,
      post_id:    row.get(1)?,
      user_id:    row.get(2)?,
      username:   row.get(3)?,
      content:    row.get(4)?,
      created_at: row.get(5)?,
    })
  }

  pub fn into_comment(self) -> Result<Comment> {
    Ok(Comment {
      comment_id: decode_uuid(&self.comment_id)?,
      post_id:    decode_uuid(&self.post_id)?,
      user_id:    decode_uuid(&self.user_id)?,
      username:   self.username,
      content:    self.content,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

// ─── Scoring facts ───────────────────────────────────────────────────────────

pub struct RawScoringFact {
  pub user_id:        String,
  pub post_id:        String,
  pub challenge_id:   String,
  pub challenge_type: String,
  pub status:         String,
  pub completed_by:   Option<String>,
  pub points:         u32,
  pub revoked:        bool,
}

impl RawScoringFact {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:        row.get(0)?,
      post_id:        row.get(1)?,
      challenge_id:   row.get(2)?,
      challenge_type: row.get(3)?,
      status:         row.get(4)?,
      completed_by:   row.get(5)?,
      points:         row.get(6)?,
      revoked:        row.get(7)?,
    })
  }

  pub fn into_fact(self) -> Result<ScoringFact> {
    Ok(ScoringFact {
      user_id:        decode_uuid(&self.user_id)?,
      post_id:        decode_uuid(&self.post_id)?,
      challenge_id:   decode_uuid(&self.challenge_id)?,
      challenge_type: decode_challenge_type(&self.challenge_type)?,
      status:         decode_status(&self.status)?,
      completed_by:   decode_opt_uuid(self.completed_by.as_deref())?,
      points:         self.points,
      revoked:        self.revoked,
    })
  }
}

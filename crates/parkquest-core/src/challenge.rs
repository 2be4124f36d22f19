//! Challenges, the unit of work offered to park visitors.
//!
//! A challenge row is created by an administrator and afterwards mutated only
//! by the [`AssignmentEngine`](crate::engine::AssignmentEngine).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Policy & status ─────────────────────────────────────────────────────────

/// How many users may hold a challenge at once.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeType {
  /// Single claimant; points are earned on completion.
  #[default]
  Exclusive,
  /// Any number of entrants submit; an administrator awards one winner.
  Open,
}

/// Lifecycle status of a challenge row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
  Available,
  /// Only ever reached by exclusive challenges.
  InProgress,
  /// Re-openable via revoke or post deletion.
  Completed,
}

// ─── Window ──────────────────────────────────────────────────────────────────

/// The period during which a challenge may be picked or joined. A missing
/// bound is unbounded on that side; both bounds are inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveWindow {
  pub starts_at: Option<DateTime<Utc>>,
  pub ends_at:   Option<DateTime<Utc>>,
}

impl ActiveWindow {
  pub fn unbounded() -> Self { Self::default() }

  pub fn contains(&self, now: DateTime<Utc>) -> bool {
    self.starts_at.is_none_or(|start| start <= now)
      && self.ends_at.is_none_or(|end| now <= end)
  }

  pub fn validate(&self) -> Result<()> {
    match (self.starts_at, self.ends_at) {
      (Some(start), Some(end)) if end < start => Err(Error::InvertedWindow),
      _ => Ok(()),
    }
  }
}

// ─── Challenge ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
  pub challenge_id:   Uuid,
  pub title:          String,
  pub description:    String,
  pub image_url:      Option<String>,
  pub points:         u32,
  pub challenge_type: ChallengeType,
  pub status:         ChallengeStatus,
  pub window:         ActiveWindow,
  /// Set iff an exclusive challenge is `InProgress`.
  pub assigned_to:    Option<Uuid>,
  /// Set iff `Completed`, together with `completed_post`.
  pub completed_by:   Option<Uuid>,
  pub completed_post: Option<Uuid>,
  pub completed_at:   Option<DateTime<Utc>>,
  pub created_at:     DateTime<Utc>,
}

impl Challenge {
  /// Whether the reference fields agree with `status`.
  pub fn is_consistent(&self) -> bool {
    let assigned = self.assigned_to.is_some();
    let in_progress = self.status == ChallengeStatus::InProgress;
    let completed = self.status == ChallengeStatus::Completed;

    assigned == in_progress
      && self.completed_by.is_some() == completed
      && self.completed_post.is_some() == completed
      && !(in_progress && self.challenge_type == ChallengeType::Open)
  }

  /// Whether `viewer` should see this challenge in their list at `now`.
  ///
  /// Open challenges are always listed; exclusive ones only when free, held
  /// by the viewer, or finished.
  pub fn is_visible_to(&self, viewer: Uuid, now: DateTime<Utc>) -> bool {
    if !self.window.contains(now) {
      return false;
    }
    match (self.challenge_type, self.status) {
      (ChallengeType::Open, _) => true,
      (ChallengeType::Exclusive, ChallengeStatus::Available) => {
        self.assigned_to.is_none()
      }
      (ChallengeType::Exclusive, ChallengeStatus::InProgress) => {
        self.assigned_to == Some(viewer)
      }
      (ChallengeType::Exclusive, ChallengeStatus::Completed) => true,
    }
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::ChallengeStore::create_challenge`]. New challenges
/// always start `Available`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChallenge {
  pub title:          String,
  pub description:    String,
  #[serde(default)]
  pub image_url:      Option<String>,
  pub points:         u32,
  #[serde(default)]
  pub challenge_type: ChallengeType,
  #[serde(default)]
  pub window:         ActiveWindow,
}

impl NewChallenge {
  /// Convenience constructor with no image and an unbounded window.
  pub fn new(
    title: impl Into<String>,
    description: impl Into<String>,
    points: u32,
    challenge_type: ChallengeType,
  ) -> Self {
    Self {
      title: title.into(),
      description: description.into(),
      image_url: None,
      points,
      challenge_type,
      window: ActiveWindow::unbounded(),
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.title.trim().is_empty() {
      return Err(Error::EmptyTitle);
    }
    if self.points == 0 {
      return Err(Error::NonPositivePoints);
    }
    self.window.validate()
  }
}

/// Administrative edit of a challenge's catalogue fields. Assignment and
/// completion state are never touched by an update.
pub type ChallengeUpdate = NewChallenge;

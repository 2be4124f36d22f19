//! Points are never stored. They are a projection over posts joined to the
//! challenges they complete, recomputed on every read so a revoke or a
//! deletion can never leave a stale total behind.
//!
//! A post earns its challenge's points iff all of:
//!
//! - the post is not revoked;
//! - the challenge is `Completed`;
//! - the challenge is exclusive, or the post's author is the awarded winner.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  challenge::{ChallengeStatus, ChallengeType},
  user::User,
};

/// One post together with the challenge state that decides whether it scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringFact {
  pub user_id:        Uuid,
  pub post_id:        Uuid,
  pub challenge_id:   Uuid,
  pub challenge_type: ChallengeType,
  pub status:         ChallengeStatus,
  pub completed_by:   Option<Uuid>,
  pub points:         u32,
  pub revoked:        bool,
}

impl ScoringFact {
  pub fn earns_points(&self) -> bool {
    if self.revoked || self.status != ChallengeStatus::Completed {
      return false;
    }
    match self.challenge_type {
      ChallengeType::Exclusive => true,
      ChallengeType::Open => self.completed_by == Some(self.user_id),
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
  pub total_points:         u64,
  pub challenges_completed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
  pub user_id:              Uuid,
  pub username:             String,
  pub display_name:         String,
  pub total_points:         u64,
  pub challenges_completed: u64,
}

/// Totals for `user_id` over `facts`. Facts for other users are ignored.
pub fn user_stats<'a>(
  user_id: Uuid,
  facts: impl IntoIterator<Item = &'a ScoringFact>,
) -> UserStats {
  facts
    .into_iter()
    .filter(|f| f.user_id == user_id && f.earns_points())
    .fold(UserStats::default(), |mut acc, f| {
      acc.total_points += u64::from(f.points);
      acc.challenges_completed += 1;
      acc
    })
}

/// Rank every non-admin user, including those with nothing yet, by points,
/// then completions, then username.
pub fn leaderboard(users: &[User], facts: &[ScoringFact]) -> Vec<LeaderboardEntry> {
  let mut entries: Vec<_> = users
    .iter()
    .filter(|u| !u.is_admin())
    .map(|u| {
      let stats = user_stats(u.user_id, facts);
      LeaderboardEntry {
        user_id:              u.user_id,
        username:             u.username.clone(),
        display_name:         u.display_name.clone(),
        total_points:         stats.total_points,
        challenges_completed: stats.challenges_completed,
      }
    })
    .collect();

  entries.sort_by(|a, b| {
    b.total_points
      .cmp(&a.total_points)
      .then(b.challenges_completed.cmp(&a.challenges_completed))
      .then_with(|| a.username.cmp(&b.username))
  });
  entries
}

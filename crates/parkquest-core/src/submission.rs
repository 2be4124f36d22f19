//! Submission: one user's entry into an open challenge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique per `(challenge_id, user_id)`. The post reference stays unset until
/// the entrant submits proof.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
  pub submission_id: Uuid,
  pub challenge_id:  Uuid,
  pub user_id:       Uuid,
  pub post_id:       Option<Uuid>,
  pub created_at:    DateTime<Utc>,
}

impl Submission {
  /// Joined but not yet submitted.
  pub fn is_pending(&self) -> bool { self.post_id.is_none() }
}

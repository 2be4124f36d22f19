//! The challenge-assignment state machine.
//!
//! ```text
//! Available --pick(excl)--> InProgress --cancel/unassign--> Available
//! Available --pick(open)--> (submissions accumulate, status stays Available)
//! InProgress --complete(excl)--> Completed --revoke/delete--> Available
//! Submission.post set (open) --award--> Completed --revoke/delete--> Available
//! ```
//!
//! Every operation expects to run inside a single transaction owned by the
//! caller, who must commit only when the inner verdict is `Ok` and roll back
//! otherwise. Contended transitions are expressed as conditional writes on the
//! repository, never as read-then-write, so two callers racing for the same
//! exclusive challenge cannot both win.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  challenge::{ChallengeStatus, ChallengeType},
  clock::{Clock, SystemClock},
  error::{
    AwardError, CancelError, CompleteError, DeletePostError, PickError,
    RevokeError, UnassignError,
  },
  post::{Media, NewPost},
  repo::ChallengeRepo,
};

/// Outer `Err` is a store failure to be propagated as-is; inner `Err` is a
/// business rejection.
pub type Verdict<T, E, S> = Result<Result<T, E>, S>;

/// Result of [`AssignmentEngine::complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
  pub post_id:        Uuid,
  pub challenge_type: ChallengeType,
  /// Full value for exclusive challenges, zero for open ones.
  pub points_earned:  u32,
  /// Open submissions wait for an administrator's award.
  pub pending_review: bool,
}

#[derive(Clone)]
pub struct AssignmentEngine {
  clock: Arc<dyn Clock>,
}

impl Default for AssignmentEngine {
  fn default() -> Self { Self::new(Arc::new(SystemClock)) }
}

impl AssignmentEngine {
  pub fn new(clock: Arc<dyn Clock>) -> Self { Self { clock } }

  pub fn clock(&self) -> &Arc<dyn Clock> { &self.clock }

  /// Claim an exclusive challenge or join an open one.
  pub fn pick<R: ChallengeRepo>(
    &self,
    repo: &mut R,
    challenge_id: Uuid,
    user_id: Uuid,
  ) -> Verdict<(), PickError, R::Error> {
    let Some(challenge) = repo.challenge(challenge_id)? else {
      return Ok(Err(PickError::NotFound));
    };
    let now = self.clock.now();

    if !challenge.window.contains(now) {
      return Ok(Err(PickError::OutOfWindow));
    }
    if challenge.status == ChallengeStatus::Completed {
      return Ok(Err(PickError::NotAvailable));
    }

    match challenge.challenge_type {
      ChallengeType::Exclusive => {
        // Checked up front so a repeat pick reads better than a lost race.
        if challenge.assigned_to == Some(user_id) {
          return Ok(Err(PickError::AlreadyAssigned));
        }
        if !repo.claim(challenge_id, user_id)? {
          return Ok(Err(PickError::AlreadyTaken));
        }
      }
      ChallengeType::Open => {
        if !repo.join(challenge_id, user_id, now)? {
          return Ok(Err(PickError::AlreadyJoined));
        }
      }
    }

    Ok(Ok(()))
  }

  /// Hand back an exclusive challenge, or leave an open one before
  /// submitting.
  pub fn cancel<R: ChallengeRepo>(
    &self,
    repo: &mut R,
    challenge_id: Uuid,
    user_id: Uuid,
  ) -> Verdict<(), CancelError, R::Error> {
    let Some(challenge) = repo.challenge(challenge_id)? else {
      return Ok(Err(CancelError::NotFound));
    };

    let released = match challenge.challenge_type {
      ChallengeType::Exclusive => repo.release(challenge_id, user_id)?,
      ChallengeType::Open => repo.leave(challenge_id, user_id)?,
    };

    Ok(if released { Ok(()) } else { Err(CancelError::NotYours) })
  }

  /// Submit proof. Exclusive challenges complete immediately; open ones
  /// record the post against the user's submission and await an award.
  pub fn complete<R: ChallengeRepo>(
    &self,
    repo: &mut R,
    challenge_id: Uuid,
    user_id: Uuid,
    media: Media,
    caption: Option<String>,
  ) -> Verdict<Completion, CompleteError, R::Error> {
    let Some(challenge) = repo.challenge(challenge_id)? else {
      return Ok(Err(CompleteError::NotFound));
    };
    let now = self.clock.now();

    match challenge.challenge_type {
      ChallengeType::Exclusive => {
        if challenge.status != ChallengeStatus::InProgress
          || challenge.assigned_to != Some(user_id)
        {
          return Ok(Err(CompleteError::NotAssigned));
        }
      }
      ChallengeType::Open => {
        if challenge.status == ChallengeStatus::Completed {
          return Ok(Err(CompleteError::Closed));
        }
        match repo.submission(challenge_id, user_id)? {
          None => return Ok(Err(CompleteError::NotJoined)),
          Some(s) if !s.is_pending() => {
            return Ok(Err(CompleteError::AlreadySubmitted));
          }
          Some(_) => {}
        }
      }
    }

    let post = repo.insert_post(
      NewPost { user_id, challenge_id, media, caption },
      now,
    )?;

    // The caller rolls back on rejection, which also discards `post`.
    let completion = match challenge.challenge_type {
      ChallengeType::Exclusive => {
        if !repo.complete_assigned(challenge_id, user_id, post.post_id, now)? {
          return Ok(Err(CompleteError::NotAssigned));
        }
        Completion {
          post_id:        post.post_id,
          challenge_type: ChallengeType::Exclusive,
          points_earned:  challenge.points,
          pending_review: false,
        }
      }
      ChallengeType::Open => {
        if !repo.attach_post(challenge_id, user_id, post.post_id)? {
          return Ok(Err(CompleteError::AlreadySubmitted));
        }
        Completion {
          post_id:        post.post_id,
          challenge_type: ChallengeType::Open,
          points_earned:  0,
          pending_review: true,
        }
      }
    };

    Ok(Ok(completion))
  }

  /// Pick the winner of an open challenge. Admin-only; the caller enforces
  /// that.
  pub fn award<R: ChallengeRepo>(
    &self,
    repo: &mut R,
    challenge_id: Uuid,
    winner: Uuid,
  ) -> Verdict<(), AwardError, R::Error> {
    let Some(challenge) = repo.challenge(challenge_id)? else {
      return Ok(Err(AwardError::NotFound));
    };
    if challenge.challenge_type != ChallengeType::Open {
      return Ok(Err(AwardError::NotOpen));
    }
    if challenge.status == ChallengeStatus::Completed {
      return Ok(Err(AwardError::AlreadyAwarded));
    }

    let Some(post_id) = repo
      .submission(challenge_id, winner)?
      .and_then(|s| s.post_id)
    else {
      return Ok(Err(AwardError::NoSubmission));
    };
    match repo.post(post_id)? {
      Some(post) if !post.revoked => {}
      _ => return Ok(Err(AwardError::NoSubmission)),
    }

    if !repo.award(challenge_id, winner, post_id, self.clock.now())? {
      return Ok(Err(AwardError::AlreadyAwarded));
    }
    Ok(Ok(()))
  }

  /// Forcibly return an in-progress exclusive challenge to the pool.
  pub fn unassign<R: ChallengeRepo>(
    &self,
    repo: &mut R,
    challenge_id: Uuid,
  ) -> Verdict<(), UnassignError, R::Error> {
    if repo.challenge(challenge_id)?.is_none() {
      return Ok(Err(UnassignError::NotFound));
    }
    if !repo.force_release(challenge_id)? {
      return Ok(Err(UnassignError::NotAssigned));
    }
    Ok(Ok(()))
  }

  /// Retract a completion's points while keeping the post as an audit
  /// record.
  pub fn revoke_points<R: ChallengeRepo>(
    &self,
    repo: &mut R,
    post_id: Uuid,
  ) -> Verdict<(), RevokeError, R::Error> {
    let Some(post) = repo.post(post_id)? else {
      return Ok(Err(RevokeError::NotFound));
    };
    if post.revoked {
      return Ok(Err(RevokeError::AlreadyRevoked));
    }

    repo.reopen_completed_by_post(post.challenge_id, post_id)?;
    repo.drop_submission_for_post(post_id)?;
    if !repo.revoke_post(post_id)? {
      return Ok(Err(RevokeError::AlreadyRevoked));
    }
    Ok(Ok(()))
  }

  /// Self-service removal of a post. Unlike revocation the row is deleted.
  pub fn delete_post<R: ChallengeRepo>(
    &self,
    repo: &mut R,
    post_id: Uuid,
    user_id: Uuid,
  ) -> Verdict<(), DeletePostError, R::Error> {
    let Some(post) = repo.post(post_id)? else {
      return Ok(Err(DeletePostError::NotFound));
    };
    if post.user_id != user_id {
      return Ok(Err(DeletePostError::Forbidden));
    }

    repo.reopen_completed_by_post(post.challenge_id, post_id)?;
    repo.drop_submission_for_post(post_id)?;
    if !repo.delete_post(post_id)? {
      return Ok(Err(DeletePostError::NotFound));
    }
    Ok(Ok(()))
  }
}

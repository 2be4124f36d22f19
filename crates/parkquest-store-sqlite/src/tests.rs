//! Integration tests for `SqliteStore` against an in-memory database.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use parkquest_core::{
  challenge::{
    ActiveWindow, Challenge, ChallengeStatus, ChallengeType, NewChallenge,
  },
  clock::ManualClock,
  error::{
    AwardError, CancelError, CompleteError, DeletePostError, PickError,
    RevokeError, UnassignError,
  },
  post::{FeedQuery, Media, MediaKind, NewPost},
  repo::ChallengeRepo,
  store::ChallengeStore,
  user::{NewUser, User},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn user(s: &SqliteStore, name: &str) -> User {
  s.add_user(NewUser::new(name)).await.unwrap()
}

async fn challenge(s: &SqliteStore, ty: ChallengeType, points: u32) -> Challenge {
  s.create_challenge(NewChallenge::new("Ride the coaster", "Front row", points, ty))
    .await
    .unwrap()
}

fn photo() -> Media {
  Media { url: "https://cdn.example/p.jpg".into(), kind: MediaKind::Photo }
}

async fn reload(s: &SqliteStore, id: Uuid) -> Challenge {
  let c = s.get_challenge(id).await.unwrap().expect("challenge exists");
  assert!(c.is_consistent(), "inconsistent challenge row: {c:?}");
  c
}

/// Pick and complete an exclusive challenge, returning the post id.
async fn pick_and_complete(s: &SqliteStore, c: Uuid, u: Uuid) -> Uuid {
  s.pick(c, u).await.unwrap().unwrap();
  s.complete(c, u, photo(), None).await.unwrap().unwrap().post_id
}

/// Join and submit to an open challenge, returning the post id.
async fn join_and_submit(s: &SqliteStore, c: Uuid, u: Uuid) -> Uuid {
  s.pick(c, u).await.unwrap().unwrap();
  s.complete(c, u, photo(), Some("done".into()))
    .await
    .unwrap()
    .unwrap()
    .post_id
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_user() {
  let s = store().await;

  let u = s.add_user(NewUser::admin("ops")).await.unwrap();
  assert!(u.is_admin());

  let fetched = s.get_user(u.user_id).await.unwrap().unwrap();
  assert_eq!(fetched.username, "ops");
  assert!(fetched.is_admin());

  assert!(s.get_user(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_username_is_a_database_error() {
  let s = store().await;
  user(&s, "alice").await;
  let err = s.add_user(NewUser::new("alice")).await.unwrap_err();
  assert!(matches!(err, Error::Database(_)));
}

#[tokio::test]
async fn update_profile_changes_display_name_only() {
  let s = store().await;
  let alice = user(&s, "alice").await;

  let updated = s
    .update_profile(alice.user_id, " Alice L. ".into())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.display_name, "Alice L.");
  assert_eq!(updated.username, "alice");

  let fetched = s.get_user(alice.user_id).await.unwrap().unwrap();
  assert_eq!(fetched.display_name, "Alice L.");

  assert!(
    s.update_profile(Uuid::new_v4(), "Ghost".into())
      .await
      .unwrap()
      .is_none()
  );
  let err = s.update_profile(alice.user_id, "  ".into()).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(parkquest_core::Error::EmptyDisplayName)
  ));
}

// ─── Catalogue ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_challenge_validates_input() {
  let s = store().await;
  let err = s
    .create_challenge(NewChallenge::new("t", "d", 0, ChallengeType::Exclusive))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(parkquest_core::Error::NonPositivePoints)
  ));
  assert!(s.list_challenges(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn new_challenge_starts_available() {
  let s = store().await;
  let c = challenge(&s, ChallengeType::Open, 30).await;
  let fetched = reload(&s, c.challenge_id).await;
  assert_eq!(fetched.status, ChallengeStatus::Available);
  assert_eq!(fetched.challenge_type, ChallengeType::Open);
  assert_eq!(fetched.points, 30);
}

#[tokio::test]
async fn update_replaces_catalogue_fields_only() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let c = challenge(&s, ChallengeType::Exclusive, 10).await;
  s.pick(c.challenge_id, alice.user_id).await.unwrap().unwrap();

  let mut edit = NewChallenge::new("Renamed", "New text", 25, ChallengeType::Exclusive);
  edit.image_url = Some("https://cdn.example/c.png".into());
  let updated = s
    .update_challenge(c.challenge_id, edit)
    .await
    .unwrap()
    .unwrap();

  assert_eq!(updated.title, "Renamed");
  assert_eq!(updated.points, 25);
  assert_eq!(updated.status, ChallengeStatus::InProgress);
  assert_eq!(updated.assigned_to, Some(alice.user_id));

  let missing = s
    .update_challenge(Uuid::new_v4(), NewChallenge::new("x", "y", 1, ChallengeType::Open))
    .await
    .unwrap();
  assert!(missing.is_none());
}

#[tokio::test]
async fn type_change_is_refused_once_entrants_exist() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let c = challenge(&s, ChallengeType::Open, 10).await;
  s.pick(c.challenge_id, alice.user_id).await.unwrap().unwrap();

  let err = s
    .update_challenge(
      c.challenge_id,
      NewChallenge::new("t", "d", 10, ChallengeType::Exclusive),
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(parkquest_core::Error::TypeLocked)));
  assert_eq!(reload(&s, c.challenge_id).await.challenge_type, ChallengeType::Open);
}

#[tokio::test]
async fn delete_challenge_removes_posts_and_submissions() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let c = challenge(&s, ChallengeType::Open, 10).await;
  let post = join_and_submit(&s, c.challenge_id, alice.user_id).await;
  s.like(post, alice.user_id).await.unwrap();
  s.add_comment(post, alice.user_id, "nice".into()).await.unwrap();

  assert!(s.delete_challenge(c.challenge_id).await.unwrap());
  assert!(s.get_challenge(c.challenge_id).await.unwrap().is_none());
  assert!(s.get_post(post).await.unwrap().is_none());
  assert!(s.list_submissions(c.challenge_id).await.unwrap().is_empty());
  assert!(s.feed(FeedQuery::default()).await.unwrap().is_empty());

  assert!(!s.delete_challenge(c.challenge_id).await.unwrap());
}

#[tokio::test]
async fn in_progress_exclusive_is_hidden_from_other_users() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let c = challenge(&s, ChallengeType::Exclusive, 10).await;
  s.pick(c.challenge_id, alice.user_id).await.unwrap().unwrap();

  let for_alice = s.list_challenges(Some(alice.user_id)).await.unwrap();
  let for_bob = s.list_challenges(Some(bob.user_id)).await.unwrap();
  assert_eq!(for_alice.len(), 1);
  assert!(for_bob.is_empty());
  assert_eq!(s.list_challenges(None).await.unwrap().len(), 1);
}

// ─── Exclusive assignment ────────────────────────────────────────────────────

#[tokio::test]
async fn pick_assigns_exclusive_challenge() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let c = challenge(&s, ChallengeType::Exclusive, 50).await;

  s.pick(c.challenge_id, alice.user_id).await.unwrap().unwrap();

  let c = reload(&s, c.challenge_id).await;
  assert_eq!(c.status, ChallengeStatus::InProgress);
  assert_eq!(c.assigned_to, Some(alice.user_id));
}

#[tokio::test]
async fn pick_rejections() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let c = challenge(&s, ChallengeType::Exclusive, 50).await;

  assert_eq!(
    s.pick(Uuid::new_v4(), alice.user_id).await.unwrap(),
    Err(PickError::NotFound)
  );

  s.pick(c.challenge_id, alice.user_id).await.unwrap().unwrap();
  assert_eq!(
    s.pick(c.challenge_id, alice.user_id).await.unwrap(),
    Err(PickError::AlreadyAssigned)
  );
  assert_eq!(
    s.pick(c.challenge_id, bob.user_id).await.unwrap(),
    Err(PickError::AlreadyTaken)
  );

  s.complete(c.challenge_id, alice.user_id, photo(), None)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(
    s.pick(c.challenge_id, bob.user_id).await.unwrap(),
    Err(PickError::NotAvailable)
  );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_picks_have_exactly_one_winner() {
  const CONTENDERS: usize = 16;

  let s = store().await;
  let c = challenge(&s, ChallengeType::Exclusive, 100).await;

  let mut users = Vec::new();
  for i in 0..CONTENDERS {
    users.push(user(&s, &format!("user{i}")).await.user_id);
  }

  let handles: Vec<_> = users
    .iter()
    .map(|&u| {
      let s = s.clone();
      let id = c.challenge_id;
      tokio::spawn(async move { s.pick(id, u).await.unwrap() })
    })
    .collect();

  let mut wins = 0;
  let mut taken = 0;
  for h in handles {
    match h.await.unwrap() {
      Ok(()) => wins += 1,
      Err(PickError::AlreadyTaken) => taken += 1,
      Err(other) => panic!("unexpected rejection: {other:?}"),
    }
  }
  assert_eq!(wins, 1);
  assert_eq!(taken, CONTENDERS - 1);

  let c = reload(&s, c.challenge_id).await;
  assert_eq!(c.status, ChallengeStatus::InProgress);
  assert!(users.contains(&c.assigned_to.unwrap()));
}

#[tokio::test]
async fn cancel_returns_challenge_to_pool() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let c = challenge(&s, ChallengeType::Exclusive, 50).await;
  s.pick(c.challenge_id, alice.user_id).await.unwrap().unwrap();

  assert_eq!(
    s.cancel(c.challenge_id, bob.user_id).await.unwrap(),
    Err(CancelError::NotYours)
  );
  s.cancel(c.challenge_id, alice.user_id).await.unwrap().unwrap();

  let after = reload(&s, c.challenge_id).await;
  assert_eq!(after.status, ChallengeStatus::Available);
  assert_eq!(after.assigned_to, None);

  assert_eq!(
    s.cancel(c.challenge_id, alice.user_id).await.unwrap(),
    Err(CancelError::NotYours)
  );
  assert_eq!(
    s.cancel(Uuid::new_v4(), alice.user_id).await.unwrap(),
    Err(CancelError::NotFound)
  );
}

#[tokio::test]
async fn complete_exclusive_earns_points_immediately() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let c = challenge(&s, ChallengeType::Exclusive, 100).await;
  s.pick(c.challenge_id, alice.user_id).await.unwrap().unwrap();

  let done = s
    .complete(c.challenge_id, alice.user_id, photo(), Some("wheee".into()))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(done.points_earned, 100);
  assert!(!done.pending_review);

  let c = reload(&s, c.challenge_id).await;
  assert_eq!(c.status, ChallengeStatus::Completed);
  assert_eq!(c.assigned_to, None);
  assert_eq!(c.completed_by, Some(alice.user_id));
  assert_eq!(c.completed_post, Some(done.post_id));
  assert!(c.completed_at.is_some());

  let stats = s.user_stats(alice.user_id).await.unwrap();
  assert_eq!(stats.total_points, 100);
  assert_eq!(stats.challenges_completed, 1);
}

#[tokio::test]
async fn complete_requires_assignment() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let c = challenge(&s, ChallengeType::Exclusive, 100).await;

  assert_eq!(
    s.complete(c.challenge_id, alice.user_id, photo(), None).await.unwrap(),
    Err(CompleteError::NotAssigned)
  );

  s.pick(c.challenge_id, alice.user_id).await.unwrap().unwrap();
  assert_eq!(
    s.complete(c.challenge_id, bob.user_id, photo(), None).await.unwrap(),
    Err(CompleteError::NotAssigned)
  );
  assert_eq!(
    s.complete(Uuid::new_v4(), bob.user_id, photo(), None).await.unwrap(),
    Err(CompleteError::NotFound)
  );

  // Rejected completions leave no post behind.
  assert!(s.feed(FeedQuery::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn rejected_transaction_rolls_back_its_writes() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let c = challenge(&s, ChallengeType::Exclusive, 10).await;
  let (challenge_id, user_id) = (c.challenge_id, alice.user_id);

  let verdict = s
    .transact(
      move |repo| {
        repo.insert_post(
          NewPost { user_id, challenge_id, media: photo(), caption: None },
          Utc::now(),
        )?;
        Ok(Err::<(), _>(CompleteError::NotAssigned))
      },
      Result::is_ok,
    )
    .await
    .unwrap();

  assert_eq!(verdict, Err(CompleteError::NotAssigned));
  assert!(s.feed(FeedQuery::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn unassign_forces_challenge_back_to_pool() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let c = challenge(&s, ChallengeType::Exclusive, 10).await;

  assert_eq!(
    s.unassign(c.challenge_id).await.unwrap(),
    Err(UnassignError::NotAssigned)
  );
  assert_eq!(
    s.unassign(Uuid::new_v4()).await.unwrap(),
    Err(UnassignError::NotFound)
  );

  s.pick(c.challenge_id, alice.user_id).await.unwrap().unwrap();
  s.unassign(c.challenge_id).await.unwrap().unwrap();

  let after = reload(&s, c.challenge_id).await;
  assert_eq!(after.status, ChallengeStatus::Available);
  assert_eq!(after.assigned_to, None);
  s.pick(c.challenge_id, bob.user_id).await.unwrap().unwrap();
}

// ─── Revocation & deletion ───────────────────────────────────────────────────

#[tokio::test]
async fn revoke_resets_challenge_and_removes_points() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let c = challenge(&s, ChallengeType::Exclusive, 100).await;
  let post = pick_and_complete(&s, c.challenge_id, alice.user_id).await;
  assert_eq!(s.user_stats(alice.user_id).await.unwrap().total_points, 100);

  s.revoke_points(post).await.unwrap().unwrap();

  let after = reload(&s, c.challenge_id).await;
  assert_eq!(after.status, ChallengeStatus::Available);
  assert_eq!(after.assigned_to, None);
  assert_eq!(after.completed_by, None);
  assert_eq!(after.completed_post, None);
  assert_eq!(after.completed_at, None);

  let stats = s.user_stats(alice.user_id).await.unwrap();
  assert_eq!(stats.total_points, 0);
  assert_eq!(stats.challenges_completed, 0);

  // Kept as an audit record, flagged in the feed.
  let kept = s.get_post(post).await.unwrap().unwrap();
  assert!(kept.revoked);
  let feed = s.feed(FeedQuery::default()).await.unwrap();
  assert_eq!(feed.len(), 1);
  assert!(feed[0].post.revoked);

  assert_eq!(
    s.revoke_points(post).await.unwrap(),
    Err(RevokeError::AlreadyRevoked)
  );
  assert_eq!(
    s.revoke_points(Uuid::new_v4()).await.unwrap(),
    Err(RevokeError::NotFound)
  );
}

#[tokio::test]
async fn revoking_a_stale_post_leaves_the_new_completion_alone() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let c = challenge(&s, ChallengeType::Open, 40).await;

  let alice_post = join_and_submit(&s, c.challenge_id, alice.user_id).await;
  let bob_post = join_and_submit(&s, c.challenge_id, bob.user_id).await;
  s.award(c.challenge_id, bob.user_id).await.unwrap().unwrap();

  s.revoke_points(alice_post).await.unwrap().unwrap();

  let after = reload(&s, c.challenge_id).await;
  assert_eq!(after.status, ChallengeStatus::Completed);
  assert_eq!(after.completed_by, Some(bob.user_id));
  assert_eq!(after.completed_post, Some(bob_post));
  assert_eq!(s.user_stats(bob.user_id).await.unwrap().total_points, 40);

  let entrants = s.list_submissions(c.challenge_id).await.unwrap();
  assert_eq!(entrants.len(), 1);
  assert_eq!(entrants[0].user_id, bob.user_id);
}

#[tokio::test]
async fn deleting_own_completed_post_reopens_the_challenge() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let c = challenge(&s, ChallengeType::Exclusive, 75).await;
  let post = pick_and_complete(&s, c.challenge_id, alice.user_id).await;
  s.like(post, bob.user_id).await.unwrap();
  s.add_comment(post, bob.user_id, "wow".into()).await.unwrap();

  assert_eq!(
    s.delete_post(post, bob.user_id).await.unwrap(),
    Err(DeletePostError::Forbidden)
  );
  s.delete_post(post, alice.user_id).await.unwrap().unwrap();

  assert!(s.get_post(post).await.unwrap().is_none());
  assert!(s.list_comments(post).await.unwrap().is_empty());
  let after = reload(&s, c.challenge_id).await;
  assert_eq!(after.status, ChallengeStatus::Available);
  assert_eq!(s.user_stats(alice.user_id).await.unwrap().total_points, 0);

  // Immediately pickable again, by the former owner or anyone else.
  s.pick(c.challenge_id, alice.user_id).await.unwrap().unwrap();
  s.cancel(c.challenge_id, alice.user_id).await.unwrap().unwrap();
  s.pick(c.challenge_id, bob.user_id).await.unwrap().unwrap();

  assert_eq!(
    s.delete_post(post, alice.user_id).await.unwrap(),
    Err(DeletePostError::NotFound)
  );
}

// ─── Open challenges ─────────────────────────────────────────────────────────

#[tokio::test]
async fn joining_twice_is_rejected() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let c = challenge(&s, ChallengeType::Open, 20).await;

  s.pick(c.challenge_id, alice.user_id).await.unwrap().unwrap();
  assert_eq!(
    s.pick(c.challenge_id, alice.user_id).await.unwrap(),
    Err(PickError::AlreadyJoined)
  );

  // Joining never touches the challenge row.
  let after = reload(&s, c.challenge_id).await;
  assert_eq!(after.status, ChallengeStatus::Available);
  assert_eq!(after.assigned_to, None);
}

#[tokio::test]
async fn open_submission_awaits_review() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let c = challenge(&s, ChallengeType::Open, 20).await;

  assert_eq!(
    s.complete(c.challenge_id, alice.user_id, photo(), None).await.unwrap(),
    Err(CompleteError::NotJoined)
  );

  s.pick(c.challenge_id, alice.user_id).await.unwrap().unwrap();
  let done = s
    .complete(c.challenge_id, alice.user_id, photo(), None)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(done.points_earned, 0);
  assert!(done.pending_review);
  assert_eq!(s.user_stats(alice.user_id).await.unwrap().total_points, 0);

  let entrants = s.list_submissions(c.challenge_id).await.unwrap();
  assert_eq!(entrants[0].post_id, Some(done.post_id));

  assert_eq!(
    s.complete(c.challenge_id, alice.user_id, photo(), None).await.unwrap(),
    Err(CompleteError::AlreadySubmitted)
  );
}

#[tokio::test]
async fn open_cancel_only_before_submitting() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let c = challenge(&s, ChallengeType::Open, 20).await;

  s.pick(c.challenge_id, alice.user_id).await.unwrap().unwrap();
  s.cancel(c.challenge_id, alice.user_id).await.unwrap().unwrap();
  assert!(s.list_submissions(c.challenge_id).await.unwrap().is_empty());

  join_and_submit(&s, c.challenge_id, bob.user_id).await;
  assert_eq!(
    s.cancel(c.challenge_id, bob.user_id).await.unwrap(),
    Err(CancelError::NotYours)
  );
}

#[tokio::test]
async fn award_credits_only_the_winner() {
  let s = store().await;
  let a = user(&s, "a").await;
  let b = user(&s, "b").await;
  let c3 = user(&s, "c").await;
  let c = challenge(&s, ChallengeType::Open, 60).await;

  for u in [a.user_id, b.user_id, c3.user_id] {
    join_and_submit(&s, c.challenge_id, u).await;
  }
  s.award(c.challenge_id, b.user_id).await.unwrap().unwrap();

  assert_eq!(s.user_stats(a.user_id).await.unwrap().total_points, 0);
  assert_eq!(s.user_stats(b.user_id).await.unwrap().total_points, 60);
  assert_eq!(s.user_stats(c3.user_id).await.unwrap().total_points, 0);

  let after = reload(&s, c.challenge_id).await;
  assert_eq!(after.status, ChallengeStatus::Completed);
  assert_eq!(after.completed_by, Some(b.user_id));

  assert_eq!(
    s.award(c.challenge_id, a.user_id).await.unwrap(),
    Err(AwardError::AlreadyAwarded)
  );
  assert_eq!(
    s.complete(c.challenge_id, a.user_id, photo(), None).await.unwrap(),
    Err(CompleteError::Closed)
  );

  let board = s.leaderboard().await.unwrap();
  assert_eq!(board[0].user_id, b.user_id);
  assert_eq!(board.len(), 3);
}

#[tokio::test]
async fn award_rejections() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let open = challenge(&s, ChallengeType::Open, 20).await;
  let excl = challenge(&s, ChallengeType::Exclusive, 20).await;

  assert_eq!(
    s.award(Uuid::new_v4(), alice.user_id).await.unwrap(),
    Err(AwardError::NotFound)
  );
  assert_eq!(
    s.award(excl.challenge_id, alice.user_id).await.unwrap(),
    Err(AwardError::NotOpen)
  );

  // Joined but never submitted.
  s.pick(open.challenge_id, alice.user_id).await.unwrap().unwrap();
  assert_eq!(
    s.award(open.challenge_id, alice.user_id).await.unwrap(),
    Err(AwardError::NoSubmission)
  );

  // Submitted, then revoked.
  let post = join_and_submit(&s, open.challenge_id, bob.user_id).await;
  s.revoke_points(post).await.unwrap().unwrap();
  assert_eq!(
    s.award(open.challenge_id, bob.user_id).await.unwrap(),
    Err(AwardError::NoSubmission)
  );
}

#[tokio::test]
async fn revoked_entrant_may_rejoin() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let c = challenge(&s, ChallengeType::Open, 20).await;

  let post = join_and_submit(&s, c.challenge_id, alice.user_id).await;
  s.revoke_points(post).await.unwrap().unwrap();

  let again = join_and_submit(&s, c.challenge_id, alice.user_id).await;
  s.award(c.challenge_id, alice.user_id).await.unwrap().unwrap();
  assert_ne!(again, post);
  assert_eq!(s.user_stats(alice.user_id).await.unwrap().total_points, 20);
}

#[tokio::test]
async fn open_winner_revoke_reopens_and_allows_reaward() {
  let s = store().await;
  let a = user(&s, "a").await;
  let b = user(&s, "b").await;
  let c = challenge(&s, ChallengeType::Open, 30).await;

  let a_post = join_and_submit(&s, c.challenge_id, a.user_id).await;
  let b_post = join_and_submit(&s, c.challenge_id, b.user_id).await;
  s.award(c.challenge_id, a.user_id).await.unwrap().unwrap();
  assert_eq!(s.user_stats(a.user_id).await.unwrap().total_points, 30);

  s.revoke_points(a_post).await.unwrap().unwrap();

  let after = reload(&s, c.challenge_id).await;
  assert_eq!(after.status, ChallengeStatus::Available);
  assert_eq!(after.completed_by, None);
  assert_eq!(after.completed_post, None);
  assert_eq!(after.completed_at, None);
  assert_eq!(s.user_stats(a.user_id).await.unwrap().total_points, 0);

  // The other entrant is still in the running and can now win.
  s.award(c.challenge_id, b.user_id).await.unwrap().unwrap();
  let after = reload(&s, c.challenge_id).await;
  assert_eq!(after.completed_by, Some(b.user_id));
  assert_eq!(after.completed_post, Some(b_post));
  assert_eq!(s.user_stats(a.user_id).await.unwrap().total_points, 0);
  assert_eq!(s.user_stats(b.user_id).await.unwrap().total_points, 30);
}

#[tokio::test]
async fn open_winner_delete_reopens() {
  let s = store().await;
  let a = user(&s, "a").await;
  let b = user(&s, "b").await;
  let c = challenge(&s, ChallengeType::Open, 30).await;

  join_and_submit(&s, c.challenge_id, a.user_id).await;
  let b_post = join_and_submit(&s, c.challenge_id, b.user_id).await;
  s.award(c.challenge_id, b.user_id).await.unwrap().unwrap();
  assert_eq!(s.user_stats(b.user_id).await.unwrap().total_points, 30);

  s.delete_post(b_post, b.user_id).await.unwrap().unwrap();

  let after = reload(&s, c.challenge_id).await;
  assert_eq!(after.status, ChallengeStatus::Available);
  assert_eq!(after.completed_by, None);
  assert_eq!(after.completed_post, None);
  assert_eq!(s.user_stats(b.user_id).await.unwrap().total_points, 0);

  // Only a's entry remains; b may join again.
  let entrants = s.list_submissions(c.challenge_id).await.unwrap();
  assert_eq!(entrants.len(), 1);
  assert_eq!(entrants[0].user_id, a.user_id);
  s.pick(c.challenge_id, b.user_id).await.unwrap().unwrap();
}

// ─── Invariants across operation sequences ──────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Step {
  Pick(usize),
  Cancel(usize),
  Complete(usize),
  Award(usize),
  Unassign,
  RevokeLast,
  DeleteLast,
}

/// Apply `steps` to a fresh challenge of type `ty`, checking the row after
/// every step. Rejections are expected along the way; store errors are not.
async fn run_steps(ty: ChallengeType, steps: &[Step]) {
  let s = store().await;
  let users = [user(&s, "u0").await, user(&s, "u1").await];
  let c = challenge(&s, ty, 10).await;
  let id = c.challenge_id;
  let mut last_post: Option<(Uuid, Uuid)> = None;

  for (i, step) in steps.iter().enumerate() {
    match *step {
      Step::Pick(u) => {
        let _ = s.pick(id, users[u].user_id).await.unwrap();
      }
      Step::Cancel(u) => {
        let _ = s.cancel(id, users[u].user_id).await.unwrap();
      }
      Step::Complete(u) => {
        if let Ok(done) =
          s.complete(id, users[u].user_id, photo(), None).await.unwrap()
        {
          last_post = Some((done.post_id, users[u].user_id));
        }
      }
      Step::Award(u) => {
        let _ = s.award(id, users[u].user_id).await.unwrap();
      }
      Step::Unassign => {
        let _ = s.unassign(id).await.unwrap();
      }
      Step::RevokeLast => {
        if let Some((post, _)) = last_post {
          let _ = s.revoke_points(post).await.unwrap();
        }
      }
      Step::DeleteLast => {
        if let Some((post, owner)) = last_post.take() {
          let _ = s.delete_post(post, owner).await.unwrap();
        }
      }
    }

    let row = s.get_challenge(id).await.unwrap().unwrap();
    assert!(row.is_consistent(), "step {i} ({step:?}) left {row:?}");
    if ty == ChallengeType::Exclusive {
      assert_eq!(
        row.assigned_to.is_some(),
        row.status == ChallengeStatus::InProgress,
        "step {i} ({step:?}) left {row:?}"
      );
    } else {
      assert_eq!(row.assigned_to, None);
      assert_ne!(row.status, ChallengeStatus::InProgress);
    }
  }
}

#[tokio::test]
async fn operation_sequences_keep_challenge_rows_consistent() {
  use Step::*;

  let exclusive: &[&[Step]] = &[
    &[Pick(0), Pick(1), Cancel(1), Cancel(0), Pick(1), Complete(1)],
    &[Pick(0), Complete(1), Complete(0), RevokeLast, RevokeLast, Pick(0)],
    &[Pick(0), Unassign, Unassign, Pick(1), Complete(1), DeleteLast, Pick(1)],
    &[Pick(0), Complete(0), Pick(1), Cancel(0), Unassign, RevokeLast, Complete(0)],
    &[Award(0), Pick(0), Award(0), Complete(0), DeleteLast, Complete(0)],
  ];
  for steps in exclusive {
    run_steps(ChallengeType::Exclusive, steps).await;
  }

  let open: &[&[Step]] = &[
    &[Pick(0), Pick(1), Complete(0), Complete(1), Award(1), RevokeLast, Award(0)],
    &[Pick(0), Award(0), Complete(0), Cancel(0), Award(0), Complete(1), DeleteLast],
    &[Pick(0), Complete(0), Unassign, Award(0), Pick(1), Complete(1), Award(1)],
  ];
  for steps in open {
    run_steps(ChallengeType::Open, steps).await;
  }
}

// ─── Scenarios ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn exclusive_race_cancel_and_complete() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let c = challenge(&s, ChallengeType::Exclusive, 100).await;
  let id = c.challenge_id;

  s.pick(id, alice.user_id).await.unwrap().unwrap();
  assert_eq!(s.pick(id, bob.user_id).await.unwrap(), Err(PickError::AlreadyTaken));
  s.cancel(id, alice.user_id).await.unwrap().unwrap();
  s.pick(id, bob.user_id).await.unwrap().unwrap();
  reload(&s, id).await;
  s.complete(id, bob.user_id, photo(), None).await.unwrap().unwrap();
  assert_eq!(s.pick(id, alice.user_id).await.unwrap(), Err(PickError::NotAvailable));

  assert_eq!(s.user_stats(bob.user_id).await.unwrap().total_points, 100);
  assert_eq!(s.user_stats(alice.user_id).await.unwrap().total_points, 0);
  reload(&s, id).await;
}

#[tokio::test]
async fn leaderboard_ranks_users_and_skips_admins() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let carol = user(&s, "carol").await;
  let admin = s.add_user(NewUser::admin("ops")).await.unwrap();

  let c1 = challenge(&s, ChallengeType::Exclusive, 50).await;
  let c2 = challenge(&s, ChallengeType::Exclusive, 50).await;
  let c3 = challenge(&s, ChallengeType::Exclusive, 30).await;
  let c4 = challenge(&s, ChallengeType::Exclusive, 10).await;
  pick_and_complete(&s, c1.challenge_id, bob.user_id).await;
  pick_and_complete(&s, c2.challenge_id, alice.user_id).await;
  pick_and_complete(&s, c3.challenge_id, carol.user_id).await;
  pick_and_complete(&s, c4.challenge_id, admin.user_id).await;

  let board = s.leaderboard().await.unwrap();
  let names: Vec<_> = board.iter().map(|e| e.username.as_str()).collect();
  assert_eq!(names, ["alice", "bob", "carol"]);
  assert_eq!(board[0].total_points, 50);
  assert_eq!(board[2].challenges_completed, 1);
}

// ─── Active window ───────────────────────────────────────────────────────────

#[tokio::test]
async fn pick_respects_active_window_bounds() {
  let start = Utc.with_ymd_and_hms(2026, 7, 4, 9, 0, 0).unwrap();
  let end = Utc.with_ymd_and_hms(2026, 7, 4, 17, 0, 0).unwrap();
  let clock = Arc::new(ManualClock::new(start - Duration::seconds(1)));
  let s = store().await.with_clock(clock.clone());

  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let mut input = NewChallenge::new("Fireworks", "Watch them", 10, ChallengeType::Open);
  input.window = ActiveWindow { starts_at: Some(start), ends_at: Some(end) };
  let c = s.create_challenge(input).await.unwrap();

  assert_eq!(
    s.pick(c.challenge_id, alice.user_id).await.unwrap(),
    Err(PickError::OutOfWindow)
  );
  assert!(s.list_challenges(Some(alice.user_id)).await.unwrap().is_empty());

  clock.set(start);
  s.pick(c.challenge_id, alice.user_id).await.unwrap().unwrap();

  clock.set(end);
  s.pick(c.challenge_id, bob.user_id).await.unwrap().unwrap();

  clock.advance(Duration::seconds(1));
  let carol = user(&s, "carol").await;
  assert_eq!(
    s.pick(c.challenge_id, carol.user_id).await.unwrap(),
    Err(PickError::OutOfWindow)
  );
}

// ─── Feed & social ───────────────────────────────────────────────────────────

#[tokio::test]
async fn feed_is_newest_first_and_paginated() {
  let clock = Arc::new(ManualClock::new(Utc::now()));
  let s = store().await.with_clock(clock.clone());
  let alice = user(&s, "alice").await;

  let mut posts = Vec::new();
  for _ in 0..3 {
    let c = challenge(&s, ChallengeType::Exclusive, 5).await;
    clock.advance(Duration::minutes(1));
    posts.push(pick_and_complete(&s, c.challenge_id, alice.user_id).await);
  }

  let first = s
    .feed(FeedQuery { page: Some(1), limit: Some(2), viewer: None })
    .await
    .unwrap();
  let second = s
    .feed(FeedQuery { page: Some(2), limit: Some(2), viewer: None })
    .await
    .unwrap();

  let ids: Vec<_> = first.iter().chain(&second).map(|i| i.post.post_id).collect();
  assert_eq!(ids, [posts[2], posts[1], posts[0]]);
  assert_eq!(first[0].username, "alice");
  assert_eq!(first[0].challenge_points, 5);
  assert_eq!(first[0].challenge_completed_by, Some(alice.user_id));
}

#[tokio::test]
async fn likes_are_idempotent_and_counted() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let c = challenge(&s, ChallengeType::Exclusive, 5).await;
  let post = pick_and_complete(&s, c.challenge_id, alice.user_id).await;

  assert!(s.like(post, bob.user_id).await.unwrap());
  assert!(s.like(post, bob.user_id).await.unwrap());
  assert!(!s.like(Uuid::new_v4(), bob.user_id).await.unwrap());

  let feed = s
    .feed(FeedQuery { viewer: Some(bob.user_id), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(feed[0].likes, 1);
  assert!(feed[0].liked_by_viewer);

  let feed = s
    .feed(FeedQuery { viewer: Some(alice.user_id), ..Default::default() })
    .await
    .unwrap();
  assert!(!feed[0].liked_by_viewer);

  assert!(s.unlike(post, bob.user_id).await.unwrap());
  assert!(!s.unlike(post, bob.user_id).await.unwrap());
  assert_eq!(s.feed(FeedQuery::default()).await.unwrap()[0].likes, 0);
}

#[tokio::test]
async fn comments_are_listed_oldest_first() {
  let clock = Arc::new(ManualClock::new(Utc::now()));
  let s = store().await.with_clock(clock.clone());
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let c = challenge(&s, ChallengeType::Exclusive, 5).await;
  let post = pick_and_complete(&s, c.challenge_id, alice.user_id).await;

  s.add_comment(post, bob.user_id, "first".into()).await.unwrap().unwrap();
  clock.advance(Duration::seconds(5));
  let second = s
    .add_comment(post, alice.user_id, "  second  ".into())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(second.content, "second");
  assert_eq!(second.username, "alice");

  let comments = s.list_comments(post).await.unwrap();
  let texts: Vec<_> = comments.iter().map(|c| c.content.as_str()).collect();
  assert_eq!(texts, ["first", "second"]);
  assert_eq!(s.feed(FeedQuery::default()).await.unwrap()[0].comments, 2);

  let err = s.add_comment(post, bob.user_id, "   ".into()).await.unwrap_err();
  assert!(matches!(err, Error::Core(parkquest_core::Error::EmptyComment)));
  assert!(
    s.add_comment(Uuid::new_v4(), bob.user_id, "hi".into())
      .await
      .unwrap()
      .is_none()
  );
}

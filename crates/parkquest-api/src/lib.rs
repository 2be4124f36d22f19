//! JSON REST API for ParkQuest.
//!
//! Exposes an axum [`Router`] backed by any
//! [`parkquest_core::store::ChallengeStore`]. Engine rejections become 4xx
//! responses with a machine-readable `code`; store failures become 500s.
//! Authentication, TLS, and transport concerns are the caller's
//! responsibility: see [`caller`] for how identity arrives.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", parkquest_api::api_router(store.clone()))
//! ```

pub mod admin;
pub mod caller;
pub mod challenges;
pub mod error;
pub mod posts;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use parkquest_core::store::ChallengeStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: ChallengeStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    // Challenges
    .route("/challenges", get(challenges::list::<S>))
    .route("/challenges/{id}", get(challenges::get_one::<S>))
    .route("/challenges/{id}/pick", post(challenges::pick::<S>))
    .route("/challenges/{id}/cancel", post(challenges::cancel::<S>))
    .route("/challenges/{id}/complete", post(challenges::complete::<S>))
    // Admin
    .route(
      "/admin/challenges",
      get(admin::list::<S>).post(admin::create::<S>),
    )
    .route(
      "/admin/challenges/{id}",
      put(admin::update::<S>).delete(admin::delete::<S>),
    )
    .route("/admin/challenges/{id}/unassign", post(admin::unassign::<S>))
    .route("/admin/challenges/{id}/award", post(admin::award::<S>))
    .route("/admin/posts/{id}/revoke", post(admin::revoke::<S>))
    // Feed & posts
    .route("/feed", get(posts::feed::<S>))
    .route("/posts/{id}", get(posts::get_one::<S>).delete(posts::delete::<S>))
    .route(
      "/posts/{id}/like",
      post(posts::like::<S>).delete(posts::unlike::<S>),
    )
    .route(
      "/posts/{id}/comments",
      get(posts::list_comments::<S>).post(posts::add_comment::<S>),
    )
    // Users
    .route("/users/me", get(users::me::<S>).put(users::update_me::<S>))
    .route("/users/{id}", get(users::get_one::<S>))
    .route("/leaderboard", get(users::leaderboard::<S>))
    .with_state(store)
}

// ─── Router tests ────────────────────────────────────────────────────────────

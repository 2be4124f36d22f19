//! Handlers for profiles and the leaderboard.
//!
//! Points are never stored; every response here is computed on read.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use parkquest_core::{
  scoring::{LeaderboardEntry, UserStats},
  store::ChallengeStore,
  user::User,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{caller::Caller, error::ApiError};

/// A user with their derived score.
#[derive(Debug, Serialize)]
pub struct Profile {
  #[serde(flatten)]
  pub user:  User,
  #[serde(flatten)]
  pub stats: UserStats,
}

async fn profile<S>(store: &S, user: User) -> Result<Profile, ApiError>
where
  S: ChallengeStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let stats = store
    .user_stats(user.user_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Profile { user, stats })
}

/// `GET /users/me`
pub async fn me<S>(
  State(store): State<Arc<S>>,
  Caller(user): Caller,
) -> Result<Json<Profile>, ApiError>
where
  S: ChallengeStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Ok(Json(profile(store.as_ref(), user).await?))
}

#[derive(Debug, Deserialize)]
pub struct ProfileBody {
  pub display_name: String,
}

/// `PUT /users/me`
pub async fn update_me<S>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Json(body): Json<ProfileBody>,
) -> Result<Json<Profile>, ApiError>
where
  S: ChallengeStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if body.display_name.trim().is_empty() {
    return Err(ApiError::BadRequest(
      parkquest_core::Error::EmptyDisplayName.to_string(),
    ));
  }

  let user = store
    .update_profile(caller.user_id(), body.display_name)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or(ApiError::Unauthorized)?;
  Ok(Json(profile(store.as_ref(), user).await?))
}

/// `GET /users/{id}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  _caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Profile>, ApiError>
where
  S: ChallengeStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let user = store
    .get_user(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("user {id}")))?;
  Ok(Json(profile(store.as_ref(), user).await?))
}

/// `GET /leaderboard`
pub async fn leaderboard<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError>
where
  S: ChallengeStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let board = store
    .leaderboard()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(board))
}

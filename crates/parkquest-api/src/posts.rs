//! Handlers for the feed, posts, likes and comments.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/feed` | `?page=&limit=`; caller optional |
//! | `GET`    | `/posts/{id}` | |
//! | `DELETE` | `/posts/{id}` | Owner only; 204 |
//! | `POST`   | `/posts/{id}/like` | Idempotent; 204 |
//! | `DELETE` | `/posts/{id}/like` | 204 |
//! | `GET`    | `/posts/{id}/comments` | Oldest first |
//! | `POST`   | `/posts/{id}/comments` | Body: `{"content"}`; 201 |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use parkquest_core::{
  post::{Comment, FeedItem, FeedQuery, Post},
  store::ChallengeStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{caller::Caller, error::ApiError};

fn post_not_found(id: Uuid) -> ApiError { ApiError::NotFound(format!("post {id}")) }

// ─── Feed ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
  pub page:  Option<u32>,
  pub limit: Option<u32>,
}

/// `GET /feed[?page=<n>&limit=<n>]`
pub async fn feed<S>(
  State(store): State<Arc<S>>,
  caller: Option<Caller>,
  Query(params): Query<FeedParams>,
) -> Result<Json<Vec<FeedItem>>, ApiError>
where
  S: ChallengeStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let query = FeedQuery {
    page:   params.page,
    limit:  params.limit,
    viewer: caller.map(|c| c.user_id()),
  };
  let items = store
    .feed(query)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(items))
}

// ─── Posts ───────────────────────────────────────────────────────────────────

/// `GET /posts/{id}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  _caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Post>, ApiError>
where
  S: ChallengeStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store
    .get_post(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .map(Json)
    .ok_or_else(|| post_not_found(id))
}

/// `DELETE /posts/{id}`
pub async fn delete<S>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: ChallengeStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store
    .delete_post(id, caller.user_id())
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .map_err(ApiError::rejected)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Likes ───────────────────────────────────────────────────────────────────

/// `POST /posts/{id}/like`
pub async fn like<S>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: ChallengeStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let found = store
    .like(id, caller.user_id())
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  if !found {
    return Err(post_not_found(id));
  }
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /posts/{id}/like`
pub async fn unlike<S>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: ChallengeStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store
    .unlike(id, caller.user_id())
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Comments ────────────────────────────────────────────────────────────────

/// `GET /posts/{id}/comments`
pub async fn list_comments<S>(
  State(store): State<Arc<S>>,
  _caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, ApiError>
where
  S: ChallengeStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let exists = store
    .get_post(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .is_some();
  if !exists {
    return Err(post_not_found(id));
  }

  let comments = store
    .list_comments(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(comments))
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
  pub content: String,
}

/// `POST /posts/{id}/comments`
pub async fn add_comment<S>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<CommentBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ChallengeStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if body.content.trim().is_empty() {
    return Err(ApiError::BadRequest(
      parkquest_core::Error::EmptyComment.to_string(),
    ));
  }

  let comment = store
    .add_comment(id, caller.user_id(), body.content)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| post_not_found(id))?;
  Ok((StatusCode::CREATED, Json(comment)))
}

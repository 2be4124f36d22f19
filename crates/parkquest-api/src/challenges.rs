//! Handlers for `/challenges` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/challenges` | Only what the caller may currently see |
//! | `GET`  | `/challenges/{id}` | Includes entrants; 404 if not found |
//! | `POST` | `/challenges/{id}/pick` | Claim (exclusive) or join (open) |
//! | `POST` | `/challenges/{id}/cancel` | |
//! | `POST` | `/challenges/{id}/complete` | Body: `{"media_url", "media_kind", "caption"?}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use parkquest_core::{
  challenge::Challenge,
  post::{Media, MediaKind},
  store::ChallengeStore,
  submission::Submission,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{caller::Caller, error::ApiError};

/// A challenge with its open-challenge entrants.
#[derive(Debug, Serialize)]
pub struct ChallengeDetail {
  #[serde(flatten)]
  pub challenge:   Challenge,
  pub submissions: Vec<Submission>,
}

pub(crate) async fn load<S>(store: &S, id: Uuid) -> Result<Challenge, ApiError>
where
  S: ChallengeStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store
    .get_challenge(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("challenge {id}")))
}

pub(crate) async fn detail<S>(
  store: &S,
  challenge: Challenge,
) -> Result<ChallengeDetail, ApiError>
where
  S: ChallengeStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let submissions = store
    .list_submissions(challenge.challenge_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(ChallengeDetail { challenge, submissions })
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /challenges`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  caller: Caller,
) -> Result<Json<Vec<Challenge>>, ApiError>
where
  S: ChallengeStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let challenges = store
    .list_challenges(Some(caller.user_id()))
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(challenges))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /challenges/{id}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  _caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<ChallengeDetail>, ApiError>
where
  S: ChallengeStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let challenge = load(store.as_ref(), id).await?;
  Ok(Json(detail(store.as_ref(), challenge).await?))
}

// ─── Transitions ─────────────────────────────────────────────────────────────

/// `POST /challenges/{id}/pick`
pub async fn pick<S>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Challenge>, ApiError>
where
  S: ChallengeStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store
    .pick(id, caller.user_id())
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .map_err(ApiError::rejected)?;
  Ok(Json(load(store.as_ref(), id).await?))
}

/// `POST /challenges/{id}/cancel`
pub async fn cancel<S>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Challenge>, ApiError>
where
  S: ChallengeStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store
    .cancel(id, caller.user_id())
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .map_err(ApiError::rejected)?;
  Ok(Json(load(store.as_ref(), id).await?))
}

#[derive(Debug, Deserialize)]
pub struct CompleteBody {
  pub media_url:  String,
  pub media_kind: MediaKind,
  #[serde(default)]
  pub caption:    Option<String>,
}

/// `POST /challenges/{id}/complete`
pub async fn complete<S>(
  State(store): State<Arc<S>>,
  caller: Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<CompleteBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ChallengeStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if body.media_url.trim().is_empty() {
    return Err(ApiError::BadRequest("media_url must not be empty".into()));
  }
  let caption = body.caption.filter(|c| !c.trim().is_empty());

  let completion = store
    .complete(
      id,
      caller.user_id(),
      Media { url: body.media_url, kind: body.media_kind },
      caption,
    )
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .map_err(ApiError::rejected)?;
  Ok((StatusCode::CREATED, Json(completion)))
}

//! Handlers for `/admin` endpoints. Every handler requires [`AdminCaller`].
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/admin/challenges` | Every challenge with entrants |
//! | `POST`   | `/admin/challenges` | Body: [`NewChallenge`]; 201 |
//! | `PUT`    | `/admin/challenges/{id}` | Body: [`ChallengeUpdate`] |
//! | `DELETE` | `/admin/challenges/{id}` | 204 |
//! | `POST`   | `/admin/challenges/{id}/unassign` | |
//! | `POST`   | `/admin/challenges/{id}/award` | Body: `{"user_id"}` |
//! | `POST`   | `/admin/posts/{id}/revoke` | 204 |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use parkquest_core::{
  challenge::{Challenge, ChallengeStatus, ChallengeUpdate, NewChallenge},
  store::ChallengeStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  caller::AdminCaller,
  challenges::{ChallengeDetail, detail, load},
  error::ApiError,
};

// ─── Catalogue ───────────────────────────────────────────────────────────────

/// `GET /admin/challenges`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  _admin: AdminCaller,
) -> Result<Json<Vec<ChallengeDetail>>, ApiError>
where
  S: ChallengeStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let challenges = store
    .list_challenges(None)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  let mut out = Vec::with_capacity(challenges.len());
  for challenge in challenges {
    out.push(detail(store.as_ref(), challenge).await?);
  }
  Ok(Json(out))
}

/// `POST /admin/challenges`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  _admin: AdminCaller,
  Json(body): Json<NewChallenge>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ChallengeStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  body.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
  let challenge = store
    .create_challenge(body)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok((StatusCode::CREATED, Json(challenge)))
}

/// `PUT /admin/challenges/{id}`
pub async fn update<S>(
  State(store): State<Arc<S>>,
  _admin: AdminCaller,
  Path(id): Path<Uuid>,
  Json(body): Json<ChallengeUpdate>,
) -> Result<Json<Challenge>, ApiError>
where
  S: ChallengeStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  body.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

  // The store enforces this too; checking here turns the common case into a
  // 409 instead of an opaque store failure.
  let current = load(store.as_ref(), id).await?;
  if current.challenge_type != body.challenge_type {
    let entrants = store
      .list_submissions(id)
      .await
      .map_err(|e| ApiError::Store(Box::new(e)))?;
    if current.status == ChallengeStatus::InProgress || !entrants.is_empty() {
      return Err(ApiError::Conflict(
        parkquest_core::Error::TypeLocked.to_string(),
      ));
    }
  }

  store
    .update_challenge(id, body)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("challenge {id}")))
}

/// `DELETE /admin/challenges/{id}`
pub async fn delete<S>(
  State(store): State<Arc<S>>,
  _admin: AdminCaller,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: ChallengeStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let deleted = store
    .delete_challenge(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  if !deleted {
    return Err(ApiError::NotFound(format!("challenge {id}")));
  }
  Ok(StatusCode::NO_CONTENT)
}

// ─── Transitions ─────────────────────────────────────────────────────────────

/// `POST /admin/challenges/{id}/unassign`
pub async fn unassign<S>(
  State(store): State<Arc<S>>,
  _admin: AdminCaller,
  Path(id): Path<Uuid>,
) -> Result<Json<Challenge>, ApiError>
where
  S: ChallengeStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store
    .unassign(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .map_err(ApiError::rejected)?;
  Ok(Json(load(store.as_ref(), id).await?))
}

#[derive(Debug, Deserialize)]
pub struct AwardBody {
  pub user_id: Uuid,
}

/// `POST /admin/challenges/{id}/award`
pub async fn award<S>(
  State(store): State<Arc<S>>,
  _admin: AdminCaller,
  Path(id): Path<Uuid>,
  Json(body): Json<AwardBody>,
) -> Result<Json<Challenge>, ApiError>
where
  S: ChallengeStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store
    .award(id, body.user_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .map_err(ApiError::rejected)?;
  Ok(Json(load(store.as_ref(), id).await?))
}

/// `POST /admin/posts/{id}/revoke`
pub async fn revoke<S>(
  State(store): State<Arc<S>>,
  _admin: AdminCaller,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: ChallengeStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store
    .revoke_points(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .map_err(ApiError::rejected)?;
  Ok(StatusCode::NO_CONTENT)
}

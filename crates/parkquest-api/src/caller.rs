//! Caller identity extractors.
//!
//! Authentication happens upstream; a trusted proxy asserts the caller's user
//! id in the `x-user-id` header. The id must name an existing user.

use std::sync::Arc;

use axum::{
  extract::{FromRequestParts, OptionalFromRequestParts},
  http::{HeaderMap, request::Parts},
};
use parkquest_core::{store::ChallengeStore, user::User};
use uuid::Uuid;

use crate::error::ApiError;

pub const USER_HEADER: &str = "x-user-id";

/// An authenticated user.
#[derive(Debug, Clone)]
pub struct Caller(pub User);

impl Caller {
  pub fn user_id(&self) -> Uuid { self.0.user_id }
}

/// An authenticated user holding the admin role.
#[derive(Debug, Clone)]
pub struct AdminCaller(pub User);

/// `Ok(None)` if the header is absent; a present but malformed header is
/// treated the same as an unknown user.
fn caller_id(headers: &HeaderMap) -> Result<Option<Uuid>, ApiError> {
  let Some(value) = headers.get(USER_HEADER) else {
    return Ok(None);
  };
  value
    .to_str()
    .ok()
    .and_then(|s| Uuid::parse_str(s.trim()).ok())
    .map(Some)
    .ok_or(ApiError::Unauthorized)
}

async fn resolve<S>(store: &S, id: Uuid) -> Result<Caller, ApiError>
where
  S: ChallengeStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store
    .get_user(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .map(Caller)
    .ok_or(ApiError::Unauthorized)
}

impl<S> FromRequestParts<Arc<S>> for Caller
where
  S: ChallengeStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    store: &Arc<S>,
  ) -> Result<Self, Self::Rejection> {
    let id = caller_id(&parts.headers)?.ok_or(ApiError::Unauthorized)?;
    resolve(store.as_ref(), id).await
  }
}

impl<S> OptionalFromRequestParts<Arc<S>> for Caller
where
  S: ChallengeStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    store: &Arc<S>,
  ) -> Result<Option<Self>, Self::Rejection> {
    match caller_id(&parts.headers)? {
      None => Ok(None),
      Some(id) => resolve(store.as_ref(), id).await.map(Some),
    }
  }
}

impl<S> FromRequestParts<Arc<S>> for AdminCaller
where
  S: ChallengeStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    store: &Arc<S>,
  ) -> Result<Self, Self::Rejection> {
    let Caller(user) =
      <Caller as FromRequestParts<Arc<S>>>::from_request_parts(parts, store)
        .await?;
    if !user.is_admin() {
      return Err(ApiError::Forbidden("admin role required".into()));
    }
    Ok(AdminCaller(user))
  }
}

//! Users. Points and completion counts are deliberately absent: they are
//! derived by [`crate::scoring`] on every read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  #[default]
  User,
  Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:      Uuid,
  pub username:     String,
  pub display_name: String,
  pub role:         Role,
  pub created_at:   DateTime<Utc>,
}

impl User {
  pub fn is_admin(&self) -> bool { self.role == Role::Admin }
}

/// Input to [`crate::store::ChallengeStore::add_user`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
  pub username:     String,
  pub display_name: String,
  #[serde(default)]
  pub role:         Role,
}

impl NewUser {
  /// A regular user whose display name equals the username.
  pub fn new(username: impl Into<String>) -> Self {
    let username = username.into();
    Self { display_name: username.clone(), username, role: Role::User }
  }

  pub fn admin(username: impl Into<String>) -> Self {
    Self { role: Role::Admin, ..Self::new(username) }
  }
}

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::role::Role;
use crate::users::repo_types::UserRow;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(alias = "firstname")]
    pub first_name: String,
    #[serde(alias = "lastname")]
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    /// Defaults to `customer` when omitted.
    pub role: Option<String>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned after login; the same token is also set as the `token` cookie.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Public part of a freshly registered user.
#[derive(Debug, Serialize)]
pub struct RegisteredUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<UserRow> for RegisteredUser {
    fn from(u: UserRow) -> Self {
        Self {
            id: u.id,
            username: format!("{} {}", u.first_name, u.last_name),
            email: u.email,
            role: u.role,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

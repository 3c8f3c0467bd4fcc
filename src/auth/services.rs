use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::{
    dto::{LoginRequest, RegisterRequest, RegisteredUser},
    jwt::JwtKeys,
    password::{hash_password, verify_password},
    role::Role,
};
use crate::{
    error::AppError,
    users::{
        repo::UserRepository,
        repo_types::NewUser,
        services::{find_user_by_email, register_user},
    },
};

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Field checks that need no storage access.
fn validate_registration(req: &RegisterRequest) -> Result<(String, Role), AppError> {
    if req.password != req.password_confirm {
        return Err(AppError::validation("Password not match"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation("Password too short"));
    }
    if req.first_name.trim().is_empty() || req.last_name.trim().is_empty() {
        return Err(AppError::validation("First and last name are required"));
    }
    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        return Err(AppError::validation("Invalid email"));
    }
    let role = match req.role.as_deref().map(str::trim) {
        None | Some("") => Role::Customer,
        Some(raw) => raw
            .parse::<Role>()
            .map_err(|_| AppError::validation(format!("Invalid role {raw:?}")))?,
    };
    Ok((email, role))
}

pub async fn register(
    users: &dyn UserRepository,
    req: RegisterRequest,
) -> Result<RegisteredUser, AppError> {
    let (email, role) = validate_registration(&req).map_err(|e| {
        warn!(error = %e, "registration rejected");
        e
    })?;
    let password_hash = hash_password(&req.password)?;
    let user = register_user(
        users,
        NewUser {
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            email,
            password_hash,
            role,
        },
    )
    .await?;
    info!(user_id = user.id, "user registered");
    Ok(user.into())
}

/// Returns a signed token. Unknown email and wrong password are
/// indistinguishable to the caller.
pub async fn login(
    users: &dyn UserRepository,
    keys: &JwtKeys,
    req: LoginRequest,
) -> Result<String, AppError> {
    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        return Err(AppError::validation("Invalid email"));
    }

    let Some(user) = find_user_by_email(users, &email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = keys.issue(user.id, user.role)?;
    info!(user_id = user.id, role = %user.role, "user logged in");
    Ok(token)
}

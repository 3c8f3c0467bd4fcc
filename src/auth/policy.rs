//! Role gate in front of protected routes.
//!
//! A request is resolved to an [`AuthUser`] from the bearer header or, failing
//! that, the `token` cookie, and then checked against the role set the route
//! was registered with.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;

use super::{
    claims::AuthUser,
    cookie::TOKEN_COOKIE,
    jwt::{JwtKeys, TokenError},
    role::Role,
};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessDenied {
    #[error("no token in Authorization header or cookie")]
    Unauthenticated,
    #[error("token invalid")]
    TokenInvalid,
    #[error("token expired")]
    TokenExpired,
    #[error("token claims missing or unrecognized")]
    MalformedClaims,
    #[error("role not allowed on this route")]
    RoleForbidden,
}

impl From<TokenError> for AccessDenied {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Invalid => AccessDenied::TokenInvalid,
            TokenError::Expired => AccessDenied::TokenExpired,
            TokenError::ClaimsMissing => AccessDenied::MalformedClaims,
        }
    }
}

impl From<AccessDenied> for AppError {
    fn from(d: AccessDenied) -> Self {
        match d {
            AccessDenied::Unauthenticated => AppError::Unauthenticated,
            AccessDenied::TokenInvalid => AppError::TokenInvalid,
            AccessDenied::TokenExpired => AppError::TokenExpired,
            AccessDenied::MalformedClaims => AppError::MalformedClaims,
            AccessDenied::RoleForbidden => AppError::RoleForbidden,
        }
    }
}

/// Bearer header first, then the `token` cookie. Empty values count as absent.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }
    CookieJar::from_headers(headers)
        .get(TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

pub fn authorize(
    headers: &HeaderMap,
    keys: &JwtKeys,
    allowed: &[Role],
) -> Result<AuthUser, AccessDenied> {
    let token = extract_token(headers).ok_or(AccessDenied::Unauthenticated)?;
    let user = keys.parse(&token)?;
    if !allowed.contains(&user.role) {
        return Err(AccessDenied::RoleForbidden);
    }
    Ok(user)
}

/// Per-route gate state: the verifier and the roles this route admits.
#[derive(Clone)]
pub struct RoleGate {
    keys: Arc<JwtKeys>,
    allowed: &'static [Role],
}

impl RoleGate {
    pub fn new(keys: Arc<JwtKeys>, allowed: &'static [Role]) -> Self {
        Self { keys, allowed }
    }
}

/// Middleware for `from_fn_with_state`; on success the handler can take
/// `Extension<AuthUser>`.
pub async fn require_roles(
    State(gate): State<RoleGate>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    match authorize(req.headers(), &gate.keys, gate.allowed) {
        Ok(user) => {
            req.extensions_mut().insert(user);
            Ok(next.run(req).await)
        }
        Err(denied) => {
            warn!(
                reason = %denied,
                method = %req.method(),
                uri = %req.uri(),
                "request denied"
            );
            Err(denied.into())
        }
    }
}

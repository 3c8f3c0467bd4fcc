use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use crate::response::StatusResponse;

/// Errors surfaced to HTTP clients. Every layer returns these unchanged and
/// only `into_response` picks the status code and message.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("Please login first")]
    Unauthenticated,
    #[error("Invalid token")]
    TokenInvalid,
    #[error("Token expired")]
    TokenExpired,
    #[error("Missing claims in token")]
    MalformedClaims,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Invalid role")]
    RoleForbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("User with email {0} already exists")]
    DuplicateEmail(String),
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated
            | AppError::TokenInvalid
            | AppError::TokenExpired
            | AppError::MalformedClaims
            | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::RoleForbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateEmail(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        // 4xx are already recorded by the trace layer
        if let AppError::Internal(ref e) = self {
            error!(error = ?e, "internal error");
        }
        let body = StatusResponse {
            status: status.as_u16(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

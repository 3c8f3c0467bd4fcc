use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::pagination::Paging;

/// Error and message-only body.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: u16,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SingleResponse<T> {
    pub status: u16,
    pub message: String,
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct PagedResponse<T> {
    pub status: u16,
    pub message: String,
    pub data: Vec<T>,
    pub paging: Paging,
}

impl<T: Serialize> SingleResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::OK, message, data)
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::CREATED, message, data)
    }

    fn with_status(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        Self {
            status: status.as_u16(),
            message: message.into(),
            data,
        }
    }
}

impl<T: Serialize> PagedResponse<T> {
    pub fn ok(message: impl Into<String>, data: Vec<T>, paging: Paging) -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            message: message.into(),
            data,
            paging,
        }
    }
}

impl StatusResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            message: message.into(),
        }
    }
}

fn respond<B: Serialize>(status: u16, body: B) -> Response {
    let code = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
    (code, Json(body)).into_response()
}

impl<T: Serialize> IntoResponse for SingleResponse<T> {
    fn into_response(self) -> Response {
        respond(self.status, self)
    }
}

impl<T: Serialize> IntoResponse for PagedResponse<T> {
    fn into_response(self) -> Response {
        respond(self.status, self)
    }
}

impl IntoResponse for StatusResponse {
    fn into_response(self) -> Response {
        respond(self.status, self)
    }
}

use crate::state::AppState;
use axum::Router;

pub mod claims;
pub mod cookie;
pub mod dto;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod policy;
pub mod role;
pub mod services;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}

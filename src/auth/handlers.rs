use axum::{extract::State, routing::{get, post}, Json, Router};
use axum_extra::extract::{cookie::CookieJar, WithRejection};
use tracing::instrument;

use super::{
    cookie::{clear_token_cookie, set_token_cookie},
    dto::{LoginRequest, RegisterRequest, RegisteredUser, TokenResponse},
    services,
};
use crate::{
    error::AppError,
    response::{SingleResponse, StatusResponse},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", get(logout))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> Result<SingleResponse<RegisteredUser>, AppError> {
    let user = services::register(state.users.as_ref(), payload).await?;
    Ok(SingleResponse::created("User registered successfully", user))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(payload), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<(CookieJar, SingleResponse<TokenResponse>), AppError> {
    let token = services::login(state.users.as_ref(), &state.keys, payload).await?;
    let jar = set_token_cookie(jar, token.clone(), state.config.cookie_secure);
    Ok((jar, SingleResponse::ok("Successfully Login", TokenResponse { token })))
}

#[instrument(skip(state, jar))]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, StatusResponse) {
    let jar = clear_token_cookie(jar, state.config.cookie_secure);
    (jar, StatusResponse::ok("Logout successfully!"))
}

use axum::{
    extract::{Path, Query, State},
    middleware::from_fn_with_state,
    routing::get,
    Extension, Router,
};
use axum_extra::extract::WithRejection;
use tracing::instrument;

use super::{dto::UserWithProducts, services};
use crate::{
    auth::{
        claims::AuthUser,
        policy::{require_roles, RoleGate},
        role::Role,
    },
    error::AppError,
    pagination::{PageQuery, PageRequest},
    response::{PagedResponse, SingleResponse},
    state::AppState,
};

/// Profiles are an administrative view.
const PROFILES: &[Role] = &[Role::Admin];

pub fn profile_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/profiles", get(list_profiles))
        .route("/profiles/:id", get(get_profile))
        .route_layer(from_fn_with_state(
            RoleGate::new(state.keys.clone(), PROFILES),
            require_roles,
        ))
}

#[instrument(skip(state, q))]
pub async fn list_profiles(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Query(q), _): WithRejection<Query<PageQuery>, AppError>,
) -> Result<PagedResponse<UserWithProducts>, AppError> {
    let page = PageRequest::try_from(q)?;
    let (items, paging) = services::list_users(state.users.as_ref(), page).await?;
    Ok(PagedResponse::ok("Ok", items, paging))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> Result<SingleResponse<UserWithProducts>, AppError> {
    let profile = services::find_user(state.users.as_ref(), id).await?;
    Ok(SingleResponse::ok("Ok", profile))
}

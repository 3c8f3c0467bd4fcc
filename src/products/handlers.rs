use axum::{
    extract::{Path, Query, State},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use tracing::instrument;

use super::{
    dto::{CreateProductRequest, ProductWithUsers, UpdateProductRequest},
    services,
};
use crate::{
    auth::{
        claims::AuthUser,
        policy::{require_roles, RoleGate},
        role::Role,
    },
    error::AppError,
    pagination::{PageQuery, PageRequest},
    response::{PagedResponse, SingleResponse, StatusResponse},
    state::AppState,
};

/// Browsing is open to every signed-in role.
const BROWSE: &[Role] = &[Role::Customer, Role::Reseller, Role::Admin];
/// Stock lookups and writes.
const MANAGE: &[Role] = &[Role::Reseller, Role::Admin];

pub fn product_routes(state: &AppState) -> Router<AppState> {
    let browse = from_fn_with_state(RoleGate::new(state.keys.clone(), BROWSE), require_roles);
    let manage = from_fn_with_state(RoleGate::new(state.keys.clone(), MANAGE), require_roles);

    Router::new()
        .route(
            "/products",
            get(list_products)
                .route_layer(browse.clone())
                .merge(post(create_product).route_layer(manage.clone())),
        )
        .route(
            "/products/:id",
            get(get_product)
                .route_layer(browse)
                .merge(
                    put(update_product)
                        .delete(delete_product)
                        .route_layer(manage.clone()),
                ),
        )
        .route(
            "/products/stock/:stock",
            get(products_by_stock).route_layer(manage),
        )
}

#[instrument(skip(state, q))]
pub async fn list_products(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Query(q), _): WithRejection<Query<PageQuery>, AppError>,
) -> Result<PagedResponse<ProductWithUsers>, AppError> {
    let page = PageRequest::try_from(q)?;
    let (items, paging) = services::list_products(state.products.as_ref(), page).await?;
    Ok(PagedResponse::ok("Ok", items, paging))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> Result<SingleResponse<ProductWithUsers>, AppError> {
    let product = services::find_product(state.products.as_ref(), id).await?;
    Ok(SingleResponse::ok("Ok", product))
}

#[instrument(skip(state))]
pub async fn products_by_stock(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(stock), _): WithRejection<Path<i32>, AppError>,
) -> Result<SingleResponse<Vec<ProductWithUsers>>, AppError> {
    let products = services::find_products_by_stock(state.products.as_ref(), stock).await?;
    Ok(SingleResponse::ok("Ok", products))
}

#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(payload), _): WithRejection<Json<CreateProductRequest>, AppError>,
) -> Result<SingleResponse<ProductWithUsers>, AppError> {
    let product = services::create_product(state.products.as_ref(), payload).await?;
    Ok(SingleResponse::created("Product created successfully", product))
}

#[instrument(skip(state, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateProductRequest>, AppError>,
) -> Result<SingleResponse<ProductWithUsers>, AppError> {
    let product = services::update_product(state.products.as_ref(), id, payload).await?;
    Ok(SingleResponse::ok("Product updated successfully", product))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> Result<StatusResponse, AppError> {
    services::delete_product(state.products.as_ref(), id).await?;
    Ok(StatusResponse::ok("Product deleted successfully"))
}

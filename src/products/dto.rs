use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::{ProductRow, ProductWithUsersRow};
use crate::users::dto::UserSummary;

/// Product as listed under a user. Carries no user list of its own.
#[derive(Debug, Clone, Serialize)]
pub struct ProductSummary {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub stock: i32,
    pub price: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Product with its enrolled users one level deep.
#[derive(Debug, Clone, Serialize)]
pub struct ProductWithUsers {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub stock: i32,
    pub price: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub users: Vec<UserSummary>,
}

/// Request body for `POST /products`.
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub stock: i32,
    pub price: f64,
    /// Users to enroll with the new product.
    #[serde(default)]
    pub user_ids: Vec<i64>,
}

/// Request body for `PUT /products/:id`; absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub stock: Option<i32>,
    pub price: Option<f64>,
    /// When present, replaces the enrolled users.
    pub user_ids: Option<Vec<i64>>,
}

impl From<&ProductRow> for ProductSummary {
    fn from(p: &ProductRow) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            description: p.description.clone(),
            stock: p.stock,
            price: p.price,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

impl From<ProductWithUsersRow> for ProductWithUsers {
    fn from(row: ProductWithUsersRow) -> Self {
        let ProductWithUsersRow { product, users } = row;
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            stock: product.stock,
            price: product.price,
            created_at: product.created_at,
            updated_at: product.updated_at,
            users: users.iter().map(UserSummary::from).collect(),
        }
    }
}

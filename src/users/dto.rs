use serde::Serialize;
use time::OffsetDateTime;

use super::repo_types::{UserRow, UserWithProductsRow};
use crate::{auth::role::Role, products::dto::ProductSummary};

/// User as listed under a product. Carries no product list of its own.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Profile with enrolled products one level deep.
#[derive(Debug, Clone, Serialize)]
pub struct UserWithProducts {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub products: Vec<ProductSummary>,
}

impl From<&UserRow> for UserSummary {
    fn from(u: &UserRow) -> Self {
        Self {
            id: u.id,
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            email: u.email.clone(),
            role: u.role,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

impl From<UserWithProductsRow> for UserWithProducts {
    fn from(row: UserWithProductsRow) -> Self {
        let UserWithProductsRow { user, products } = row;
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
            products: products.iter().map(ProductSummary::from).collect(),
        }
    }
}

use sqlx::FromRow;
use time::OffsetDateTime;

use crate::users::repo_types::UserRow;

/// Product record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub stock: i32,
    pub price: f64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

/// A product with its enrolled users eager-loaded.
#[derive(Debug, Clone)]
pub struct ProductWithUsersRow {
    pub product: ProductRow,
    pub users: Vec<UserRow>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub stock: i32,
    pub price: f64,
    /// Users enrolled with the product at creation. Distinct ids.
    pub user_ids: Vec<i64>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub stock: Option<i32>,
    pub price: Option<f64>,
    /// Replaces the enrollment set when present.
    pub user_ids: Option<Vec<i64>>,
}

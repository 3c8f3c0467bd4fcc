use sqlx::FromRow;
use time::OffsetDateTime;

use crate::{auth::role::Role, products::repo_types::ProductRow};

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String, // Argon2 PHC string, never leaves the service layer
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

/// A user with the products they are enrolled in.
#[derive(Debug, Clone)]
pub struct UserWithProductsRow {
    pub user: UserRow,
    pub products: Vec<ProductRow>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

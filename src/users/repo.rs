use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use super::repo_types::{NewUser, UserRow, UserWithProductsRow};
use crate::{db::InsertError, products::repo_types::ProductRow};

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, password_hash, role, created_at, updated_at, deleted_at";

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, new: NewUser) -> Result<UserRow, InsertError>;
    /// Includes soft-deleted rows: the email index spans them too.
    async fn email_taken(&self, email: &str) -> anyhow::Result<bool>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<UserRow>>;
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<UserWithProductsRow>>;
    /// One page plus the total count of live users.
    async fn find_page(
        &self,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<(Vec<UserWithProductsRow>, i64)>;
}

pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn load_products(
        &self,
        users: Vec<UserRow>,
    ) -> anyhow::Result<Vec<UserWithProductsRow>> {
        #[derive(FromRow)]
        struct Enrolled {
            user_id: i64,
            #[sqlx(flatten)]
            product: ProductRow,
        }

        let ids: Vec<i64> = users.iter().map(|u| u.id).collect();
        let rows = sqlx::query_as::<_, Enrolled>(
            r#"
            SELECT e.user_id, p.id, p.name, p.description, p.stock, p.price,
                   p.created_at, p.updated_at, p.deleted_at
            FROM enrollments e
            JOIN products p ON p.id = e.product_id
            WHERE e.user_id = ANY($1) AND p.deleted_at IS NULL
            ORDER BY p.id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        let mut by_user: HashMap<i64, Vec<ProductRow>> = HashMap::new();
        for row in rows {
            by_user.entry(row.user_id).or_default().push(row.product);
        }
        Ok(users
            .into_iter()
            .map(|user| UserWithProductsRow {
                products: by_user.remove(&user.id).unwrap_or_default(),
                user,
            })
            .collect())
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, new: NewUser) -> Result<UserRow, InsertError> {
        let user = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (first_name, last_name, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn email_taken(&self, email: &str) -> anyhow::Result<bool> {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.db)
                .await?;
        Ok(taken)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<UserRow>> {
        let user = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<UserWithProductsRow>> {
        let user = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        match user {
            Some(user) => Ok(self.load_products(vec![user]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_page(
        &self,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<(Vec<UserWithProductsRow>, i64)> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE deleted_at IS NULL")
                .fetch_one(&self.db)
                .await?;
        let users = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE deleted_at IS NULL
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;
        Ok((self.load_products(users).await?, total))
    }
}

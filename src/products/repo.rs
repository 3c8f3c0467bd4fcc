use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use super::repo_types::{NewProduct, ProductChanges, ProductRow, ProductWithUsersRow};
use crate::users::repo_types::UserRow;

const PRODUCT_COLUMNS: &str =
    "id, name, description, stock, price, created_at, updated_at, deleted_at";

/// Failure of a product write that also writes enrollments.
#[derive(Debug, thiserror::Error)]
pub enum ProductWriteError {
    #[error("unknown or deleted users {0:?}")]
    UnknownUsers(Vec<i64>),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for ProductWriteError {
    fn from(e: sqlx::Error) -> Self {
        ProductWriteError::Other(e.into())
    }
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create(&self, new: NewProduct) -> Result<ProductWithUsersRow, ProductWriteError>;
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<ProductWithUsersRow>>;
    async fn find_page(
        &self,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<(Vec<ProductWithUsersRow>, i64)>;
    async fn find_by_stock(&self, stock: i32) -> anyhow::Result<Vec<ProductWithUsersRow>>;
    /// `None` when the product is absent or soft-deleted.
    async fn update(
        &self,
        id: i64,
        changes: ProductChanges,
    ) -> Result<Option<ProductWithUsersRow>, ProductWriteError>;
    /// Returns whether a live row was marked deleted.
    async fn soft_delete(&self, id: i64) -> anyhow::Result<bool>;
}

pub struct PgProductRepository {
    db: PgPool,
}

impl PgProductRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn load_users(
        &self,
        products: Vec<ProductRow>,
    ) -> anyhow::Result<Vec<ProductWithUsersRow>> {
        #[derive(FromRow)]
        struct Enrolled {
            product_id: i64,
            #[sqlx(flatten)]
            user: UserRow,
        }

        let ids: Vec<i64> = products.iter().map(|p| p.id).collect();
        let rows = sqlx::query_as::<_, Enrolled>(
            r#"
            SELECT e.product_id, u.id, u.first_name, u.last_name, u.email, u.password_hash,
                   u.role, u.created_at, u.updated_at, u.deleted_at
            FROM enrollments e
            JOIN users u ON u.id = e.user_id
            WHERE e.product_id = ANY($1) AND u.deleted_at IS NULL
            ORDER BY u.id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        let mut by_product: HashMap<i64, Vec<UserRow>> = HashMap::new();
        for row in rows {
            by_product.entry(row.product_id).or_default().push(row.user);
        }
        Ok(products
            .into_iter()
            .map(|product| ProductWithUsersRow {
                users: by_product.remove(&product.id).unwrap_or_default(),
                product,
            })
            .collect())
    }

    async fn load_one(&self, product: ProductRow) -> anyhow::Result<ProductWithUsersRow> {
        self.load_users(vec![product])
            .await?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("eager load dropped product"))
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn create(&self, new: NewProduct) -> Result<ProductWithUsersRow, ProductWriteError> {
        let mut tx = self.db.begin().await?;
        let product = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            INSERT INTO products (name, description, stock, price)
            VALUES ($1, $2, $3, $4)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.stock)
        .bind(new.price)
        .fetch_one(&mut *tx)
        .await?;
        if !new.user_ids.is_empty() {
            enroll_users(&mut tx, product.id, &new.user_ids).await?;
        }
        tx.commit().await?;
        Ok(self.load_one(product).await?)
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<ProductWithUsersRow>> {
        let product = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        match product {
            Some(p) => Ok(Some(self.load_one(p).await?)),
            None => Ok(None),
        }
    }

    async fn find_page(
        &self,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<(Vec<ProductWithUsersRow>, i64)> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE deleted_at IS NULL")
                .fetch_one(&self.db)
                .await?;
        let products = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE deleted_at IS NULL
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;
        Ok((self.load_users(products).await?, total))
    }

    async fn find_by_stock(&self, stock: i32) -> anyhow::Result<Vec<ProductWithUsersRow>> {
        let products = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE stock = $1 AND deleted_at IS NULL
            ORDER BY id
            "#
        ))
        .bind(stock)
        .fetch_all(&self.db)
        .await?;
        self.load_users(products).await
    }

    async fn update(
        &self,
        id: i64,
        changes: ProductChanges,
    ) -> Result<Option<ProductWithUsersRow>, ProductWriteError> {
        let ProductChanges {
            name,
            description,
            stock,
            price,
            user_ids,
        } = changes;

        let mut tx = self.db.begin().await?;
        let product = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            UPDATE products
            SET name        = COALESCE($2, name),
                description = COALESCE($3, description),
                stock       = COALESCE($4, stock),
                price       = COALESCE($5, price),
                updated_at  = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(stock)
        .bind(price)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(product) = product else {
            return Ok(None);
        };

        if let Some(user_ids) = user_ids {
            sqlx::query("DELETE FROM enrollments WHERE product_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            if !user_ids.is_empty() {
                enroll_users(&mut tx, id, &user_ids).await?;
            }
        }
        tx.commit().await?;
        Ok(Some(self.load_one(product).await?))
    }

    async fn soft_delete(&self, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE products SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

/// Enrolls live users with a product. Any unknown or soft-deleted id fails
/// the write and the caller's transaction is dropped uncommitted.
async fn enroll_users(
    tx: &mut Transaction<'_, Postgres>,
    product_id: i64,
    user_ids: &[i64],
) -> Result<(), ProductWriteError> {
    let live: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM users WHERE id = ANY($1) AND deleted_at IS NULL")
            .bind(user_ids)
            .fetch_all(&mut **tx)
            .await?;
    let missing: Vec<i64> = user_ids
        .iter()
        .copied()
        .filter(|id| !live.contains(id))
        .collect();
    if !missing.is_empty() {
        return Err(ProductWriteError::UnknownUsers(missing));
    }

    sqlx::query(
        r#"
        INSERT INTO enrollments (user_id, product_id)
        SELECT UNNEST($1::BIGINT[]), $2
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(user_ids)
    .bind(product_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

use tracing::info;

use super::{
    dto::{CreateProductRequest, ProductWithUsers, UpdateProductRequest},
    repo::{ProductRepository, ProductWriteError},
    repo_types::{NewProduct, ProductChanges},
};
use crate::{
    error::AppError,
    pagination::{PageRequest, Paging},
};

impl From<ProductWriteError> for AppError {
    fn from(e: ProductWriteError) -> Self {
        match e {
            ProductWriteError::UnknownUsers(ids) => {
                AppError::validation(format!("Unknown users {ids:?}"))
            }
            ProductWriteError::Other(e) => AppError::Internal(e),
        }
    }
}

fn check_text(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn check_stock(stock: i32) -> Result<i32, AppError> {
    if stock < 0 {
        return Err(AppError::validation("stock must not be negative"));
    }
    Ok(stock)
}

fn check_price(price: f64) -> Result<f64, AppError> {
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::validation("price must be a non-negative number"));
    }
    Ok(price)
}

fn distinct(mut ids: Vec<i64>) -> Vec<i64> {
    ids.sort_unstable();
    ids.dedup();
    ids
}

pub async fn create_product(
    repo: &dyn ProductRepository,
    req: CreateProductRequest,
) -> Result<ProductWithUsers, AppError> {
    let new = NewProduct {
        name: check_text("name", &req.name)?,
        description: check_text("description", &req.description)?,
        stock: check_stock(req.stock)?,
        price: check_price(req.price)?,
        user_ids: distinct(req.user_ids),
    };
    let row = repo.create(new).await?;
    info!(product_id = row.product.id, "product created");
    Ok(row.into())
}

pub async fn find_product(
    repo: &dyn ProductRepository,
    id: i64,
) -> Result<ProductWithUsers, AppError> {
    repo.find_by_id(id)
        .await?
        .map(ProductWithUsers::from)
        .ok_or(AppError::NotFound("Product"))
}

pub async fn list_products(
    repo: &dyn ProductRepository,
    page: PageRequest,
) -> Result<(Vec<ProductWithUsers>, Paging), AppError> {
    let (rows, total) = repo.find_page(page.limit(), page.offset()).await?;
    let products = rows.into_iter().map(ProductWithUsers::from).collect();
    Ok((products, page.paging(total)))
}

/// An empty result is reported as `NotFound`.
pub async fn find_products_by_stock(
    repo: &dyn ProductRepository,
    stock: i32,
) -> Result<Vec<ProductWithUsers>, AppError> {
    let stock = check_stock(stock)?;
    let products: Vec<ProductWithUsers> = repo
        .find_by_stock(stock)
        .await?
        .into_iter()
        .map(ProductWithUsers::from)
        .collect();
    if products.is_empty() {
        return Err(AppError::NotFound("Products"));
    }
    Ok(products)
}

pub async fn update_product(
    repo: &dyn ProductRepository,
    id: i64,
    req: UpdateProductRequest,
) -> Result<ProductWithUsers, AppError> {
    let changes = ProductChanges {
        name: req.name.as_deref().map(|v| check_text("name", v)).transpose()?,
        description: req
            .description
            .as_deref()
            .map(|v| check_text("description", v))
            .transpose()?,
        stock: req.stock.map(check_stock).transpose()?,
        price: req.price.map(check_price).transpose()?,
        user_ids: req.user_ids.map(distinct),
    };
    let row = repo
        .update(id, changes)
        .await?
        .ok_or(AppError::NotFound("Product"))?;
    info!(product_id = id, "product updated");
    Ok(row.into())
}

pub async fn delete_product(repo: &dyn ProductRepository, id: i64) -> Result<(), AppError> {
    if !repo.soft_delete(id).await? {
        return Err(AppError::NotFound("Product"));
    }
    info!(product_id = id, "product deleted");
    Ok(())
}

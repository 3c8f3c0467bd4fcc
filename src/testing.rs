//! In-memory repositories for service and router tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    auth::role::Role,
    db::InsertError,
    products::{
        repo::{ProductRepository, ProductWriteError},
        repo_types::{NewProduct, ProductChanges, ProductRow, ProductWithUsersRow},
    },
    users::{
        repo::UserRepository,
        repo_types::{NewUser, UserRow, UserWithProductsRow},
    },
};

#[derive(Default)]
struct Tables {
    users: Vec<UserRow>,
    products: Vec<ProductRow>,
    enrollments: Vec<(i64, i64)>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    calls: AtomicUsize,
}

impl MemoryStore {
    /// Number of repository calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn user_count(&self) -> usize {
        self.tables.lock().unwrap().users.len()
    }

    pub fn product_count(&self) -> usize {
        self.tables.lock().unwrap().products.len()
    }

    pub fn insert_user(&self, email: &str, role: Role) -> i64 {
        let mut t = self.tables.lock().unwrap();
        let id = t.users.len() as i64 + 1;
        let now = OffsetDateTime::now_utc();
        t.users.push(UserRow {
            id,
            first_name: "Test".into(),
            last_name: "User".into(),
            email: email.into(),
            password_hash: String::new(),
            role,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        });
        id
    }

    pub fn insert_product(&self, name: &str, stock: i32, price: f64) -> i64 {
        let mut t = self.tables.lock().unwrap();
        let id = t.products.len() as i64 + 1;
        let now = OffsetDateTime::now_utc();
        t.products.push(ProductRow {
            id,
            name: name.into(),
            description: format!("{name} description"),
            stock,
            price,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        });
        id
    }

    pub fn enroll(&self, user_id: i64, product_id: i64) {
        self.tables
            .lock()
            .unwrap()
            .enrollments
            .push((user_id, product_id));
    }

    pub fn soft_delete_user(&self, id: i64) {
        let mut t = self.tables.lock().unwrap();
        if let Some(u) = t.users.iter_mut().find(|u| u.id == id) {
            u.deleted_at = Some(OffsetDateTime::now_utc());
        }
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl Tables {
    fn live_user(&self, id: i64) -> Option<&UserRow> {
        self.users
            .iter()
            .find(|u| u.id == id && u.deleted_at.is_none())
    }

    fn live_product(&self, id: i64) -> Option<&ProductRow> {
        self.products
            .iter()
            .find(|p| p.id == id && p.deleted_at.is_none())
    }

    fn unknown_users(&self, ids: &[i64]) -> Result<(), ProductWriteError> {
        let missing: Vec<i64> = ids
            .iter()
            .copied()
            .filter(|id| self.live_user(*id).is_none())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ProductWriteError::UnknownUsers(missing))
        }
    }

    fn with_products(&self, user: &UserRow) -> UserWithProductsRow {
        let products = self
            .enrollments
            .iter()
            .filter(|(u, _)| *u == user.id)
            .filter_map(|(_, p)| self.live_product(*p).cloned())
            .collect();
        UserWithProductsRow {
            user: user.clone(),
            products,
        }
    }

    fn with_users(&self, product: &ProductRow) -> ProductWithUsersRow {
        let users = self
            .enrollments
            .iter()
            .filter(|(_, p)| *p == product.id)
            .filter_map(|(u, _)| self.live_user(*u).cloned())
            .collect();
        ProductWithUsersRow {
            product: product.clone(),
            users,
        }
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, new: NewUser) -> Result<UserRow, InsertError> {
        self.touch();
        let mut t = self.tables.lock().unwrap();
        if t.users.iter().any(|u| u.email == new.email) {
            return Err(InsertError::Duplicate);
        }
        let now = OffsetDateTime::now_utc();
        let row = UserRow {
            id: t.users.len() as i64 + 1,
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        t.users.push(row.clone());
        Ok(row)
    }

    async fn email_taken(&self, email: &str) -> anyhow::Result<bool> {
        self.touch();
        Ok(self
            .tables
            .lock()
            .unwrap()
            .users
            .iter()
            .any(|u| u.email == email))
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<UserRow>> {
        self.touch();
        Ok(self
            .tables
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.email == email && u.deleted_at.is_none())
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<UserWithProductsRow>> {
        self.touch();
        let t = self.tables.lock().unwrap();
        Ok(t.live_user(id).map(|u| t.with_products(u)))
    }

    async fn find_page(
        &self,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<(Vec<UserWithProductsRow>, i64)> {
        self.touch();
        let t = self.tables.lock().unwrap();
        let live: Vec<&UserRow> = t.users.iter().filter(|u| u.deleted_at.is_none()).collect();
        let page = live
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|u| t.with_products(u))
            .collect();
        Ok((page, live.len() as i64))
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn create(&self, new: NewProduct) -> Result<ProductWithUsersRow, ProductWriteError> {
        self.touch();
        let mut t = self.tables.lock().unwrap();
        t.unknown_users(&new.user_ids)?;
        let now = OffsetDateTime::now_utc();
        let row = ProductRow {
            id: t.products.len() as i64 + 1,
            name: new.name,
            description: new.description,
            stock: new.stock,
            price: new.price,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        t.products.push(row.clone());
        t.enrollments
            .extend(new.user_ids.iter().map(|user_id| (*user_id, row.id)));
        Ok(t.with_users(&row))
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<ProductWithUsersRow>> {
        self.touch();
        let t = self.tables.lock().unwrap();
        Ok(t.live_product(id).map(|p| t.with_users(p)))
    }

    async fn find_page(
        &self,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<(Vec<ProductWithUsersRow>, i64)> {
        self.touch();
        let t = self.tables.lock().unwrap();
        let live: Vec<&ProductRow> = t
            .products
            .iter()
            .filter(|p| p.deleted_at.is_none())
            .collect();
        let page = live
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|p| t.with_users(p))
            .collect();
        Ok((page, live.len() as i64))
    }

    async fn find_by_stock(&self, stock: i32) -> anyhow::Result<Vec<ProductWithUsersRow>> {
        self.touch();
        let t = self.tables.lock().unwrap();
        Ok(t.products
            .iter()
            .filter(|p| p.stock == stock && p.deleted_at.is_none())
            .map(|p| t.with_users(p))
            .collect())
    }

    async fn update(
        &self,
        id: i64,
        changes: ProductChanges,
    ) -> Result<Option<ProductWithUsersRow>, ProductWriteError> {
        self.touch();
        let mut t = self.tables.lock().unwrap();
        if t.live_product(id).is_none() {
            return Ok(None);
        }
        if let Some(ids) = &changes.user_ids {
            t.unknown_users(ids)?;
        }
        let Some(p) = t
            .products
            .iter_mut()
            .find(|p| p.id == id && p.deleted_at.is_none())
        else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            p.name = name;
        }
        if let Some(description) = changes.description {
            p.description = description;
        }
        if let Some(stock) = changes.stock {
            p.stock = stock;
        }
        if let Some(price) = changes.price {
            p.price = price;
        }
        p.updated_at = OffsetDateTime::now_utc();
        let updated = p.clone();
        if let Some(ids) = changes.user_ids {
            t.enrollments.retain(|(_, product_id)| *product_id != id);
            t.enrollments.extend(ids.into_iter().map(|user_id| (user_id, id)));
        }
        Ok(Some(t.with_users(&updated)))
    }

    async fn soft_delete(&self, id: i64) -> anyhow::Result<bool> {
        self.touch();
        let mut t = self.tables.lock().unwrap();
        match t
            .products
            .iter_mut()
            .find(|p| p.id == id && p.deleted_at.is_none())
        {
            Some(p) => {
                p.deleted_at = Some(OffsetDateTime::now_utc());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

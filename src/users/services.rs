use tracing::{info, warn};

use super::{
    dto::UserWithProducts,
    repo::UserRepository,
    repo_types::{NewUser, UserRow},
};
use crate::{
    db::InsertError,
    error::AppError,
    pagination::{PageRequest, Paging},
};

/// Inserts a user whose password is already hashed. The pre-check gives a
/// clean error in the common case; the unique index catches the race.
pub async fn register_user(repo: &dyn UserRepository, new: NewUser) -> Result<UserRow, AppError> {
    if repo.email_taken(&new.email).await? {
        warn!(email = %new.email, "email already registered");
        return Err(AppError::DuplicateEmail(new.email));
    }
    let email = new.email.clone();
    let user = repo.create(new).await.map_err(|e| match e {
        InsertError::Duplicate => {
            warn!(email = %email, "email registered concurrently");
            AppError::DuplicateEmail(email.clone())
        }
        InsertError::Other(e) => AppError::Internal(e),
    })?;
    info!(user_id = user.id, role = %user.role, "user created");
    Ok(user)
}

pub async fn find_user_by_email(
    repo: &dyn UserRepository,
    email: &str,
) -> Result<Option<UserRow>, AppError> {
    Ok(repo.find_by_email(email).await?)
}

pub async fn find_user(repo: &dyn UserRepository, id: i64) -> Result<UserWithProducts, AppError> {
    repo.find_by_id(id)
        .await?
        .map(UserWithProducts::from)
        .ok_or(AppError::NotFound("User"))
}

pub async fn list_users(
    repo: &dyn UserRepository,
    page: PageRequest,
) -> Result<(Vec<UserWithProducts>, Paging), AppError> {
    let (rows, total) = repo.find_page(page.limit(), page.offset()).await?;
    let users = rows.into_iter().map(UserWithProducts::from).collect();
    Ok((users, page.paging(total)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::role::Role, testing::MemoryStore};

    fn new_user(email: &str, first: &str) -> NewUser {
        NewUser {
            first_name: first.into(),
            last_name: "Doe".into(),
            email: email.into(),
            password_hash: "$argon2id$stub".into(),
            role: Role::Customer,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_and_first_record_kept() {
        let store = MemoryStore::default();
        let first = register_user(&store, new_user("jane@example.com", "Jane"))
            .await
            .unwrap();

        let err = register_user(&store, new_user("jane@example.com", "Impostor"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail(ref e) if e == "jane@example.com"));

        let kept = find_user(&store, first.id).await.unwrap();
        assert_eq!(kept.first_name, "Jane");
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn soft_deleted_email_still_blocks_registration() {
        let store = MemoryStore::default();
        let user = register_user(&store, new_user("gone@example.com", "Gone"))
            .await
            .unwrap();
        store.soft_delete_user(user.id);
        let err = register_user(&store, new_user("gone@example.com", "Back"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail(_)));
    }

    #[tokio::test]
    async fn missing_or_deleted_user_is_not_found() {
        let store = MemoryStore::default();
        assert!(matches!(
            find_user(&store, 99).await,
            Err(AppError::NotFound("User"))
        ));
        let user = register_user(&store, new_user("a@example.com", "A"))
            .await
            .unwrap();
        store.soft_delete_user(user.id);
        assert!(matches!(
            find_user(&store, user.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(find_user_by_email(&store, "a@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn list_pages_through_users() {
        let store = MemoryStore::default();
        for i in 0..25 {
            register_user(&store, new_user(&format!("u{i}@example.com"), "U"))
                .await
                .unwrap();
        }
        let (users, paging) = list_users(&store, PageRequest::new(3, 10)).await.unwrap();
        assert_eq!(users.len(), 5);
        assert_eq!(paging.total_rows, 25);
        assert_eq!(paging.total_pages, 3);
        assert_eq!(users[0].email, "u20@example.com");
    }

    #[tokio::test]
    async fn profile_embeds_products_without_nesting_back() {
        let store = MemoryStore::default();
        let user = register_user(&store, new_user("e@example.com", "E"))
            .await
            .unwrap();
        let product_id = store.insert_product("Lamp", 4, 19.5);
        store.enroll(user.id, product_id);

        let profile = find_user(&store, user.id).await.unwrap();
        assert_eq!(profile.products.len(), 1);
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["products"][0]["name"], "Lamp");
        assert!(json["products"][0].get("users").is_none());
        assert!(json.get("password_hash").is_none());
    }
}

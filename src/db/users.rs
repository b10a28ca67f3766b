use std::sync::Arc;

use crate::{
    db::store::{decode_all, Collection, Direction, DocumentStore, Patch, Query},
    error::{AppError, AppResult},
    models::{NewUser, User},
};

#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn DocumentStore>,
}

impl UserRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// All users by name, A to Z
    pub async fn list(&self) -> AppResult<Vec<User>> {
        let query = Query::collection(Collection::Users).order_by("name", Direction::Asc);
        let snapshot = self.store.query(&query).await?;
        decode_all(&snapshot)
    }

    pub async fn create(&self, user: NewUser) -> AppResult<User> {
        let name = user.name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput("Name is required.".to_string()));
        }

        let fields = Patch::new().set("name", name).set("coins", 0);
        let id = self.store.create(Collection::Users, fields).await?;
        self.get(&id).await
    }

    pub async fn get(&self, id: &str) -> AppResult<User> {
        self.store
            .get(Collection::Users, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?
            .decode()
    }

    /// Stores a push token, skipping the write when it is unchanged
    ///
    /// Returns whether the stored token changed.
    pub async fn register_push_token(&self, id: &str, token: &str) -> AppResult<bool> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::InvalidInput("Push token is required.".to_string()));
        }

        let user = self.get(id).await?;
        if user.fcm_token.as_deref() == Some(token) {
            return Ok(false);
        }

        self.store
            .update(Collection::Users, id, Patch::new().set("fcmToken", token))
            .await?;
        tracing::info!(user_id = %id, "Push token saved to user profile");
        Ok(true)
    }

    /// Users that can receive push notifications
    pub async fn with_push_tokens(&self) -> AppResult<Vec<User>> {
        let users = self.list().await?;
        Ok(users
            .into_iter()
            .filter(|u| u.fcm_token.as_deref().is_some_and(|t| !t.is_empty()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::MemoryStore;

    fn repo() -> UserRepository {
        UserRepository::new(Arc::new(MemoryStore::new()))
    }

    fn named(name: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_list_sorted_by_name() {
        let repo = repo();
        repo.create(named("Zoe")).await.unwrap();
        repo.create(named("Ada")).await.unwrap();

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|u| u.name).collect();
        assert_eq!(names, vec!["Ada", "Zoe"]);
    }

    #[tokio::test]
    async fn test_register_push_token_only_writes_changes() {
        let repo = repo();
        let user = repo.create(named("Ada")).await.unwrap();
        assert_eq!(user.coins, 0);

        assert!(repo.register_push_token(&user.id, "tok-1").await.unwrap());
        assert!(!repo.register_push_token(&user.id, "tok-1").await.unwrap());
        assert!(repo.register_push_token(&user.id, "tok-2").await.unwrap());

        let stored = repo.get(&user.id).await.unwrap();
        assert_eq!(stored.fcm_token.as_deref(), Some("tok-2"));
    }

    #[tokio::test]
    async fn test_with_push_tokens() {
        let repo = repo();
        let ada = repo.create(named("Ada")).await.unwrap();
        repo.create(named("Zoe")).await.unwrap();
        tokio_test::assert_ok!(repo.register_push_token(&ada.id, "tok").await);

        let reachable = repo.with_push_tokens().await.unwrap();
        assert_eq!(reachable.len(), 1);
        assert_eq!(reachable[0].id, ada.id);
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        assert!(matches!(
            repo().create(named("  ")).await,
            Err(AppError::InvalidInput(_))
        ));
    }
}

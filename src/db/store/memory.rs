use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use super::{Collection, Document, DocumentStore, Patch, Query, Snapshot, StoredDocument};
use crate::error::{AppError, AppResult};

const CHANGE_FEED_CAPACITY: usize = 256;

/// Process-local document store
///
/// Documents keep insertion order within a collection. Used for tests and for
/// running without a database.
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<StoredDocument>>>,
    changes: broadcast::Sender<Collection>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            collections: RwLock::new(HashMap::new()),
            changes,
        }
    }

    fn notify(&self, collection: Collection) {
        // No receivers is fine: nobody is subscribed yet.
        let _ = self.changes.send(collection);
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, collection: Collection, fields: Patch) -> AppResult<String> {
        let id = Uuid::new_v4().simple().to_string();
        let mut data = Document::new();
        fields.apply(&mut data, Utc::now());

        self.collections
            .write()
            .await
            .entry(collection)
            .or_default()
            .push(StoredDocument {
                id: id.clone(),
                data,
            });

        self.notify(collection);
        Ok(id)
    }

    async fn update(&self, collection: Collection, id: &str, patch: Patch) -> AppResult<()> {
        {
            let mut collections = self.collections.write().await;
            let doc = collections
                .get_mut(&collection)
                .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
                .ok_or_else(|| AppError::NotFound(format!("{}/{}", collection, id)))?;
            patch.apply(&mut doc.data, Utc::now());
        }

        self.notify(collection);
        Ok(())
    }

    async fn get(&self, collection: Collection, id: &str) -> AppResult<Option<StoredDocument>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn query(&self, query: &Query) -> AppResult<Snapshot> {
        let docs = self
            .collections
            .read()
            .await
            .get(&query.collection)
            .cloned()
            .unwrap_or_default();
        Ok(query.apply(docs))
    }

    fn changes(&self) -> broadcast::Receiver<Collection> {
        self.changes.subscribe()
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::{subscribe, Direction};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_create_get_update() {
        let store = MemoryStore::new();
        let id = store
            .create(Collection::Movies, Patch::new().set("title", "Up").set("votes", 0))
            .await
            .unwrap();

        store
            .update(Collection::Movies, &id, Patch::new().increment("votes", 1))
            .await
            .unwrap();

        let doc = store.get(Collection::Movies, &id).await.unwrap().unwrap();
        assert_eq!(doc.data["votes"], json!(1));
        assert_eq!(doc.data["title"], json!("Up"));
    }

    #[tokio::test]
    async fn test_update_missing_document() {
        let store = MemoryStore::new();
        let result = store
            .update(Collection::Users, "nope", Patch::new().set("name", "x"))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let store = MemoryStore::new();
        store
            .create(Collection::Users, Patch::new().set("name", "Ada"))
            .await
            .unwrap();

        let movies = store.query(&Query::collection(Collection::Movies)).await.unwrap();
        assert!(movies.is_empty());
    }

    #[tokio::test]
    async fn test_subscription_replays_full_snapshots() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let query = Query::collection(Collection::Movies).order_by("votes", Direction::Desc);
        let mut sub = subscribe(store.clone(), query).await.unwrap();

        let initial = sub.next().await.unwrap();
        assert!(initial.is_empty());

        store
            .create(Collection::Movies, Patch::new().set("votes", 1))
            .await
            .unwrap();
        let first = tokio::time::timeout(Duration::from_secs(1), sub.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.len(), 1);

        // Writes to other collections do not produce snapshots.
        store
            .create(Collection::Users, Patch::new().set("name", "Ada"))
            .await
            .unwrap();
        store
            .create(Collection::Movies, Patch::new().set("votes", 5))
            .await
            .unwrap();
        let second = tokio::time::timeout(Duration::from_secs(1), sub.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].data["votes"], json!(5));
    }
}

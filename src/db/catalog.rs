use std::sync::Arc;

use crate::{
    db::store::{
        self, decode_valid, Collection, Direction, DocumentStore, FilterOp, Patch, Query,
        Subscription,
    },
    error::{AppError, AppResult},
    models::{Category, ContentItem, NewContentItem},
};

/// Catalog entries in the `movies` collection
#[derive(Clone)]
pub struct CatalogRepository {
    store: Arc<dyn DocumentStore>,
}

impl CatalogRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn latest_query(category: Option<Category>) -> Query {
        let query = Query::collection(Collection::Movies);
        let query = match category {
            Some(category) => query.filter("category", FilterOp::Eq, category.as_str()),
            None => query,
        };
        query.order_by("createdAt", Direction::Desc)
    }

    /// Items newest first, optionally narrowed to one category
    ///
    /// Documents that cannot be read as an item are skipped.
    pub async fn list(&self, category: Option<Category>) -> AppResult<Vec<ContentItem>> {
        let snapshot = self.store.query(&Self::latest_query(category)).await?;
        Ok(decode_valid(&snapshot))
    }

    /// Every item in storage order, as the ranker expects
    pub async fn all(&self) -> AppResult<Vec<ContentItem>> {
        let snapshot = self.store.query(&Query::collection(Collection::Movies)).await?;
        Ok(decode_valid(&snapshot))
    }

    pub async fn get(&self, id: &str) -> AppResult<ContentItem> {
        self.store
            .get(Collection::Movies, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Content item {} not found", id)))?
            .decode()
    }

    /// Validates and stores a new item with zero votes
    pub async fn add(&self, item: NewContentItem) -> AppResult<ContentItem> {
        item.validate()?;
        let id = self.store.create(Collection::Movies, item.into_patch()?).await?;
        tracing::info!(item_id = %id, "Content item added");
        self.get(&id).await
    }

    /// Adds one vote and returns the updated item
    pub async fn vote(&self, id: &str) -> AppResult<ContentItem> {
        self.store
            .update(Collection::Movies, id, Patch::new().increment("votes", 1))
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => {
                    AppError::NotFound(format!("Content item {} not found", id))
                }
                other => other,
            })?;
        self.get(id).await
    }

    /// Snapshots of the whole catalog, newest first, on every change
    pub async fn watch_latest(&self) -> AppResult<Subscription> {
        store::subscribe(self.store.clone(), Self::latest_query(None)).await
    }
}

//! Video metadata provider abstraction
//!
//! Catalog items only store what a user typed in. A provider decorates them at
//! read time with live metadata (title, thumbnails, channel, views, duration)
//! and serves the short-form video feed. Enrichment never fails a request: a
//! provider that cannot reach its API returns the items unchanged.

use crate::{
    error::AppResult,
    models::{ContentItem, ShortsPage},
};

pub mod youtube;

pub use youtube::YouTubeProvider;

/// Default query for the shorts feed
pub const DEFAULT_SHORTS_QUERY: &str = "shorts";

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Returns the items in the same order, decorated where metadata was found
    async fn enrich(&self, items: Vec<ContentItem>) -> Vec<ContentItem>;

    /// One page of short-form videos matching `query`
    async fn search_shorts(&self, query: &str, page_token: Option<String>)
        -> AppResult<ShortsPage>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Enriches a single item
pub async fn enrich_one(provider: &dyn MetadataProvider, item: ContentItem) -> ContentItem {
    let fallback = item.clone();
    provider
        .enrich(vec![item])
        .await
        .into_iter()
        .next()
        .unwrap_or(fallback)
}

/// Used when no API key is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledProvider;

#[async_trait::async_trait]
impl MetadataProvider for DisabledProvider {
    async fn enrich(&self, items: Vec<ContentItem>) -> Vec<ContentItem> {
        items
    }

    async fn search_shorts(
        &self,
        _query: &str,
        _page_token: Option<String>,
    ) -> AppResult<ShortsPage> {
        tracing::debug!("Metadata provider disabled, returning empty shorts page");
        Ok(ShortsPage::default())
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

use std::sync::Arc;

use crate::{
    config::{Config, StoreBackend},
    db::{
        create_pool, create_redis_client, Cache, CacheWriterHandle, CatalogRepository,
        DocumentStore, MemoryStore, PgStore, SessionRepository, UserRepository,
    },
    services::{
        activity::TrackerRegistry,
        notifications::{DisabledPushSender, FcmSender, PushSender},
        providers::{DisabledProvider, MetadataProvider, YouTubeProvider},
        suggest::{ChatCompletionSuggester, DisabledSuggester, MovieSuggester},
        tracker::SystemClock,
    },
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogRepository,
    pub sessions: SessionRepository,
    pub users: UserRepository,
    pub trackers: TrackerRegistry,
    pub metadata: Arc<dyn MetadataProvider>,
    pub suggester: Arc<dyn MovieSuggester>,
    pub notifier: Arc<dyn PushSender>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        metadata: Arc<dyn MetadataProvider>,
        suggester: Arc<dyn MovieSuggester>,
        notifier: Arc<dyn PushSender>,
    ) -> Self {
        let sessions = SessionRepository::new(store.clone());
        let trackers = TrackerRegistry::new(Arc::new(sessions.clone()), Arc::new(SystemClock));

        Self {
            catalog: CatalogRepository::new(store.clone()),
            users: UserRepository::new(store),
            sessions,
            trackers,
            metadata,
            suggester,
            notifier,
        }
    }

    /// In-memory store with every external integration disabled
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(DisabledProvider),
            Arc::new(DisabledSuggester),
            Arc::new(DisabledPushSender),
        )
    }

    pub fn with_suggester(mut self, suggester: Arc<dyn MovieSuggester>) -> Self {
        self.suggester = suggester;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn PushSender>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Wires the configured backends
    ///
    /// Returns the cache writer handle when a Redis-backed provider was
    /// created, so the caller can flush it on shutdown.
    pub async fn from_config(config: &Config) -> anyhow::Result<(Self, Option<CacheWriterHandle>)> {
        let store: Arc<dyn DocumentStore> = match config.store_backend {
            StoreBackend::Postgres => {
                let pool = create_pool(&config.database_url).await?;
                tracing::info!("Database connection established");
                Arc::new(PgStore::connect(pool).await?)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory document store, data is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };
        tracing::info!(store = store.name(), "Document store ready");

        let mut cache_handle = None;
        let metadata: Arc<dyn MetadataProvider> =
            match config.youtube_api_key.as_deref().filter(|k| !k.is_empty()) {
                Some(key) => {
                    let redis_client = create_redis_client(&config.redis_url)?;
                    let (cache, handle) = Cache::new(redis_client);
                    cache_handle = Some(handle);
                    tracing::info!("YouTube metadata enrichment enabled");
                    Arc::new(YouTubeProvider::new(
                        cache,
                        key.to_string(),
                        config.youtube_api_url.clone(),
                    ))
                }
                None => {
                    tracing::warn!("YOUTUBE_API_KEY not set, skipping video metadata enrichment");
                    Arc::new(DisabledProvider)
                }
            };

        let suggester: Arc<dyn MovieSuggester> = match &config.suggest_api_url {
            Some(url) => Arc::new(ChatCompletionSuggester::new(
                url.clone(),
                config.suggest_api_key.clone(),
                config.suggest_model.clone(),
            )?),
            None => {
                tracing::warn!("SUGGEST_API_URL not set, movie suggestions disabled");
                Arc::new(DisabledSuggester)
            }
        };

        let notifier: Arc<dyn PushSender> =
            match (&config.fcm_project_id, &config.fcm_access_token) {
                (Some(project_id), Some(token)) => {
                    Arc::new(FcmSender::new(project_id.clone(), token.clone()))
                }
                _ => {
                    tracing::warn!("FCM credentials not set, push notifications disabled");
                    Arc::new(DisabledPushSender)
                }
            };

        let state = Self::new(store, metadata, suggester, notifier);
        Ok((state, cache_handle))
    }
}

use chrono::Utc;
use sqlx::{postgres::PgListener, types::Json, PgPool, Postgres, Transaction};
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{Collection, Document, DocumentStore, Patch, Query, Snapshot, StoredDocument};
use crate::error::{AppError, AppResult};

/// NOTIFY channel carrying the name of the changed collection
pub const CHANGE_CHANNEL: &str = "document_changes";

const CHANGE_FEED_CAPACITY: usize = 256;
const LISTENER_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Document store on a single PostgreSQL table of JSONB documents
///
/// Change notifications go through LISTEN/NOTIFY, so subscribers see writes made
/// by every process sharing the database, not just this one.
pub struct PgStore {
    pool: PgPool,
    changes: broadcast::Sender<Collection>,
}

impl PgStore {
    /// Creates the store and starts forwarding change notifications
    pub async fn connect(pool: PgPool) -> AppResult<Self> {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);

        let mut listener = PgListener::connect_with(&pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;

        let tx = changes.clone();
        let listener_pool = pool.clone();
        tokio::spawn(async move {
            Self::forward_notifications(listener, listener_pool, tx).await;
        });

        tracing::info!(channel = CHANGE_CHANNEL, "Document change listener started");

        Ok(Self { pool, changes })
    }

    /// Relays NOTIFY payloads into the in-process change feed
    async fn forward_notifications(
        mut listener: PgListener,
        pool: PgPool,
        tx: broadcast::Sender<Collection>,
    ) {
        loop {
            match listener.recv().await {
                Ok(notification) => match notification.payload().parse::<Collection>() {
                    Ok(collection) => {
                        let _ = tx.send(collection);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, payload = notification.payload(), "Ignoring change notification");
                    }
                },
                Err(e) => {
                    if pool.is_closed() {
                        break;
                    }
                    // recv() reconnects on the next call
                    tracing::error!(error = %e, "Change listener connection lost");
                    tokio::time::sleep(LISTENER_RETRY_DELAY).await;
                }
            }
        }
        tracing::info!("Document change listener stopped");
    }

    async fn notify(tx: &mut Transaction<'_, Postgres>, collection: Collection) -> AppResult<()> {
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(CHANGE_CHANNEL)
            .bind(collection.as_str())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl DocumentStore for PgStore {
    async fn create(&self, collection: Collection, fields: Patch) -> AppResult<String> {
        let id = Uuid::new_v4().simple().to_string();
        let mut data = Document::new();
        fields.apply(&mut data, Utc::now());

        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3)")
            .bind(collection.as_str())
            .bind(&id)
            .bind(Json(&data))
            .execute(&mut *tx)
            .await?;
        Self::notify(&mut tx, collection).await?;
        tx.commit().await?;

        Ok(id)
    }

    async fn update(&self, collection: Collection, id: &str, patch: Patch) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(Json<Document>,)> = sqlx::query_as(
            "SELECT data FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE",
        )
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((Json(mut data),)) = row else {
            return Err(AppError::NotFound(format!("{}/{}", collection, id)));
        };

        patch.apply(&mut data, Utc::now());

        sqlx::query("UPDATE documents SET data = $3 WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(id)
            .bind(Json(&data))
            .execute(&mut *tx)
            .await?;
        Self::notify(&mut tx, collection).await?;
        tx.commit().await?;

        Ok(())
    }

    async fn get(&self, collection: Collection, id: &str) -> AppResult<Option<StoredDocument>> {
        let row: Option<(String, Json<Document>)> =
            sqlx::query_as("SELECT id, data FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection.as_str())
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(id, Json(data))| StoredDocument { id, data }))
    }

    async fn query(&self, query: &Query) -> AppResult<Snapshot> {
        let rows: Vec<(String, Json<Document>)> =
            sqlx::query_as("SELECT id, data FROM documents WHERE collection = $1 ORDER BY seq")
                .bind(query.collection.as_str())
                .fetch_all(&self.pool)
                .await?;

        let docs = rows
            .into_iter()
            .map(|(id, Json(data))| StoredDocument { id, data })
            .collect();

        Ok(query.apply(docs))
    }

    fn changes(&self) -> broadcast::Receiver<Collection> {
        self.changes.subscribe()
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

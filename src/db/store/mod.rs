//! Document store abstraction
//!
//! Collections of schemaless JSON documents with server-assigned ids and
//! snapshot subscriptions. Every subscriber receives the full result of its
//! query once on subscribe and again after each change to the collection;
//! snapshots are never diffs.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::{fmt::Display, str::FromStr, sync::Arc};
use tokio::sync::{broadcast, mpsc};

use crate::error::{AppError, AppResult};

pub mod memory;
pub mod postgres;
pub mod query;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use query::{Direction, FilterOp, Query};

pub type Document = Map<String, Value>;

/// Full result of a query at one point in time
pub type Snapshot = Vec<StoredDocument>;

/// Number of undelivered snapshots a slow subscriber may fall behind by
const SUBSCRIPTION_BUFFER: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Movies,
    UserSessions,
    Users,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Movies => "movies",
            Collection::UserSessions => "user-sessions",
            Collection::Users => "users",
        }
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movies" => Ok(Collection::Movies),
            "user-sessions" => Ok(Collection::UserSessions),
            "users" => Ok(Collection::Users),
            other => Err(AppError::Internal(format!("Unknown collection: {}", other))),
        }
    }
}

/// Formats a timestamp the way the store writes server timestamps
pub fn timestamp_value(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// A single field write
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Set(Value),
    /// Resolved to the store's clock when the write is applied
    ServerTimestamp,
    /// Adds to the current integer value, treating a missing field as 0
    Increment(i64),
}

/// Ordered set of field writes applied atomically to one document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Patch {
    fields: Vec<(String, FieldValue)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields
            .push((field.to_string(), FieldValue::Set(value.into())));
        self
    }

    pub fn server_timestamp(mut self, field: &str) -> Self {
        self.fields
            .push((field.to_string(), FieldValue::ServerTimestamp));
        self
    }

    pub fn increment(mut self, field: &str, by: i64) -> Self {
        self.fields
            .push((field.to_string(), FieldValue::Increment(by)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Applies the writes in order to `doc`
    pub fn apply(&self, doc: &mut Document, now: DateTime<Utc>) {
        for (field, value) in &self.fields {
            let resolved = match value {
                FieldValue::Set(v) => v.clone(),
                FieldValue::ServerTimestamp => timestamp_value(now),
                FieldValue::Increment(by) => {
                    let current = doc.get(field).and_then(Value::as_i64).unwrap_or(0);
                    Value::from(current.saturating_add(*by))
                }
            };
            doc.insert(field.clone(), resolved);
        }
    }
}

/// A document together with its id
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub data: Document,
}

impl StoredDocument {
    /// Deserializes the document with its id merged in as the `id` field
    pub fn decode<T: DeserializeOwned>(&self) -> AppResult<T> {
        let mut data = self.data.clone();
        data.insert("id".to_string(), Value::String(self.id.clone()));
        Ok(serde_json::from_value(Value::Object(data))?)
    }
}

/// Decodes every document of a snapshot
pub fn decode_all<T: DeserializeOwned>(snapshot: &[StoredDocument]) -> AppResult<Vec<T>> {
    snapshot.iter().map(StoredDocument::decode).collect()
}

/// Decodes the documents of a snapshot, skipping those that do not decode
pub fn decode_valid<T: DeserializeOwned>(snapshot: &[StoredDocument]) -> Vec<T> {
    snapshot
        .iter()
        .filter_map(|doc| match doc.decode() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(document_id = %doc.id, error = %e, "Skipping undecodable document");
                None
            }
        })
        .collect()
}

#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates a document and returns its generated id
    async fn create(&self, collection: Collection, fields: Patch) -> AppResult<String>;

    /// Applies a patch to an existing document
    ///
    /// Fails with `NotFound` when the document does not exist.
    async fn update(&self, collection: Collection, id: &str, patch: Patch) -> AppResult<()>;

    async fn get(&self, collection: Collection, id: &str) -> AppResult<Option<StoredDocument>>;

    /// Runs a query once
    async fn query(&self, query: &Query) -> AppResult<Snapshot>;

    /// Feed of collections that changed
    fn changes(&self) -> broadcast::Receiver<Collection>;

    fn name(&self) -> &'static str;
}

/// Stream of snapshots for one query
pub struct Subscription {
    rx: mpsc::Receiver<Snapshot>,
}

impl Subscription {
    /// Waits for the next snapshot; `None` once the store has shut down
    pub async fn next(&mut self) -> Option<Snapshot> {
        self.rx.recv().await
    }
}

/// Subscribes to a query
///
/// The first snapshot is available immediately. A background task re-runs the
/// query after each change to the queried collection and stops when the
/// subscription is dropped.
pub async fn subscribe(store: Arc<dyn DocumentStore>, query: Query) -> AppResult<Subscription> {
    // Listen before the initial read so a write in between is not missed.
    let mut changes = store.changes();
    let initial = store.query(&query).await?;

    let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
    tx.send(initial)
        .await
        .map_err(|_| AppError::Internal("Subscription closed before start".to_string()))?;

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                changed = changes.recv() => {
                    match changed {
                        Ok(collection) if collection != query.collection => continue,
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, collection = %query.collection, "Subscription lagged, replaying");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }

                    match store.query(&query).await {
                        Ok(snapshot) => {
                            if tx.send(snapshot).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::error!(error = %e, collection = %query.collection, "Failed to refresh subscription");
                        }
                    }
                }
            }
        }
        tracing::debug!(collection = %query.collection, "Subscription ended");
    });

    Ok(Subscription { rx })
}

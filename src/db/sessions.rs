use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::{
    db::store::{
        decode_all, timestamp_value, Collection, Direction, DocumentStore, FilterOp, Patch, Query,
    },
    error::AppResult,
    models::Session,
};

/// Writes the session tracker needs
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Records a new open session stamped with the server time, returning its id
    async fn open_session(&self, user_id: &str) -> AppResult<String>;

    /// Stamps the end time and stores the duration in whole seconds
    async fn close_session(&self, session_id: &str, duration_secs: u64) -> AppResult<()>;
}

/// Session records in the `user-sessions` collection
#[derive(Clone)]
pub struct SessionRepository {
    store: Arc<dyn DocumentStore>,
}

impl SessionRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Sessions of one user started within `[from, to]`, oldest first
    pub async fn started_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Session>> {
        let query = Query::collection(Collection::UserSessions)
            .filter("userId", FilterOp::Eq, user_id)
            .filter("startTime", FilterOp::Gte, timestamp_value(from))
            .filter("startTime", FilterOp::Lte, timestamp_value(to))
            .order_by("startTime", Direction::Asc);

        let snapshot = self.store.query(&query).await?;
        decode_all(&snapshot)
    }

    pub async fn get(&self, session_id: &str) -> AppResult<Option<Session>> {
        self.store
            .get(Collection::UserSessions, session_id)
            .await?
            .map(|doc| doc.decode())
            .transpose()
    }
}

#[async_trait::async_trait]
impl SessionStore for SessionRepository {
    async fn open_session(&self, user_id: &str) -> AppResult<String> {
        let fields = Patch::new()
            .set("userId", user_id)
            .server_timestamp("startTime");
        self.store.create(Collection::UserSessions, fields).await
    }

    async fn close_session(&self, session_id: &str, duration_secs: u64) -> AppResult<()> {
        let patch = Patch::new()
            .server_timestamp("endTime")
            .set("duration", duration_secs);
        self.store
            .update(Collection::UserSessions, session_id, patch)
            .await
    }
}

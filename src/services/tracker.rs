//! Per-page session lifecycle
//!
//! A tracker is `Closed` until a user is known and the page is visible, then
//! `Open` until the page is hidden, unloads, or the user goes away. Every
//! open creates a fresh session record; sessions are never resumed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::SessionStore;

/// Source of the client-side instants used for durations
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Lifecycle events reported by a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageEvent {
    Visible,
    Hidden,
    Unload,
    /// The signed-in user changed; `None` on logout
    Identity { user_id: Option<String> },
}

#[derive(Debug, Clone)]
struct OpenSession {
    id: String,
    started_at: DateTime<Utc>,
}

/// Whole seconds between two instants, rounded to nearest and never negative
pub fn elapsed_secs(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    let millis = (end - start).num_milliseconds();
    if millis <= 0 {
        0
    } else {
        ((millis + 500) / 1000) as u64
    }
}

pub struct SessionTracker {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    user_id: Option<String>,
    visible: bool,
    open: Option<OpenSession>,
}

impl SessionTracker {
    /// A tracker for a freshly loaded, visible page with no user yet
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            user_id: None,
            visible: true,
            open: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.open.as_ref().map(|s| s.id.as_str())
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub async fn handle(&mut self, event: PageEvent) {
        match event {
            PageEvent::Visible => {
                self.visible = true;
                self.open().await;
            }
            PageEvent::Hidden => {
                self.visible = false;
                self.close().await;
            }
            PageEvent::Unload => self.close().await,
            PageEvent::Identity { user_id } => {
                if user_id == self.user_id {
                    return;
                }
                self.close().await;
                self.user_id = user_id;
                self.open().await;
            }
        }
    }

    /// Starts a session if a user is present, the page is visible and none is open
    ///
    /// A failed create is logged and leaves the tracker closed.
    pub async fn open(&mut self) {
        if self.open.is_some() || !self.visible {
            return;
        }
        let Some(user_id) = self.user_id.as_deref() else {
            return;
        };

        let started_at = self.clock.now();
        match self.store.open_session(user_id).await {
            Ok(id) => {
                tracing::info!(session_id = %id, user_id = %user_id, "Session started");
                self.open = Some(OpenSession { id, started_at });
            }
            Err(e) => {
                tracing::error!(error = %e, user_id = %user_id, "Error starting session");
            }
        }
    }

    /// Ends the open session, if any
    ///
    /// Local state is cleared even when the write fails; the record then stays
    /// without an end time.
    pub async fn close(&mut self) {
        let Some(session) = self.open.take() else {
            return;
        };

        let duration = elapsed_secs(session.started_at, self.clock.now());
        match self.store.close_session(&session.id, duration).await {
            Ok(()) => {
                tracing::info!(session_id = %session.id, duration, "Session ended");
            }
            Err(e) => {
                tracing::error!(error = %e, session_id = %session.id, "Error ending session");
            }
        }
    }
}

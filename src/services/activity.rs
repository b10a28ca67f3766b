use chrono::{Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};
use tokio::sync::{Mutex, RwLock};

use crate::{
    db::{SessionRepository, SessionStore},
    error::{AppError, AppResult},
    models::ActivityReport,
    services::tracker::{Clock, PageEvent, SessionTracker},
};

/// A page event addressed to one open page
#[derive(Debug, Clone, Deserialize)]
pub struct PageEventEnvelope {
    pub page_id: String,
    pub event: PageEvent,
}

/// Tracker state after an event was applied
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackerStatus {
    pub page_id: String,
    pub open: bool,
    pub session_id: Option<String>,
}

/// How long a closed tracker may go without events before it is dropped
pub const TRACKER_IDLE_TTL: StdDuration = StdDuration::from_secs(30 * 60);

/// A page's tracker and when it last received an event
struct PageTracker {
    tracker: SessionTracker,
    last_event: Instant,
}

/// Live trackers keyed by page instance
///
/// Each page gets its own tracker behind its own lock, so events of one page
/// apply in order while different pages proceed independently. A page that
/// goes away without an unload leaves a closed tracker behind; those are
/// swept once idle for longer than the registry's TTL. Trackers with an open
/// session are kept however long they stay quiet.
#[derive(Clone)]
pub struct TrackerRegistry {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    idle_ttl: StdDuration,
    trackers: Arc<RwLock<HashMap<String, Arc<Mutex<PageTracker>>>>>,
    last_sweep: Arc<Mutex<Instant>>,
}

impl TrackerRegistry {
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            idle_ttl: TRACKER_IDLE_TTL,
            trackers: Arc::new(RwLock::new(HashMap::new())),
            last_sweep: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn with_idle_ttl(mut self, idle_ttl: StdDuration) -> Self {
        self.idle_ttl = idle_ttl;
        self
    }

    async fn tracker_for(&self, page_id: &str) -> Arc<Mutex<PageTracker>> {
        if let Some(tracker) = self.trackers.read().await.get(page_id) {
            return tracker.clone();
        }

        let mut trackers = self.trackers.write().await;
        trackers
            .entry(page_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(page_id = %page_id, "Tracker created");
                Arc::new(Mutex::new(PageTracker {
                    tracker: SessionTracker::new(self.store.clone(), self.clock.clone()),
                    last_event: Instant::now(),
                }))
            })
            .clone()
    }

    /// Applies one event to the page's tracker
    ///
    /// The tracker is dropped once its page unloads; a later event for the
    /// same page id starts from a fresh tracker.
    pub async fn dispatch(&self, page_id: &str, event: PageEvent) -> AppResult<TrackerStatus> {
        if page_id.trim().is_empty() {
            return Err(AppError::InvalidInput("page_id is required.".to_string()));
        }

        let unload = event == PageEvent::Unload;
        let entry = self.tracker_for(page_id).await;

        let status = {
            let mut page = entry.lock().await;
            page.tracker.handle(event).await;
            page.last_event = Instant::now();
            TrackerStatus {
                page_id: page_id.to_string(),
                open: page.tracker.is_open(),
                session_id: page.tracker.session_id().map(String::from),
            }
        };
        drop(entry);

        if unload {
            self.trackers.write().await.remove(page_id);
            tracing::debug!(page_id = %page_id, "Tracker dropped after unload");
        }

        self.sweep_if_due().await;

        Ok(status)
    }

    /// Runs `evict_idle` at most once per TTL
    async fn sweep_if_due(&self) {
        let Ok(mut last_sweep) = self.last_sweep.try_lock() else {
            return;
        };
        if last_sweep.elapsed() < self.idle_ttl {
            return;
        }
        *last_sweep = Instant::now();
        drop(last_sweep);

        self.evict_idle().await;
    }

    /// Drops closed trackers idle for longer than the TTL, returning how many
    pub async fn evict_idle(&self) -> usize {
        let mut trackers = self.trackers.write().await;
        let before = trackers.len();

        trackers.retain(|_, entry| {
            // Another dispatch holds a clone: in use.
            if Arc::strong_count(entry) > 1 {
                return true;
            }
            match entry.try_lock() {
                Ok(page) => page.tracker.is_open() || page.last_event.elapsed() < self.idle_ttl,
                Err(_) => true,
            }
        });

        let evicted = before - trackers.len();
        if evicted > 0 {
            tracing::info!(evicted, remaining = trackers.len(), "Idle page trackers dropped");
        }
        evicted
    }

    /// Number of pages currently tracked
    pub async fn page_count(&self) -> usize {
        self.trackers.read().await.len()
    }
}

/// Sessions a user started on one UTC calendar day, with their total time
pub async fn daily_report(
    sessions: &SessionRepository,
    user_id: &str,
    date: NaiveDate,
) -> AppResult<ActivityReport> {
    if user_id.trim().is_empty() {
        return Err(AppError::InvalidInput("User id is required.".to_string()));
    }

    let start = Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN));
    let end = start + Duration::days(1) - Duration::milliseconds(1);

    let found = sessions.started_between(user_id, start, end).await?;
    Ok(ActivityReport::new(user_id.to_string(), date, found))
}

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::{
    api::AppState,
    error::AppResult,
    models::ActivityReport,
    services::activity::{daily_report, PageEventEnvelope, TrackerStatus},
};

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    /// `YYYY-MM-DD`, defaults to today (UTC)
    date: Option<NaiveDate>,
}

/// Feeds one page lifecycle event to that page's session tracker
pub async fn post_event(
    State(state): State<AppState>,
    Json(envelope): Json<PageEventEnvelope>,
) -> AppResult<Json<TrackerStatus>> {
    let status = state
        .trackers
        .dispatch(&envelope.page_id, envelope.event)
        .await?;
    Ok(Json(status))
}

pub async fn user_sessions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<ReportQuery>,
) -> AppResult<Json<ActivityReport>> {
    let date = params.date.unwrap_or_else(|| Utc::now().date_naive());
    let report = daily_report(&state.sessions, &user_id, date).await?;
    Ok(Json(report))
}

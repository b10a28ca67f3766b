use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    api::AppState,
    error::AppResult,
    models::ShortsPage,
    services::providers::DEFAULT_SHORTS_QUERY,
};

#[derive(Debug, Deserialize)]
pub struct ShortsQuery {
    q: Option<String>,
    page_token: Option<String>,
}

/// Handler for the shorts feed; pass the returned token back for the next page
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ShortsQuery>,
) -> AppResult<Json<ShortsPage>> {
    let query = params.q.as_deref().unwrap_or(DEFAULT_SHORTS_QUERY);
    let page = state
        .metadata
        .search_shorts(query, params.page_token.filter(|t| !t.is_empty()))
        .await?;
    Ok(Json(page))
}

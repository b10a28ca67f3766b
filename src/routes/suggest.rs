use axum::{extract::State, Json};

use crate::{
    api::AppState,
    error::AppResult,
    services::suggest::{suggest_movie, SuggestRequest, SuggestResponse},
};

/// Handler for "suggest a movie" from a free-text description
pub async fn suggest(
    State(state): State<AppState>,
    Json(payload): Json<SuggestRequest>,
) -> AppResult<Json<SuggestResponse>> {
    let response = suggest_movie(state.suggester.clone(), &payload.prompt).await?;
    Ok(Json(response))
}

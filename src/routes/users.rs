use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    api::AppState,
    error::AppResult,
    models::{NewUser, User},
};

#[derive(Debug, Deserialize)]
pub struct PushTokenRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct PushTokenResponse {
    pub changed: bool,
}

pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.users.list().await?))
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<NewUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state.users.create(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Saves the browser's push token on the user profile
pub async fn register_push_token(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<PushTokenRequest>,
) -> AppResult<Json<PushTokenResponse>> {
    let changed = state.users.register_push_token(&id, &payload.token).await?;
    Ok(Json(PushTokenResponse { changed }))
}

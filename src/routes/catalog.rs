use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Extension, Json,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};

use crate::{
    api::AppState,
    db::store::decode_valid,
    error::AppResult,
    middleware::RequestId,
    models::{Category, ContentItem, NewContentItem},
    services::{
        links::PlaybackTarget, notifications::announce_new_content, providers::enrich_one,
        recommendations,
    },
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    category: Option<Category>,
    q: Option<String>,
}

/// An item as shown on the watch page
#[derive(Debug, Serialize)]
pub struct WatchView {
    #[serde(flatten)]
    pub item: ContentItem,
    /// Absent for episodic items without episodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playback: Option<PlaybackTarget>,
}

/// Handler for the catalog listing
///
/// The title search runs on the enriched titles, the ones users see.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> AppResult<Json<Vec<ContentItem>>> {
    let items = state.catalog.list(params.category).await?;
    let mut items = state.metadata.enrich(items).await;
    if let Some(q) = params.q.as_deref() {
        items.retain(|item| item.title_contains(q));
    }
    Ok(Json(items))
}

/// Handler for the TV channels page
pub async fn tv_channels(State(state): State<AppState>) -> AppResult<Json<Vec<ContentItem>>> {
    let items = state.catalog.list(Some(Category::TvChannel)).await?;
    Ok(Json(state.metadata.enrich(items).await))
}

/// Adds an item and announces it to subscribed users in the background
pub async fn create(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(payload): Json<NewContentItem>,
) -> AppResult<(StatusCode, Json<ContentItem>)> {
    let item = state.catalog.add(payload).await?;
    tracing::info!(item_id = %item.id, request_id = %request_id, "Scheduling new content announcement");

    let users = state.users.clone();
    let notifier = state.notifier.clone();
    let announced = item.clone();
    tokio::spawn(async move {
        match users.with_push_tokens().await {
            Ok(recipients) => {
                announce_new_content(&recipients, notifier, &announced).await;
            }
            Err(e) => {
                tracing::error!(error = %e, item_id = %announced.id, "Error loading push recipients");
            }
        }
    });

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<WatchView>> {
    let item = state.catalog.get(&id).await?;
    let playback = item.playable_url().map(PlaybackTarget::for_url);
    let item = enrich_one(state.metadata.as_ref(), item).await;
    Ok(Json(WatchView { item, playback }))
}

pub async fn vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ContentItem>> {
    let item = state.catalog.vote(&id).await?;
    Ok(Json(item))
}

/// "Up next" list for the watch page
pub async fn suggestions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<ContentItem>>> {
    let current = state.catalog.get(&id).await?;
    let catalog = state.catalog.all().await?;

    let ranked: Vec<ContentItem> = recommendations::suggest(Some(&current), &catalog)
        .into_iter()
        .cloned()
        .collect();

    Ok(Json(state.metadata.enrich(ranked).await))
}

/// Server-sent events carrying the whole catalog, newest first, on every change
///
/// The first event is sent immediately with the current contents.
pub async fn stream(
    State(state): State<AppState>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let subscription = state.catalog.watch_latest().await?;
    let metadata = state.metadata.clone();

    let events = stream::unfold(
        (subscription, metadata),
        |(mut subscription, metadata)| async move {
            let snapshot = subscription.next().await?;
            let items = metadata.enrich(decode_valid::<ContentItem>(&snapshot)).await;
            let event = Event::default().event("catalog").json_data(items);
            Some((event, (subscription, metadata)))
        },
    );

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    middleware::{make_span_with_request_id, request_id_middleware},
    routes::{activity, catalog, health_check, shorts, suggest, users},
};

use super::AppState;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Catalog
        .route("/content", get(catalog::list).post(catalog::create))
        .route("/content/stream", get(catalog::stream))
        .route("/content/:id", get(catalog::get_item))
        .route("/content/:id/vote", post(catalog::vote))
        .route("/content/:id/suggestions", get(catalog::suggestions))
        .route("/tv-channels", get(catalog::tv_channels))
        .route("/shorts", get(shorts::list))
        // Activity
        .route("/activity/events", post(activity::post_event))
        .route(
            "/activity/users/:user_id/sessions",
            get(activity::user_sessions),
        )
        // Users
        .route("/users", get(users::list).post(users::create))
        .route("/users/:id/push-token", put(users::register_push_token))
        // Suggest a movie
        .route("/suggest", post(suggest::suggest))
}

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use cinefind_api::{
    api::{create_router, AppState},
    db::store::{Collection, DocumentStore, MemoryStore, Patch},
    error::AppResult,
    models::{ContentItem, ShortsPage},
    services::{
        notifications::DisabledPushSender, providers::MetadataProvider,
        suggest::MovieSuggester,
    },
};

struct FixedSuggester(&'static str);

#[async_trait::async_trait]
impl MovieSuggester for FixedSuggester {
    async fn suggest(&self, _prompt: &str) -> AppResult<String> {
        Ok(self.0.to_string())
    }
}

/// Replaces the typed title of items linking to `youtu.be/interstellar`
struct RenamingProvider;

#[async_trait::async_trait]
impl MetadataProvider for RenamingProvider {
    async fn enrich(&self, items: Vec<ContentItem>) -> Vec<ContentItem> {
        items
            .into_iter()
            .map(|mut item| {
                if item.url.as_deref() == Some("https://youtu.be/interstellar") {
                    item.title = "Interstellar (Official Trailer)".to_string();
                }
                item
            })
            .collect()
    }

    async fn search_shorts(&self, _query: &str, _page_token: Option<String>) -> AppResult<ShortsPage> {
        Ok(ShortsPage::default())
    }

    fn name(&self) -> &'static str {
        "renaming"
    }
}

fn create_test_server() -> TestServer {
    let state = AppState::in_memory().with_suggester(Arc::new(FixedSuggester("Inception")));
    let app = create_router(state);
    TestServer::new(app).unwrap()
}

async fn add_movie(server: &TestServer, title: &str, url: &str) -> Value {
    let response = server
        .post("/api/v1/content")
        .json(&json!({
            "title": title,
            "category": "movie",
            "url": url
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    // Keeps createdAt strictly increasing between inserts.
    tokio::time::sleep(Duration::from_millis(5)).await;
    response.json()
}

fn titles(items: &[Value]) -> Vec<&str> {
    items.iter().map(|i| i["title"].as_str().unwrap()).collect()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_add_and_list_content() {
    let server = create_test_server();

    let created = add_movie(&server, "Inception", "https://youtu.be/abc").await;
    assert_eq!(created["votes"], 0);
    assert!(created["createdAt"].is_string());

    add_movie(&server, "Dune", "https://example.com/dune.mp4").await;

    let response = server.get("/api/v1/content").await;
    response.assert_status_ok();
    let items: Vec<Value> = response.json();
    assert_eq!(titles(&items), vec!["Dune", "Inception"]);

    let response = server.get("/api/v1/content").add_query_param("q", "INCEP").await;
    let items: Vec<Value> = response.json();
    assert_eq!(titles(&items), vec!["Inception"]);
}

#[tokio::test]
async fn test_add_web_series_and_tv_channels() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/content")
        .json(&json!({
            "title": "Mirzapur",
            "category": "web-series",
            "episodes": [
                { "title": "Episode 1", "url": "https://youtu.be/ep1" },
                { "title": "Episode 2", "url": "https://youtu.be/ep2" }
            ]
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let series: Value = response.json();
    assert_eq!(series["episodes"].as_array().unwrap().len(), 2);

    server
        .post("/api/v1/content")
        .json(&json!({
            "title": "News 24",
            "category": "tv-channel",
            "url": "https://www.youtube.com/live/news24"
        }))
        .await
        .assert_status(StatusCode::CREATED);

    let channels: Vec<Value> = server.get("/api/v1/tv-channels").await.json();
    assert_eq!(titles(&channels), vec!["News 24"]);

    let filtered: Vec<Value> = server
        .get("/api/v1/content")
        .add_query_param("category", "web-series")
        .await
        .json();
    assert_eq!(titles(&filtered), vec!["Mirzapur"]);
}

#[tokio::test]
async fn test_invalid_content_rejected() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/content")
        .json(&json!({ "title": "  ", "category": "movie", "url": "https://youtu.be/x" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    response.assert_json(&json!({ "error": "Title is required." }));

    let response = server
        .post("/api/v1/content")
        .json(&json!({ "title": "Dune", "category": "movie" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    response.assert_json(&json!({ "error": "URL is required." }));

    let response = server
        .post("/api/v1/content")
        .json(&json!({ "title": "Show", "category": "web-series", "episodes": [] }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_content_is_not_found() {
    let server = create_test_server();

    let response = server.get("/api/v1/content/missing").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("missing"));

    server
        .post("/api/v1/content/missing/vote")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_watch_view_playback() {
    let server = create_test_server();

    let yt = add_movie(&server, "Inception", "https://www.youtube.com/watch?v=abc123").await;
    let drive = add_movie(&server, "Home video", "https://drive.google.com/file/d/F1/view").await;
    let other = add_movie(&server, "Dune", "https://example.com/dune.mp4").await;

    let view: Value = server
        .get(&format!("/api/v1/content/{}", yt["id"].as_str().unwrap()))
        .await
        .json();
    assert_eq!(view["title"], "Inception");
    assert_eq!(
        view["playback"],
        json!({ "kind": "embed", "url": "https://www.youtube.com/embed/abc123?autoplay=1&rel=0" })
    );

    let view: Value = server
        .get(&format!("/api/v1/content/{}", drive["id"].as_str().unwrap()))
        .await
        .json();
    assert_eq!(view["playback"]["url"], "https://drive.google.com/file/d/F1/preview");

    let view: Value = server
        .get(&format!("/api/v1/content/{}", other["id"].as_str().unwrap()))
        .await
        .json();
    assert_eq!(view["playback"]["kind"], "external");
}

#[tokio::test]
async fn test_vote_increments() {
    let server = create_test_server();
    let item = add_movie(&server, "Up", "https://youtu.be/up").await;
    let path = format!("/api/v1/content/{}/vote", item["id"].as_str().unwrap());

    server.post(&path).await.assert_status_ok();
    let voted: Value = server.post(&path).await.json();
    assert_eq!(voted["votes"], 2);
}

#[tokio::test]
async fn test_suggestions_rank_series_then_votes() {
    let server = create_test_server();

    let current = add_movie(&server, "Breaking: Episode 3", "https://youtu.be/b3").await;
    add_movie(&server, "Breaking Bad S1E1", "https://youtu.be/b1").await;
    let inception = add_movie(&server, "Inception", "https://youtu.be/inc").await;
    add_movie(&server, "Breaking News", "https://youtu.be/bn").await;
    add_movie(&server, "Dune", "https://youtu.be/dune").await;

    let vote = format!("/api/v1/content/{}/vote", inception["id"].as_str().unwrap());
    server.post(&vote).await.assert_status_ok();

    let response = server
        .get(&format!(
            "/api/v1/content/{}/suggestions",
            current["id"].as_str().unwrap()
        ))
        .await;
    response.assert_status_ok();
    let items: Vec<Value> = response.json();
    assert_eq!(
        titles(&items),
        vec!["Breaking Bad S1E1", "Breaking News", "Inception", "Dune"]
    );
}

#[tokio::test]
async fn test_shorts_empty_without_provider() {
    let server = create_test_server();
    let response = server.get("/api/v1/shorts").await;
    response.assert_status_ok();
    let page: Value = response.json();
    assert_eq!(page["videos"], json!([]));
}

#[tokio::test]
async fn test_activity_events_and_daily_report() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/activity/events")
        .json(&json!({
            "page_id": "tab-1",
            "event": { "type": "identity", "user_id": "u1" }
        }))
        .await;
    response.assert_status_ok();
    let status: Value = response.json();
    assert_eq!(status["open"], true);
    assert!(status["session_id"].is_string());

    let status: Value = server
        .post("/api/v1/activity/events")
        .json(&json!({ "page_id": "tab-1", "event": { "type": "hidden" } }))
        .await
        .json();
    assert_eq!(status["open"], false);
    assert_eq!(status["session_id"], Value::Null);

    // A second close is a no-op.
    server
        .post("/api/v1/activity/events")
        .json(&json!({ "page_id": "tab-1", "event": { "type": "unload" } }))
        .await
        .assert_status_ok();

    let report: Value = server.get("/api/v1/activity/users/u1/sessions").await.json();
    let sessions = report["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert!(sessions[0]["duration"].is_u64());
    assert!(report["total_duration"].as_str().unwrap().starts_with("00:00:0"));

    let report: Value = server
        .get("/api/v1/activity/users/u1/sessions")
        .add_query_param("date", "2001-01-01")
        .await
        .json();
    assert_eq!(report["sessions"], json!([]));
}

#[tokio::test]
async fn test_anonymous_page_opens_no_session() {
    let server = create_test_server();
    let status: Value = server
        .post("/api/v1/activity/events")
        .json(&json!({ "page_id": "tab-1", "event": { "type": "visible" } }))
        .await
        .json();
    assert_eq!(status["open"], false);
}

#[tokio::test]
async fn test_users_and_push_token() {
    let server = create_test_server();

    let response = server.post("/api/v1/users").json(&json!({ "name": "Zoe" })).await;
    response.assert_status(StatusCode::CREATED);
    let zoe: Value = response.json();
    assert_eq!(zoe["coins"], 0);

    server
        .post("/api/v1/users")
        .json(&json!({ "name": "Ada" }))
        .await
        .assert_status(StatusCode::CREATED);

    let users: Vec<Value> = server.get("/api/v1/users").await.json();
    let names: Vec<&str> = users.iter().map(|u| u["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Ada", "Zoe"]);

    let path = format!("/api/v1/users/{}/push-token", zoe["id"].as_str().unwrap());
    let first: Value = server.put(&path).json(&json!({ "token": "tok" })).await.json();
    assert_eq!(first["changed"], true);
    let again: Value = server.put(&path).json(&json!({ "token": "tok" })).await.json();
    assert_eq!(again["changed"], false);

    server
        .put("/api/v1/users/nobody/push-token")
        .json(&json!({ "token": "tok" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_suggest_movie() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/suggest")
        .json(&json!({ "prompt": "short" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    response.assert_json(&json!({ "error": "Please provide a more detailed description." }));

    let response = server
        .post("/api/v1/suggest")
        .json(&json!({ "prompt": "a heist that happens inside dreams" }))
        .await;
    response.assert_status_ok();
    response.assert_json(&json!({ "movieTitle": "Inception" }));
}

#[tokio::test]
async fn test_suggest_without_backend_is_bad_gateway() {
    let server = TestServer::new(create_router(AppState::in_memory())).unwrap();
    let response = server
        .post("/api/v1/suggest")
        .json(&json!({ "prompt": "a heist that happens inside dreams" }))
        .await;
    response.assert_status(StatusCode::BAD_GATEWAY);
    response.assert_json(&json!({ "error": "AI failed to suggest a movie. Please try again." }));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server();
    let response = server.get("/health").await;
    assert!(!response.header("x-request-id").is_empty());
}

#[tokio::test]
async fn test_malformed_documents_do_not_break_catalog_reads() {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(
        store.clone(),
        Arc::new(RenamingProvider),
        Arc::new(FixedSuggester("Inception")),
        Arc::new(DisabledPushSender),
    );
    let server = TestServer::new(create_router(state)).unwrap();

    let current = add_movie(&server, "Up", "https://youtu.be/up").await;
    store
        .create(
            Collection::Movies,
            Patch::new()
                .set("title", Value::Null)
                .set("votes", "lots")
                .set("category", "documentary")
                .server_timestamp("createdAt"),
        )
        .await
        .unwrap();
    store
        .create(
            Collection::Movies,
            Patch::new().set("title", "Broken").set("duration", "long"),
        )
        .await
        .unwrap();

    let response = server.get("/api/v1/content").await;
    response.assert_status_ok();
    let items: Vec<Value> = response.json();
    assert_eq!(items.len(), 2);
    assert!(items.iter().any(|i| i["title"] == "" && i["category"] == "other"));

    let response = server
        .get(&format!(
            "/api/v1/content/{}/suggestions",
            current["id"].as_str().unwrap()
        ))
        .await;
    response.assert_status_ok();
    let items: Vec<Value> = response.json();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "");
    assert_eq!(items[0]["votes"], 0);

    server.get("/api/v1/tv-channels").await.assert_status_ok();
}

#[tokio::test]
async fn test_search_matches_enriched_titles() {
    let state = AppState::new(
        Arc::new(MemoryStore::new()),
        Arc::new(RenamingProvider),
        Arc::new(FixedSuggester("Inception")),
        Arc::new(DisabledPushSender),
    );
    let server = TestServer::new(create_router(state)).unwrap();

    add_movie(&server, "my favourite film", "https://youtu.be/interstellar").await;
    add_movie(&server, "Dune", "https://youtu.be/dune").await;

    let items: Vec<Value> = server
        .get("/api/v1/content")
        .add_query_param("q", "interstellar")
        .await
        .json();
    assert_eq!(titles(&items), vec!["Interstellar (Official Trailer)"]);

    let items: Vec<Value> = server
        .get("/api/v1/content")
        .add_query_param("q", "favourite")
        .await
        .json();
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_user_list_hides_push_tokens() {
    let server = create_test_server();

    let ada: Value = server
        .post("/api/v1/users")
        .json(&json!({ "name": "Ada" }))
        .await
        .json();
    server
        .put(&format!("/api/v1/users/{}/push-token", ada["id"].as_str().unwrap()))
        .json(&json!({ "token": "secret-token" }))
        .await
        .assert_status_ok();

    let users: Vec<Value> = server.get("/api/v1/users").await.json();
    assert_eq!(users.len(), 1);
    assert!(users[0].get("fcmToken").is_none());
    assert!(!server.get("/api/v1/users").await.text().contains("secret-token"));
}

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::{TimeZone, Utc};
use serde_json::json;

use prefsync::api::{create_router, AppState};
use prefsync::db::{LocalCache, MemoryStorage};
use prefsync::models::{Comment, CommentId, SessionContext};
use prefsync::services::{AdvisoryFeed, InMemoryRemoteStore};

struct Harness {
    server: TestServer,
    remote: Arc<InMemoryRemoteStore>,
}

fn create_test_server() -> Harness {
    let session = SessionContext::default();
    let remote = Arc::new(InMemoryRemoteStore::new(session.clone()));
    let cache = LocalCache::new(Arc::new(MemoryStorage::new()));
    let state = AppState::new(session, cache, remote.clone(), Arc::new(AdvisoryFeed::new()));
    let app = create_router(state);
    Harness {
        server: TestServer::new(app).unwrap(),
        remote,
    }
}

fn signed_in_session() -> serde_json::Value {
    json!({
        "isAuthenticated": true,
        "user": { "id": "u1", "username": "ana", "email": "ana@example.com" },
        "token": "token-u1"
    })
}

fn comment(id: &str, media_id: i64, minute: u32) -> Comment {
    Comment {
        id: CommentId::new(id),
        media_id,
        user_id: "u2".to_string(),
        username: "ben".to_string(),
        content: format!("comment {}", id),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap(),
        likes: Vec::new(),
        dislikes: Vec::new(),
    }
}

#[tokio::test]
async fn test_health_check() {
    let harness = create_test_server();
    let response = harness.server.get("/health").await;
    response.assert_status_ok();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_guest_favorites_roundtrip() {
    let harness = create_test_server();
    let server = &harness.server;

    let response = server.get("/favorites").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["mode"], "guest");
    assert_eq!(body["favorites"], json!([]));

    // Add a movie
    let response = server
        .post("/favorites")
        .json(&json!({ "id": 603, "mediaType": "movie", "title": "The Matrix" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    assert_eq!(response.json::<serde_json::Value>()["outcome"], "applied");

    // Adding it again changes nothing
    let response = server
        .post("/favorites")
        .json(&json!({ "id": 603, "mediaType": "movie", "title": "The Matrix" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<serde_json::Value>()["outcome"], "unchanged");

    // Same numeric id as a TV show is a different favorite
    let response = server.get("/favorites/movie/603").await;
    assert_eq!(response.json::<serde_json::Value>()["favorite"], true);
    let response = server.get("/favorites/tv/603").await;
    assert_eq!(response.json::<serde_json::Value>()["favorite"], false);

    let response = server.delete("/favorites/movie/603").await;
    response.assert_status_ok();
    assert_eq!(response.json::<serde_json::Value>()["outcome"], "applied");

    let body: serde_json::Value = server.get("/favorites").await.json();
    assert_eq!(body["favorites"], json!([]));

    // Every guest mutation nudges towards signing in, even a no-op
    let advisories: Vec<serde_json::Value> = server.get("/advisories").await.json();
    assert_eq!(advisories.len(), 3);
    assert!(advisories.iter().all(|a| a["severity"] == "info"));
    let advisories: Vec<serde_json::Value> = server.get("/advisories").await.json();
    assert!(advisories.is_empty());
}

#[tokio::test]
async fn test_invalid_favorite_requests() {
    let harness = create_test_server();

    let response = harness.server.get("/favorites/anime/1").await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = harness
        .server
        .post("/favorites")
        .json(&json!({ "id": 1, "mediaType": "movie", "title": "   " }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sign_in_switches_to_remote_and_imports_on_request() {
    let harness = create_test_server();
    let server = &harness.server;

    // Saved on this device as a guest
    server
        .post("/favorites")
        .json(&json!({ "id": 1399, "mediaType": "tv", "title": "Game of Thrones" }))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server.put("/session").json(&signed_in_session()).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["mode"], "authenticated");
    // The account list is not merged with the device list automatically
    assert_eq!(body["favorites"], json!([]));

    let response = server.post("/favorites/import").await;
    response.assert_status_ok();
    assert_eq!(response.json::<serde_json::Value>()["imported"], 1);

    let remote = harness.remote.favorites_of("u1").await;
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0].title, "Game of Thrones");

    // Logging out shows the device list again
    let body: serde_json::Value = server.delete("/session").await.json();
    assert_eq!(body["mode"], "guest");
    assert_eq!(body["favorites"][0]["id"], 1399);
}

#[tokio::test]
async fn test_import_requires_sign_in() {
    let harness = create_test_server();
    let response = harness.server.post("/favorites/import").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signed_in_add_reaches_remote() {
    let harness = create_test_server();
    let server = &harness.server;
    server.put("/session").json(&signed_in_session()).await;

    let response = server
        .post("/favorites")
        .json(&json!({ "id": 27205, "mediaType": "movie", "title": "Inception", "posterPath": "/inception.jpg" }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let remote = harness.remote.favorites_of("u1").await;
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0].poster_path.as_deref(), Some("/inception.jpg"));

    let advisories: Vec<serde_json::Value> = server.get("/advisories").await.json();
    assert!(advisories.iter().any(|a| a["severity"] == "success"));
}

#[tokio::test]
async fn test_remote_outage_rolls_back_add() {
    let harness = create_test_server();
    let server = &harness.server;
    server.put("/session").json(&signed_in_session()).await;
    harness.remote.set_offline(true);

    let response = server
        .post("/favorites")
        .json(&json!({ "id": 550, "mediaType": "movie", "title": "Fight Club" }))
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let response = server.get("/favorites/movie/550").await;
    assert_eq!(response.json::<serde_json::Value>()["favorite"], false);

    let advisories: Vec<serde_json::Value> = server.get("/advisories").await.json();
    assert_eq!(advisories.last().unwrap()["severity"], "error");
}

#[tokio::test]
async fn test_comment_reactions_toggle_exclusively() {
    let harness = create_test_server();
    let server = &harness.server;
    harness.remote.insert_comment(comment("c1", 603, 0)).await;
    harness.remote.insert_comment(comment("c2", 603, 30)).await;
    harness.remote.insert_comment(comment("c3", 999, 45)).await;
    server.put("/session").json(&signed_in_session()).await;

    let response = server.get("/media/603/comments").await;
    response.assert_status_ok();
    let comments: Vec<serde_json::Value> = response.json();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["id"], "c2");

    let response = server.post("/comments/c1/like").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "committed");
    assert_eq!(body["reaction"], "liked");

    let body: serde_json::Value = server.post("/comments/c1/dislike").await.json();
    assert_eq!(body["reaction"], "disliked");

    let stored = harness.remote.comment(&CommentId::new("c1")).await.unwrap();
    assert!(stored.likes.is_empty());
    assert_eq!(stored.dislikes, vec!["u1".to_string()]);

    let body: serde_json::Value = server.post("/comments/c1/dislike").await.json();
    assert_eq!(body["reaction"], "neutral");
}

#[tokio::test]
async fn test_guest_reaction_is_rejected() {
    let harness = create_test_server();
    let response = harness.server.post("/comments/c1/like").await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let advisories: Vec<serde_json::Value> = harness.server.get("/advisories").await.json();
    assert_eq!(advisories.len(), 1);
    assert_eq!(advisories[0]["severity"], "warning");
}

#[tokio::test]
async fn test_unknown_comment_is_not_found() {
    let harness = create_test_server();
    let server = &harness.server;
    harness.remote.insert_comment(comment("c1", 603, 0)).await;
    server.put("/session").json(&signed_in_session()).await;
    server.get("/media/603/comments").await;

    let response = server.post("/comments/nope/like").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

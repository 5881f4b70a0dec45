use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use tokio_test::assert_ok;

use prefsync::error::AppError;
use prefsync::models::{
    CommentId, FavoriteItem, FavoriteKey, MediaType, ReactionKind, ReactionMode, Session,
    SessionContext, Severity, User,
};
use prefsync::services::{AdvisoryFeed, HttpRemoteStore, RemoteStore, ResilientInvoker, RetryPolicy};

/// Scripted stand-in for the REST backend
#[derive(Default)]
struct Backend {
    /// Status codes returned by `GET /favorites` before it starts succeeding
    favorites_failures: Mutex<Vec<u16>>,
    favorites_calls: AtomicU32,
    seen_tokens: Mutex<Vec<String>>,
    reactions: Mutex<Vec<String>>,
}

type Shared = Arc<Backend>;

fn record_token(backend: &Backend, headers: &HeaderMap) {
    if let Some(value) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        backend.seen_tokens.lock().unwrap().push(value.to_string());
    }
}

async fn list_favorites(State(backend): State<Shared>, headers: HeaderMap) -> impl IntoResponse {
    record_token(&backend, &headers);
    backend.favorites_calls.fetch_add(1, Ordering::SeqCst);

    let next_failure = {
        let mut failures = backend.favorites_failures.lock().unwrap();
        if failures.is_empty() {
            None
        } else {
            Some(failures.remove(0))
        }
    };
    if let Some(code) = next_failure {
        let status = StatusCode::from_u16(code).unwrap();
        return (status, Json(json!({ "message": "scripted failure" }))).into_response();
    }

    Json(json!([
        { "id": 603, "mediaType": "movie", "title": "The Matrix", "posterPath": "/matrix.jpg" },
        { "id": 603, "mediaType": "tv", "title": "Some Show" }
    ]))
    .into_response()
}

async fn add_favorite(Json(item): Json<serde_json::Value>) -> impl IntoResponse {
    if item["id"] == 550 {
        return (StatusCode::CONFLICT, Json(json!({ "error": "Already in favorites" }))).into_response();
    }
    (StatusCode::CREATED, Json(item)).into_response()
}

async fn remove_favorite(Path((_media_type, id)): Path<(String, i64)>) -> StatusCode {
    if id == 404 {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::NO_CONTENT
    }
}

#[derive(serde::Deserialize)]
struct CommentQuery {
    #[serde(rename = "mediaId")]
    media_id: i64,
}

async fn list_comments(Query(query): Query<CommentQuery>) -> impl IntoResponse {
    if query.media_id == 1 {
        // Wrong shape: likes is not a list
        return Json(json!([{ "_id": "x", "mediaId": 1, "likes": 3 }])).into_response();
    }
    Json(json!([
        {
            "_id": "old", "mediaId": query.media_id, "userId": "u2", "username": "ben",
            "content": "first", "createdAt": "2024-05-01T10:00:00Z", "likes": ["u1"], "dislikes": []
        },
        {
            "_id": "new", "mediaId": query.media_id, "userId": "u3", "username": "cy",
            "content": "second", "createdAt": "2024-05-02T10:00:00Z"
        }
    ]))
    .into_response()
}

async fn apply_reaction(
    State(backend): State<Shared>,
    Path((id, kind)): Path<(String, String)>,
) -> StatusCode {
    backend.reactions.lock().unwrap().push(format!("+{}:{}", kind, id));
    StatusCode::OK
}

async fn withdraw_reaction(
    State(backend): State<Shared>,
    Path((id, kind)): Path<(String, String)>,
) -> StatusCode {
    backend.reactions.lock().unwrap().push(format!("-{}:{}", kind, id));
    StatusCode::NOT_FOUND
}

async fn spawn_backend(backend: Shared) -> String {
    let app = Router::new()
        .route("/api/favorites", get(list_favorites).post(add_favorite))
        .route("/api/favorites/:media_type/:id", delete(remove_favorite))
        .route("/api/comments", get(list_comments))
        .route(
            "/api/comments/:id/reactions/:kind",
            post(apply_reaction).delete(withdraw_reaction),
        )
        .with_state(backend);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api/", address)
}

fn signed_in() -> SessionContext {
    SessionContext::new(Session::authenticated(
        User {
            id: "u1".to_string(),
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
        },
        "token-u1",
    ))
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        timeout: Duration::from_secs(5),
        step: Duration::from_millis(10),
    }
}

async fn create_store(backend: Shared) -> (HttpRemoteStore, Arc<AdvisoryFeed>) {
    let url = spawn_backend(backend).await;
    let advisories = Arc::new(AdvisoryFeed::new());
    let invoker = ResilientInvoker::new(fast_policy(), advisories.clone());
    (HttpRemoteStore::new(url, signed_in(), invoker), advisories)
}

#[tokio::test]
async fn test_list_favorites_sends_bearer_token() {
    let backend = Shared::default();
    let (store, _) = create_store(backend.clone()).await;

    let favorites = store.list_favorites().await.unwrap();
    assert_eq!(favorites.len(), 2);
    assert_eq!(favorites[0].key(), FavoriteKey::new(603, MediaType::Movie));
    assert_eq!(favorites[1].key(), FavoriteKey::new(603, MediaType::Tv));
    assert_eq!(favorites[1].poster_path, None);

    let tokens = backend.seen_tokens.lock().unwrap().clone();
    assert_eq!(tokens, vec!["Bearer token-u1".to_string()]);
}

#[tokio::test]
async fn test_unavailable_backend_is_retried() {
    let backend = Shared::default();
    *backend.favorites_failures.lock().unwrap() = vec![503, 502];
    let (store, advisories) = create_store(backend.clone()).await;

    let favorites = store.list_favorites().await.unwrap();
    assert_eq!(favorites.len(), 2);
    assert_eq!(backend.favorites_calls.load(Ordering::SeqCst), 3);

    let advisories = advisories.drain();
    assert_eq!(advisories.len(), 2);
    assert_eq!(advisories[0].severity, Severity::Warning);
    assert_eq!(advisories[1].severity, Severity::Info);
}

#[tokio::test]
async fn test_rejected_credentials_are_not_retried() {
    let backend = Shared::default();
    *backend.favorites_failures.lock().unwrap() = vec![401];
    let (store, advisories) = create_store(backend.clone()).await;

    let result = store.list_favorites().await;
    assert!(matches!(result, Err(AppError::AuthRejected { status: 401, .. })));
    assert_eq!(backend.favorites_calls.load(Ordering::SeqCst), 1);
    assert!(advisories.drain().is_empty());
}

#[tokio::test]
async fn test_retries_exhausted() {
    let backend = Shared::default();
    *backend.favorites_failures.lock().unwrap() = vec![500, 500, 500, 500, 500];
    let (store, _) = create_store(backend.clone()).await;

    let result = store.list_favorites().await;
    assert!(matches!(result, Err(AppError::ServiceUnavailable { attempts: 4 })));
    assert_eq!(backend.favorites_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_add_conflict_is_reported() {
    let (store, _) = create_store(Shared::default()).await;

    let added = store
        .add_favorite(&FavoriteItem::new(27205, MediaType::Movie, "Inception"))
        .await
        .unwrap();
    assert_eq!(added.title, "Inception");

    let result = store
        .add_favorite(&FavoriteItem::new(550, MediaType::Movie, "Fight Club"))
        .await;
    match result {
        Err(AppError::Conflict(message)) => assert_eq!(message, "Already in favorites"),
        other => panic!("expected conflict, got {:?}", other),
    }
}

#[tokio::test]
async fn test_remove_missing_favorite_succeeds() {
    let (store, _) = create_store(Shared::default()).await;
    assert_ok!(store.remove_favorite(FavoriteKey::new(404, MediaType::Tv)).await);
    assert_ok!(store.remove_favorite(FavoriteKey::new(1, MediaType::Movie)).await);
}

#[tokio::test]
async fn test_comments_newest_first() {
    let (store, _) = create_store(Shared::default()).await;

    let comments = store.list_comments(603).await.unwrap();
    let ids: Vec<&str> = comments.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["new", "old"]);
    assert_eq!(comments[1].likes, vec!["u1".to_string()]);
    assert!(comments[0].likes.is_empty());
}

#[tokio::test]
async fn test_malformed_comments_are_rejected() {
    let (store, _) = create_store(Shared::default()).await;
    let result = store.list_comments(1).await;
    assert!(matches!(result, Err(AppError::Decode(_))));
}

#[tokio::test]
async fn test_reactions_hit_kind_endpoints() {
    let backend = Shared::default();
    let (store, _) = create_store(backend.clone()).await;
    let id = CommentId::new("c1");

    store
        .react(&id, ReactionKind::Like, ReactionMode::Apply)
        .await
        .unwrap();
    // Withdrawing a reaction the server does not have is not an error
    store
        .react(&id, ReactionKind::Dislike, ReactionMode::Withdraw)
        .await
        .unwrap();

    let calls = backend.reactions.lock().unwrap().clone();
    assert_eq!(calls, vec!["+like:c1".to_string(), "-dislike:c1".to_string()]);
}

#[tokio::test]
async fn test_stalled_body_times_out_and_is_retried() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    // Sends headers and the first byte of the body, then goes quiet
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicU32::new(0));
    let counter = connections.clone();
    tokio::spawn(async move {
        loop {
            let (mut socket, _) = listener.accept().await.unwrap();
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n[",
                    )
                    .await;
                tokio::time::sleep(Duration::from_secs(60)).await;
            });
        }
    });

    let policy = RetryPolicy {
        max_retries: 1,
        timeout: Duration::from_millis(200),
        step: Duration::from_millis(10),
    };
    let invoker = ResilientInvoker::new(policy, Arc::new(AdvisoryFeed::new()));
    let store = HttpRemoteStore::new(format!("http://{}/api", address), signed_in(), invoker);

    let result = tokio::time::timeout(Duration::from_secs(3), store.list_favorites())
        .await
        .expect("list_favorites outlived the per-attempt timeout");

    assert!(matches!(result, Err(AppError::ServiceUnavailable { attempts: 2 })));
    assert!(connections.load(Ordering::SeqCst) >= 2);
}

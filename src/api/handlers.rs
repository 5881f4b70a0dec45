use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::request_id::RequestId;
use crate::models::{
    Advisory, Comment, CommentId, FavoriteItem, FavoriteKey, MediaType, Session,
};
use crate::services::{MutationOutcome, SyncMode, ToggleOutcome};

use super::AppState;

// Request/Response types

#[derive(Debug, Serialize, Deserialize)]
pub struct FavoritesResponse {
    pub mode: SyncMode,
    pub degraded: bool,
    pub favorites: Vec<FavoriteItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MutationResponse {
    pub outcome: MutationOutcome,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IsFavoriteResponse {
    pub favorite: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportResponse {
    pub imported: usize,
}

async fn favorites_response(state: &AppState, favorites: Vec<FavoriteItem>) -> FavoritesResponse {
    FavoritesResponse {
        mode: state.inner.favorites.mode().await,
        degraded: state.inner.favorites.is_degraded().await,
        favorites,
    }
}

fn favorite_key(media_type: &str, id: i64) -> AppResult<FavoriteKey> {
    let media_type: MediaType = media_type.parse()?;
    Ok(FavoriteKey::new(id, media_type))
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Install a session issued by the external login flow
pub async fn set_session(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(session): Json<Session>,
) -> Json<FavoritesResponse> {
    let user = session.user.as_ref().map(|u| u.username.clone());
    tracing::info!(
        request_id = %request_id,
        user = ?user,
        authenticated = session.is_authenticated(),
        "Session installed"
    );

    state.inner.session.replace(session).await;
    state.inner.reactions.clear().await;
    let favorites = state.inner.favorites.on_session_changed().await;

    Json(favorites_response(&state, favorites).await)
}

/// Log out: tear down signed-in state and fall back to the local cache
pub async fn clear_session(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> Json<FavoritesResponse> {
    tracing::info!(request_id = %request_id, "Session cleared");

    state.inner.session.replace(Session::guest()).await;
    state.inner.reactions.clear().await;
    let favorites = state.inner.favorites.on_session_changed().await;

    Json(favorites_response(&state, favorites).await)
}

/// Get the current favorites
pub async fn get_favorites(State(state): State<AppState>) -> Json<FavoritesResponse> {
    let favorites = state.inner.favorites.favorites().await;
    Json(favorites_response(&state, favorites).await)
}

/// Add a favorite
pub async fn add_favorite(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(item): Json<FavoriteItem>,
) -> AppResult<(StatusCode, Json<MutationResponse>)> {
    if item.title.trim().is_empty() {
        return Err(crate::error::AppError::InvalidInput(
            "Favorite title cannot be empty".to_string(),
        ));
    }

    let key = item.key();
    let outcome = state.inner.favorites.add_favorite(item).await?;
    tracing::info!(request_id = %request_id, favorite = %key, outcome = ?outcome, "Add favorite");

    let status = match outcome {
        MutationOutcome::Applied => StatusCode::CREATED,
        MutationOutcome::Unchanged => StatusCode::OK,
        MutationOutcome::Coalesced => StatusCode::ACCEPTED,
    };
    Ok((status, Json(MutationResponse { outcome })))
}

/// Remove a favorite
pub async fn remove_favorite(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((media_type, id)): Path<(String, i64)>,
) -> AppResult<Json<MutationResponse>> {
    let key = favorite_key(&media_type, id)?;
    let outcome = state.inner.favorites.remove_favorite(key).await?;
    tracing::info!(request_id = %request_id, favorite = %key, outcome = ?outcome, "Remove favorite");

    Ok(Json(MutationResponse { outcome }))
}

/// Membership check for one title
pub async fn is_favorite(
    State(state): State<AppState>,
    Path((media_type, id)): Path<(String, i64)>,
) -> AppResult<Json<IsFavoriteResponse>> {
    let key = favorite_key(&media_type, id)?;
    Ok(Json(IsFavoriteResponse {
        favorite: state.inner.favorites.is_favorite(&key).await,
    }))
}

/// Push favorites saved on this device into the signed-in account
pub async fn import_favorites(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<Json<ImportResponse>> {
    let imported = state.inner.favorites.import_local_favorites().await?;
    tracing::info!(request_id = %request_id, imported, "Imported local favorites");
    Ok(Json(ImportResponse { imported }))
}

/// Load the comment thread of a title
pub async fn get_comments(
    State(state): State<AppState>,
    Path(media_id): Path<i64>,
) -> AppResult<Json<Vec<Comment>>> {
    let comments = state.inner.reactions.load_comments(media_id).await?;
    Ok(Json(comments))
}

/// Toggle a like on a comment
pub async fn toggle_like(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(comment_id): Path<String>,
) -> AppResult<Json<ToggleOutcome>> {
    let comment_id = CommentId::new(comment_id);
    let outcome = state.inner.reactions.toggle_like(&comment_id).await?;
    tracing::info!(request_id = %request_id, comment = %comment_id, outcome = ?outcome, "Toggle like");
    Ok(Json(outcome))
}

/// Toggle a dislike on a comment
pub async fn toggle_dislike(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(comment_id): Path<String>,
) -> AppResult<Json<ToggleOutcome>> {
    let comment_id = CommentId::new(comment_id);
    let outcome = state.inner.reactions.toggle_dislike(&comment_id).await?;
    tracing::info!(request_id = %request_id, comment = %comment_id, outcome = ?outcome, "Toggle dislike");
    Ok(Json(outcome))
}

/// Hand queued advisories to the UI
pub async fn drain_advisories(State(state): State<AppState>) -> Json<Vec<Advisory>> {
    Json(state.inner.advisories.drain())
}

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;
use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

/// Creates the local API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Session lifecycle
        .route(
            "/session",
            put(handlers::set_session).delete(handlers::clear_session),
        )
        // Favorites
        .route(
            "/favorites",
            get(handlers::get_favorites).post(handlers::add_favorite),
        )
        .route("/favorites/import", post(handlers::import_favorites))
        .route(
            "/favorites/:media_type/:id",
            get(handlers::is_favorite).delete(handlers::remove_favorite),
        )
        // Comments and reactions
        .route("/media/:media_id/comments", get(handlers::get_comments))
        .route("/comments/:comment_id/like", post(handlers::toggle_like))
        .route("/comments/:comment_id/dislike", post(handlers::toggle_dislike))
        // Advisories
        .route("/advisories", get(handlers::drain_advisories))
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

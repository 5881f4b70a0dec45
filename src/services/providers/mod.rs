/// Authoritative preference store abstraction
///
/// The remote store owns a signed-in user's favorites and the comment
/// threads with their reactions. Implementations must keep `add_favorite`,
/// `remove_favorite` and withdraw reactions idempotent; `add_favorite`
/// reports an existing entry as [`AppError::Conflict`].
///
/// [`AppError::Conflict`]: crate::error::AppError::Conflict
use crate::{
    error::AppResult,
    models::{Comment, CommentId, FavoriteItem, FavoriteKey, ReactionKind, ReactionMode},
};

pub mod http;
pub mod memory;

pub use http::HttpRemoteStore;
pub use memory::InMemoryRemoteStore;

/// Typed operations against the authoritative store, on behalf of the current session
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    /// Favorites of the signed-in user, in insertion order
    async fn list_favorites(&self) -> AppResult<Vec<FavoriteItem>>;

    /// Stores a favorite. An existing entry fails with `Conflict`.
    async fn add_favorite(&self, item: &FavoriteItem) -> AppResult<FavoriteItem>;

    /// Removes a favorite. Removing an absent entry succeeds.
    async fn remove_favorite(&self, key: FavoriteKey) -> AppResult<()>;

    /// Comments on a title, newest first
    async fn list_comments(&self, media_id: i64) -> AppResult<Vec<Comment>>;

    /// Applies or withdraws the current user's reaction on a comment
    async fn react(
        &self,
        comment_id: &CommentId,
        kind: ReactionKind,
        mode: ReactionMode,
    ) -> AppResult<()>;

    /// Store name for logging and debugging
    fn name(&self) -> &'static str;
}

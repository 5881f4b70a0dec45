use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{
        sort_newest_first, Comment, CommentId, FavoriteItem, FavoriteKey, FavoritesCollection,
        ReactionKind, ReactionMode, SessionContext,
    },
    services::providers::RemoteStore,
};

#[derive(Default)]
struct Collections {
    favorites: HashMap<String, FavoritesCollection>,
    comments: Vec<Comment>,
}

/// In-process stand-in for the remote store.
///
/// Behaves like the REST backend: favorites are per user, duplicate adds
/// conflict, removes and withdrawals are idempotent, and reactions are
/// stored as given without cross-clearing the opposite kind.
pub struct InMemoryRemoteStore {
    session: SessionContext,
    collections: RwLock<Collections>,
    offline: AtomicBool,
}

impl InMemoryRemoteStore {
    pub fn new(session: SessionContext) -> Self {
        Self {
            session,
            collections: RwLock::new(Collections::default()),
            offline: AtomicBool::new(false),
        }
    }

    /// While offline every operation fails as if retries were exhausted
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub async fn insert_comment(&self, comment: Comment) {
        self.collections.write().await.comments.push(comment);
    }

    pub async fn comment(&self, comment_id: &CommentId) -> Option<Comment> {
        self.collections
            .read()
            .await
            .comments
            .iter()
            .find(|c| c.id == *comment_id)
            .cloned()
    }

    pub async fn favorites_of(&self, user_id: &str) -> Vec<FavoriteItem> {
        self.collections
            .read()
            .await
            .favorites
            .get(user_id)
            .map(|f| f.as_slice().to_vec())
            .unwrap_or_default()
    }

    async fn current_user(&self) -> AppResult<String> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::ServiceUnavailable { attempts: 1 });
        }
        let session = self.session.snapshot().await;
        session
            .credentials()
            .map(|(user, _)| user.id.clone())
            .ok_or(AppError::Unauthorized)
    }
}

#[async_trait::async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn list_favorites(&self) -> AppResult<Vec<FavoriteItem>> {
        let user_id = self.current_user().await?;
        Ok(self.favorites_of(&user_id).await)
    }

    async fn add_favorite(&self, item: &FavoriteItem) -> AppResult<FavoriteItem> {
        let user_id = self.current_user().await?;
        let mut collections = self.collections.write().await;
        let favorites = collections.favorites.entry(user_id).or_default();
        if !favorites.insert(item.clone()) {
            return Err(AppError::Conflict(format!("{} already in favorites", item.key())));
        }
        Ok(item.clone())
    }

    async fn remove_favorite(&self, key: FavoriteKey) -> AppResult<()> {
        let user_id = self.current_user().await?;
        let mut collections = self.collections.write().await;
        if let Some(favorites) = collections.favorites.get_mut(&user_id) {
            favorites.remove(&key);
        }
        Ok(())
    }

    async fn list_comments(&self, media_id: i64) -> AppResult<Vec<Comment>> {
        self.current_user().await?;
        let mut comments: Vec<Comment> = self
            .collections
            .read()
            .await
            .comments
            .iter()
            .filter(|c| c.media_id == media_id)
            .cloned()
            .collect();
        sort_newest_first(&mut comments);
        Ok(comments)
    }

    async fn react(
        &self,
        comment_id: &CommentId,
        kind: ReactionKind,
        mode: ReactionMode,
    ) -> AppResult<()> {
        let user_id = self.current_user().await?;
        let mut collections = self.collections.write().await;
        let comment = collections
            .comments
            .iter_mut()
            .find(|c| c.id == *comment_id)
            .ok_or_else(|| AppError::NotFound(format!("comment {}", comment_id)))?;

        let set = match kind {
            ReactionKind::Like => &mut comment.likes,
            ReactionKind::Dislike => &mut comment.dislikes,
        };
        match mode {
            ReactionMode::Apply => {
                if !set.contains(&user_id) {
                    set.push(user_id);
                }
            }
            ReactionMode::Withdraw => set.retain(|u| *u != user_id),
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

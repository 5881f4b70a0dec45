use std::sync::Arc;

use crate::db::LocalCache;
use crate::models::SessionContext;
use crate::services::{
    AdvisoryFeed, FavoritesSynchronizer, ReactionController, RemoteStore,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<AppStateInner>,
}

/// Components behind the local surface
pub struct AppStateInner {
    pub session: SessionContext,
    pub favorites: FavoritesSynchronizer,
    pub reactions: ReactionController,
    pub advisories: Arc<AdvisoryFeed>,
}

impl AppState {
    /// Wires the synchronizer and the reaction controller to one session,
    /// one remote store and one advisory feed
    pub fn new(
        session: SessionContext,
        cache: LocalCache,
        remote: Arc<dyn RemoteStore>,
        advisories: Arc<AdvisoryFeed>,
    ) -> Self {
        let favorites = FavoritesSynchronizer::new(
            session.clone(),
            cache,
            remote.clone(),
            advisories.clone(),
        );
        let reactions = ReactionController::new(session.clone(), remote, advisories.clone());

        Self {
            inner: Arc::new(AppStateInner {
                session,
                favorites,
                reactions,
                advisories,
            }),
        }
    }
}

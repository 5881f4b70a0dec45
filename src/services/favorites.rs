//! Favorites synchronization
//!
//! One consistent favorites list backed by either the local cache (guest)
//! or the remote store (signed in). The session decides which backing is
//! read; the two are never merged implicitly. Mutations are optimistic and
//! rolled back when the backing rejects them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    db::LocalCache,
    error::{AppError, AppResult},
    models::{Advisory, FavoriteItem, FavoriteKey, FavoritesCollection, SessionContext},
    services::{inflight::InFlight, notifier::Notifier, providers::RemoteStore},
};

const SIGN_IN_HINT: &str = "Saved on this device. Sign in to sync favorites across devices.";

/// Which backing is authoritative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    Guest,
    Authenticated,
}

/// Result of a favorites mutation that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationOutcome {
    /// Persisted by the active backing
    Applied,
    /// Already in the requested state, nothing sent
    Unchanged,
    /// A mutation on the same favorite is still in flight; this one was dropped
    Coalesced,
}

/// Optimistic change made while a remote read was outstanding
#[derive(Debug, Clone)]
enum Change {
    Added(FavoriteItem),
    Removed(FavoriteKey),
}

struct SyncState {
    mode: SyncMode,
    favorites: FavoritesCollection,
    inflight: InFlight<FavoriteKey>,
    degraded: bool,
    /// Bumped on every backing switch; reads started under an older value are dropped
    generation: u64,
    pending_reads: u32,
    journal: Vec<Change>,
}

impl SyncState {
    fn record(&mut self, change: Change) {
        if self.pending_reads > 0 {
            self.journal.push(change);
        }
    }

    /// Replaces the list with a fresh read and replays what changed meanwhile
    fn apply_read(&mut self, mut favorites: FavoritesCollection) {
        for change in &self.journal {
            match change {
                Change::Added(item) => {
                    favorites.insert(item.clone());
                }
                Change::Removed(key) => {
                    favorites.remove(key);
                }
            }
        }
        self.favorites = favorites;
    }

    fn finish_read(&mut self) {
        self.pending_reads = self.pending_reads.saturating_sub(1);
        if self.pending_reads == 0 {
            self.journal.clear();
        }
    }
}

pub struct FavoritesSynchronizer {
    session: SessionContext,
    cache: LocalCache,
    remote: Arc<dyn RemoteStore>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<SyncState>,
}

impl FavoritesSynchronizer {
    /// Creates a synchronizer with an empty list. Call [`Self::refresh`] to load it.
    pub fn new(
        session: SessionContext,
        cache: LocalCache,
        remote: Arc<dyn RemoteStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            session,
            cache,
            remote,
            notifier,
            state: Mutex::new(SyncState {
                mode: SyncMode::Guest,
                favorites: FavoritesCollection::new(),
                inflight: InFlight::new(),
                degraded: false,
                generation: 0,
                pending_reads: 0,
                journal: Vec::new(),
            }),
        }
    }

    async fn current_mode(&self) -> SyncMode {
        if self.session.snapshot().await.is_authenticated() {
            SyncMode::Authenticated
        } else {
            SyncMode::Guest
        }
    }

    /// Makes `mode` the active backing. Outstanding remote responses and
    /// reads become stale. The guest list comes straight from the cache; the
    /// signed-in list starts empty until the remote read lands.
    async fn switch_backing(&self, state: &mut SyncState, mode: SyncMode) {
        tracing::info!(from = ?state.mode, to = ?mode, "Favorites backing switched");
        state.mode = mode;
        state.generation += 1;
        state.inflight.reset();
        state.degraded = false;
        state.pending_reads = 0;
        state.journal.clear();
        state.favorites = match mode {
            SyncMode::Guest => self.cache.load().await,
            SyncMode::Authenticated => FavoritesCollection::new(),
        };
    }

    /// Locks the state with its backing matching the current session
    async fn lock_for_session(&self) -> tokio::sync::MutexGuard<'_, SyncState> {
        let mode = self.current_mode().await;
        let mut state = self.state.lock().await;
        if state.mode != mode {
            self.switch_backing(&mut state, mode).await;
        }
        state
    }

    /// Reloads the list from the backing selected by the current session.
    ///
    /// A signed-in read that fails falls back to the local cache and marks
    /// the synchronizer degraded instead of failing.
    pub async fn refresh(&self) -> Vec<FavoriteItem> {
        let mut state = self.lock_for_session().await;
        if state.mode == SyncMode::Guest {
            // Guest writes also happen under the lock, so this read is current
            state.favorites = self.cache.load().await;
            state.degraded = false;
            tracing::debug!(count = state.favorites.len(), "Favorites loaded from local cache");
            return state.favorites.as_slice().to_vec();
        }

        let generation = state.generation;
        if state.pending_reads == 0 {
            state.journal.clear();
        }
        state.pending_reads += 1;
        drop(state);

        let (favorites, degraded) = match self.remote.list_favorites().await {
            Ok(items) => (FavoritesCollection::from(items), false),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    store = self.remote.name(),
                    "Remote favorites unavailable, falling back to local cache"
                );
                self.notifier.notify(Advisory::warning(
                    "Could not reach your account. Showing favorites saved on this device.",
                ));
                (self.cache.load().await, true)
            }
        };

        let mut state = self.state.lock().await;
        if state.generation != generation {
            tracing::debug!("Discarding favorites read from a previous session");
            return state.favorites.as_slice().to_vec();
        }
        state.apply_read(favorites);
        state.finish_read();
        state.degraded = degraded;

        tracing::debug!(count = state.favorites.len(), "Favorites loaded from remote store");
        state.favorites.as_slice().to_vec()
    }

    /// Session start, login or logout. The backing switches before anything
    /// is read, and outstanding remote responses from the previous session
    /// are discarded.
    pub async fn on_session_changed(&self) -> Vec<FavoriteItem> {
        let mode = self.current_mode().await;
        {
            let mut state = self.state.lock().await;
            // Also covers one account replacing another
            self.switch_backing(&mut state, mode).await;
        }
        self.refresh().await
    }

    pub async fn mode(&self) -> SyncMode {
        self.state.lock().await.mode
    }

    /// Whether the last signed-in read fell back to the local cache
    pub async fn is_degraded(&self) -> bool {
        self.state.lock().await.degraded
    }

    pub async fn favorites(&self) -> Vec<FavoriteItem> {
        self.state.lock().await.favorites.as_slice().to_vec()
    }

    pub async fn is_favorite(&self, key: &FavoriteKey) -> bool {
        self.state.lock().await.favorites.contains(key)
    }

    pub async fn add_favorite(&self, item: FavoriteItem) -> AppResult<MutationOutcome> {
        let key = item.key();
        let mut state = self.lock_for_session().await;

        if state.mode == SyncMode::Guest {
            if !state.favorites.insert(item) {
                drop(state);
                self.notifier.notify(Advisory::info(SIGN_IN_HINT));
                return Ok(MutationOutcome::Unchanged);
            }
            // Local writes complete under the lock so the cache always
            // matches the in-memory list.
            if let Err(e) = self.cache.save(&state.favorites).await {
                state.favorites.remove(&key);
                drop(state);
                return Err(self.report_failure("add to favorites", e));
            }
            drop(state);
            self.notifier.notify(Advisory::info(SIGN_IN_HINT));
            return Ok(MutationOutcome::Applied);
        }

        if state.favorites.contains(&key) {
            return Ok(MutationOutcome::Unchanged);
        }

        let Some(ticket) = state.inflight.try_begin(key) else {
            tracing::debug!(favorite = %key, "Add coalesced with in-flight mutation");
            return Ok(MutationOutcome::Coalesced);
        };
        state.favorites.insert(item.clone());
        state.record(Change::Added(item.clone()));
        drop(state);

        let result = match self.remote.add_favorite(&item).await {
            Ok(_) => Ok(()),
            Err(AppError::Conflict(_)) => {
                tracing::debug!(favorite = %key, "Favorite already stored remotely");
                Ok(())
            }
            Err(e) => Err(e),
        };

        let mut state = self.state.lock().await;
        let current = state.inflight.is_current(&ticket);
        state.inflight.finish(&ticket);

        match result {
            Ok(()) => {
                drop(state);
                self.notifier
                    .notify(Advisory::success(format!("Added \"{}\" to favorites", item.title)));
                Ok(MutationOutcome::Applied)
            }
            Err(e) => {
                if current {
                    state.favorites.remove(&key);
                    state.record(Change::Removed(key));
                } else {
                    tracing::debug!(favorite = %key, "Discarding stale add failure");
                }
                drop(state);
                Err(self.report_failure("add to favorites", e))
            }
        }
    }

    pub async fn remove_favorite(&self, key: FavoriteKey) -> AppResult<MutationOutcome> {
        let mut state = self.lock_for_session().await;

        if state.mode == SyncMode::Guest {
            let Some((index, item)) = state.favorites.remove(&key) else {
                drop(state);
                self.notifier.notify(Advisory::info(SIGN_IN_HINT));
                return Ok(MutationOutcome::Unchanged);
            };
            if let Err(e) = self.cache.save(&state.favorites).await {
                state.favorites.restore(index, item);
                drop(state);
                return Err(self.report_failure("remove from favorites", e));
            }
            drop(state);
            self.notifier.notify(Advisory::info(SIGN_IN_HINT));
            return Ok(MutationOutcome::Applied);
        }

        if !state.favorites.contains(&key) {
            return Ok(MutationOutcome::Unchanged);
        }

        let Some(ticket) = state.inflight.try_begin(key) else {
            tracing::debug!(favorite = %key, "Remove coalesced with in-flight mutation");
            return Ok(MutationOutcome::Coalesced);
        };
        let Some((index, item)) = state.favorites.remove(&key) else {
            state.inflight.finish(&ticket);
            return Ok(MutationOutcome::Unchanged);
        };
        state.record(Change::Removed(key));
        drop(state);

        let result = self.remote.remove_favorite(key).await;

        let mut state = self.state.lock().await;
        let current = state.inflight.is_current(&ticket);
        state.inflight.finish(&ticket);

        match result {
            Ok(()) => {
                drop(state);
                self.notifier.notify(Advisory::success(format!(
                    "Removed \"{}\" from favorites",
                    item.title
                )));
                Ok(MutationOutcome::Applied)
            }
            Err(e) => {
                if current {
                    state.record(Change::Added(item.clone()));
                    state.favorites.restore(index, item);
                } else {
                    tracing::debug!(favorite = %key, "Discarding stale remove failure");
                }
                drop(state);
                Err(self.report_failure("remove from favorites", e))
            }
        }
    }

    /// Favorites stored on this device that the signed-in list lacks
    pub async fn local_only_favorites(&self) -> Vec<FavoriteItem> {
        let local = self.cache.load().await;
        let state = self.lock_for_session().await;
        if state.mode == SyncMode::Guest {
            return Vec::new();
        }
        local
            .iter()
            .filter(|item| !state.favorites.contains(&item.key()))
            .cloned()
            .collect()
    }

    /// Pushes local-only favorites to the signed-in account. Never runs on its own.
    ///
    /// Returns how many were added. Stops at the first failure, leaving the
    /// items added so far in place.
    pub async fn import_local_favorites(&self) -> AppResult<usize> {
        if self.current_mode().await != SyncMode::Authenticated {
            return Err(AppError::Unauthorized);
        }

        let pending = self.local_only_favorites().await;
        let mut imported = 0;
        for item in pending {
            if self.add_favorite(item).await? == MutationOutcome::Applied {
                imported += 1;
            }
        }

        tracing::info!(imported, "Local favorites imported into account");
        Ok(imported)
    }

    fn report_failure(&self, action: &str, error: AppError) -> AppError {
        tracing::warn!(action, error = %error, "Favorites mutation rolled back");
        let message = match &error {
            AppError::Unauthorized | AppError::AuthRejected { .. } => {
                format!("Could not {}: please log in again.", action)
            }
            other => format!("Could not {}: {}", action, other),
        };
        self.notifier.notify(Advisory::error(message));
        error
    }
}

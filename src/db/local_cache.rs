use std::sync::Arc;

use crate::db::storage::{PreferenceStorage, StorageKey};
use crate::error::{AppError, AppResult};
use crate::models::{FavoriteItem, FavoritesCollection};

/// Favorites kept on this device for guest sessions.
///
/// Stored as one JSON array under a fixed key. Saves replace the whole entry.
#[derive(Clone)]
pub struct LocalCache {
    storage: Arc<dyn PreferenceStorage>,
}

impl LocalCache {
    pub fn new(storage: Arc<dyn PreferenceStorage>) -> Self {
        Self { storage }
    }

    /// Loads the stored favorites. Missing or unreadable data yields an empty collection.
    pub async fn load(&self) -> FavoritesCollection {
        let raw = match self.storage.get(StorageKey::Favorites).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return FavoritesCollection::new(),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    backend = self.storage.name(),
                    "Local favorites unreadable, starting empty"
                );
                return FavoritesCollection::new();
            }
        };

        match serde_json::from_str::<Vec<FavoriteItem>>(&raw) {
            Ok(items) => FavoritesCollection::from(items),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    backend = self.storage.name(),
                    "Local favorites corrupt, starting empty"
                );
                FavoritesCollection::new()
            }
        }
    }

    pub async fn save(&self, favorites: &FavoritesCollection) -> AppResult<()> {
        let json = serde_json::to_string(favorites)
            .map_err(|e| AppError::Internal(format!("Favorites serialization error: {}", e)))?;
        self.storage.set(StorageKey::Favorites, json).await?;

        tracing::debug!(
            count = favorites.len(),
            backend = self.storage.name(),
            "Local favorites saved"
        );
        Ok(())
    }
}

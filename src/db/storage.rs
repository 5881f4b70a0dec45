use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};

use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};

/// Named entries kept in durable local storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    Favorites,
}

impl Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageKey::Favorites => write!(f, "favorites"),
        }
    }
}

/// Durable string key-value store scoped to this device
#[async_trait::async_trait]
pub trait PreferenceStorage: Send + Sync {
    async fn get(&self, key: StorageKey) -> AppResult<Option<String>>;

    /// Replaces the whole entry
    async fn set(&self, key: StorageKey, value: String) -> AppResult<()>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// One JSON file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: StorageKey) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait::async_trait]
impl PreferenceStorage for FileStorage {
    async fn get(&self, key: StorageKey) -> AppResult<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Storage(format!("Failed to read {}: {}", key, e))),
        }
    }

    async fn set(&self, key: StorageKey, value: String) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to create {:?}: {}", self.dir, e)))?;

        // Write then rename so a crash never leaves a half-written entry
        let target = self.path_for(key);
        let staging = self.dir.join(format!("{}.json.tmp", key));
        tokio::fs::write(&staging, value)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write {}: {}", key, e)))?;
        tokio::fs::rename(&staging, &target)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to replace {}: {}", key, e)))?;

        tracing::debug!(key = %key, path = ?target, "Local entry written");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// Process-local storage, used in tests and ephemeral runs
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<StorageKey, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl PreferenceStorage for MemoryStorage {
    async fn get(&self, key: StorageKey) -> AppResult<Option<String>> {
        Ok(self.entries.read().await.get(&key).cloned())
    }

    async fn set(&self, key: StorageKey, value: String) -> AppResult<()> {
        self.entries.write().await.insert(key, value);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

use ::redis::AsyncCommands;
use ::redis::Client;

use crate::db::storage::{PreferenceStorage, StorageKey};
use crate::error::AppResult;

const KEY_PREFIX: &str = "prefsync";

/// Creates a Redis client for local preference storage
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Preference storage backed by a Redis instance on this device.
///
/// Entries are plain string values without expiry.
#[derive(Clone)]
pub struct RedisStorage {
    redis_client: Client,
}

impl RedisStorage {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }

    fn redis_key(key: StorageKey) -> String {
        format!("{}:{}", KEY_PREFIX, key)
    }
}

#[async_trait::async_trait]
impl PreferenceStorage for RedisStorage {
    async fn get(&self, key: StorageKey) -> AppResult<Option<String>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(Self::redis_key(key)).await.map_err(|e| {
            tracing::warn!(error = %e, "Redis get failed");
            e
        })?;
        Ok(value)
    }

    async fn set(&self, key: StorageKey, value: String) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.set(Self::redis_key(key), value).await.map_err(|e| {
            tracing::warn!(error = %e, "Redis set failed");
            e
        })?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_key_is_namespaced() {
        assert_eq!(
            RedisStorage::redis_key(StorageKey::Favorites),
            "prefsync:favorites"
        );
    }

    // Needs a running Redis; run with `--ignored` and REDIS_URL set
    #[tokio::test]
    #[ignore]
    async fn test_set_then_get_roundtrip() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let client = create_redis_client(&redis_url).unwrap();
        let storage = RedisStorage::new(client.clone());

        storage
            .set(StorageKey::Favorites, r#"[{"id":1}]"#.to_string())
            .await
            .unwrap();
        let value = storage.get(StorageKey::Favorites).await.unwrap();
        assert_eq!(value, Some(r#"[{"id":1}]"#.to_string()));

        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn
            .del(RedisStorage::redis_key(StorageKey::Favorites))
            .await
            .unwrap();
    }
}

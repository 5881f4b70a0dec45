pub mod local_cache;
pub mod redis;
pub mod storage;

pub use self::local_cache::LocalCache;
pub use self::redis::create_redis_client;
pub use self::redis::RedisStorage;
pub use self::storage::{FileStorage, MemoryStorage, PreferenceStorage, StorageKey};

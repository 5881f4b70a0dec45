use serde::Deserialize;
use std::time::Duration;

use crate::services::RetryPolicy;

/// Backend URL that selects the in-process remote store
pub const IN_MEMORY_BACKEND: &str = "memory://";

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Base URL of the authoritative preference store
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Directory for the local favorites file
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// Redis URL; when set, local favorites live in Redis instead of a file
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Local API host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Local API port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound for a single remote call
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Retries while the backend is unavailable
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Wait before retry `n` is `n * retry_step_ms`
    #[serde(default = "default_retry_step_ms")]
    pub retry_step_ms: u64,
}

fn default_backend_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_cache_dir() -> String {
    ".prefsync".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_request_timeout_ms() -> u64 {
    15_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_step_ms() -> u64 {
    2_000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_iter(std::env::vars())
    }

    /// Load configuration from explicit key/value pairs
    pub fn from_iter<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Config>(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

        if config.request_timeout_ms == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_MS must be greater than zero");
        }
        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            timeout: Duration::from_millis(self.request_timeout_ms),
            step: Duration::from_millis(self.retry_step_ms),
        }
    }

    pub fn uses_in_memory_backend(&self) -> bool {
        self.backend_url == IN_MEMORY_BACKEND
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

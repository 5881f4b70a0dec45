use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use prefsync::api::{create_router, AppState};
use prefsync::config::Config;
use prefsync::db::{create_redis_client, FileStorage, LocalCache, PreferenceStorage, RedisStorage};
use prefsync::models::SessionContext;
use prefsync::services::{
    AdvisoryFeed, HttpRemoteStore, InMemoryRemoteStore, RemoteStore, ResilientInvoker,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("prefsync=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let storage: Arc<dyn PreferenceStorage> = match &config.redis_url {
        Some(redis_url) => Arc::new(RedisStorage::new(create_redis_client(redis_url)?)),
        None => Arc::new(FileStorage::new(&config.cache_dir)),
    };
    tracing::info!(backend = storage.name(), "Local preference storage ready");

    let session = SessionContext::default();
    let advisories = Arc::new(AdvisoryFeed::new());

    let remote: Arc<dyn RemoteStore> = if config.uses_in_memory_backend() {
        Arc::new(InMemoryRemoteStore::new(session.clone()))
    } else {
        let invoker = ResilientInvoker::new(config.retry_policy(), advisories.clone());
        Arc::new(HttpRemoteStore::new(
            config.backend_url.clone(),
            session.clone(),
            invoker,
        ))
    };
    tracing::info!(store = remote.name(), url = %config.backend_url, "Remote preference store configured");

    let state = AppState::new(session, LocalCache::new(storage), remote, advisories);
    state.inner.favorites.refresh().await;

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!(address = %config.bind_address(), "Preference sync service listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}

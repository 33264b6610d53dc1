use anyhow::Context;
use nihongo_review::api::{app_router, ApiState};
use nihongo_review::cache::TtlCache;
use nihongo_review::catalog::{CachedCatalog, StaticCatalog};
use nihongo_review::config::Config;
use nihongo_review::db::SqliteStore;
use nihongo_review::{ReviewScheduler, SyncStore};
use std::sync::Arc;
use tower_http::services::ServeDir;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    log::debug!("{:?}", config);

    let local = SqliteStore::connect(&config.database_url)
        .await
        .with_context(|| format!("opening progress database {}", config.database_url))?;

    // An unreachable mirror only disables syncing.
    let remote = match &config.remote_database_url {
        Some(url) => match SqliteStore::connect(url).await {
            Ok(remote) => Some(remote),
            Err(e) => {
                log::warn!("remote progress store {} unavailable, running local only: {}", url, e);
                None
            }
        },
        None => None,
    };
    let store = SyncStore::new(local, remote);

    let catalog = CachedCatalog::new(StaticCatalog::n5(), TtlCache::new(config.cache_max_age));
    let state = ApiState {
        scheduler: Arc::new(ReviewScheduler::new(store)),
        catalog: Arc::new(catalog),
        batch_size: config.batch_size,
    };

    let mut app = app_router(state);
    if let Some(dir) = &config.static_dir {
        log::info!("serving static files from {}", dir.display());
        app = app.fallback_service(ServeDir::new(dir));
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    log::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

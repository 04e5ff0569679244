mod api;
mod middleware;
mod runs;
mod scheduler;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use stocksync_feed::FeedCache;
use stocksync_updater::{EngineSettings, SyncEngine};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
    scheduler::SyncSchedule,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(stocksync_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = stocksync_db::PoolConfig::from_app_config(&config);
    let pool = stocksync_db::connect_pool(&config.database_url, pool_config).await?;
    stocksync_db::run_migrations(&pool).await?;

    let feed = Arc::new(FeedCache::from_config(&config)?);
    let catalog = Arc::new(stocksync_db::PgCatalog::new(pool.clone()));
    let engine = Arc::new(SyncEngine::new(
        catalog,
        feed,
        EngineSettings::from_config(&config),
    ));

    let schedule = SyncSchedule::new(
        pool.clone(),
        Arc::clone(&engine),
        config.sync_interval_minutes,
    )
    .await?;
    schedule.schedule().await?;

    let auth = AuthState::from_env(matches!(
        config.env,
        stocksync_core::Environment::Development
    ))?;
    let app = build_app(AppState { pool, engine }, auth, default_rate_limit_state());

    tracing::info!(bind_addr = %config.bind_addr, "stocksync-server listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    schedule.shutdown().await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}

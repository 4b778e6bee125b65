use anyhow::Context;
use bestmove_api::{api, Config, EnginePool};
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bestmove_api=info,tower_http=info")),
        )
        .init();

    let config = Config::parse();
    let settings = config.engine_settings();
    tracing::info!(
        "[ENGINE] pool size {}, {:?}, timeout {:?}",
        settings.pool_size,
        settings.limit,
        config.timeout()
    );

    let pool = Arc::new(EnginePool::new(settings));
    // Warm-up failures are not fatal; requests will report the engine as unavailable
    match tokio::time::timeout(config.timeout(), pool.warm_up(config.warm_sessions)).await {
        Ok(Ok(idle)) => tracing::info!("[ENGINE] {} session(s) ready", idle),
        Ok(Err(e)) => tracing::error!("[ENGINE] Warm-up failed: {}", e),
        Err(_) => tracing::error!("[ENGINE] Warm-up timed out after {:?}", config.timeout()),
    }

    let app = api::router(api::AppState::new(pool.clone(), config.timeout()));

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!("API listening on {}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    pool.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

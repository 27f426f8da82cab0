use anyhow::Context;
use axum::routing::get;
use axum_prometheus::PrometheusMetricLayerBuilder;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;

use vibetrack_api::{
    build_router,
    config::Config,
    db::{self, PgVibeRepository},
    middleware::rate_limit::SWEEP_INTERVAL,
    services::{cache::MemoryCache, VibeService},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    let log_level = Config::log_level_from_env();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("vibetrack_api={log_level},tower_http={log_level}").into()
            }),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env());
    tracing::info!(env = ?config.app_env, "Configuration loaded");

    // Database
    let pool = db::create_pool(&config.database_url, config.db_max_connections)
        .await
        .context("Failed to create database pool")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations applied");

    let mut vibes = VibeService::new(Arc::new(PgVibeRepository::new(pool)))
        .with_top_activities(config.stats_top_activities);

    if config.cache_enabled {
        let cache = MemoryCache::new();
        spawn_cache_purger(cache.clone(), config.cache_ttl());
        vibes = vibes.with_cache(Arc::new(cache), config.cache_ttl());
        tracing::info!(ttl_secs = config.cache_ttl_secs, "Response cache enabled");
    } else {
        tracing::info!("Response cache disabled");
    }

    let state = AppState::new(vibes, config.clone());
    state.rate_limiter.spawn_sweeper(SWEEP_INTERVAL);

    let (prometheus_layer, metric_handle) = PrometheusMetricLayerBuilder::new()
        .with_prefix("vibetrack")
        .with_default_metrics()
        .build_pair();

    let app = build_router(state)
        .route("/metrics", get(move || async move { metric_handle.render() }))
        .layer(prometheus_layer);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    // Client IPs feed the rate limiter
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

fn spawn_cache_purger(cache: MemoryCache, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every.max(Duration::from_secs(1)));
        loop {
            ticker.tick().await;
            let purged = cache.purge_expired().await;
            if purged > 0 {
                tracing::debug!(purged, "Purged expired cache entries");
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}

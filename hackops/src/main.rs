//! HackOps HTTP server.
//!
//! Baggage check-in/out and organizer statistics for a hackathon.

use anyhow::Context;
use hackops::aggregates::BaggageEnvironment;
use hackops::app::BaggageService;
use hackops::config::{Config, StorageBackend};
use hackops::metrics::register_metrics;
use hackops::notifications::{LogNotifier, SlackNotifier};
use hackops::runtime::EffectRunner;
use hackops::server::{build_router, AppState, Features};
use hackops::stats::{StatsReporter, TtlCache};
use hackops::stores::{
    BaggageStore, InMemoryBaggageStore, InMemoryStatsSource, PostgresBaggageStore,
    PostgresStatsSource, StatsSource,
};
use hackops_core::environment::{Clock, SystemClock};
use hackops_core::notify::Notifier;
use metrics_exporter_prometheus::PrometheusBuilder;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hackops=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting HackOps server");

    let config = Config::from_env();
    info!(
        storage = ?config.storage,
        room_order = ?config.baggage.room_order,
        stats_cache_ttl = config.stats.cache_ttl,
        "Configuration loaded"
    );

    // Metrics
    let metrics_addr: SocketAddr = format!("{}:{}", config.server.host, config.server.metrics_port)
        .parse()
        .context("Invalid metrics address")?;
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .context("Failed to install Prometheus exporter")?;
    register_metrics();
    info!(address = %metrics_addr, "Prometheus exporter listening");

    // Record stores
    let (baggage_store, stats_source) = connect_stores(&config).await?;

    // Notifications
    let notifier: Arc<dyn Notifier> = match &config.notifications.slack_webhook_url {
        Some(url) => {
            info!("Owner notifications go to Slack");
            Arc::new(
                SlackNotifier::new(url.clone(), config.notifications.slack_channel.clone())
                    .context("Failed to build Slack notifier")?,
            )
        },
        None => {
            info!("No Slack webhook configured, owner notifications are only logged");
            Arc::new(LogNotifier)
        },
    };

    // Services
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let effects = EffectRunner::new();
    let baggage = Arc::new(BaggageService::new(
        Arc::clone(&baggage_store),
        BaggageEnvironment::new(Arc::clone(&clock), notifier),
        effects.clone(),
        config.baggage.room_order.clone(),
    ));
    let stats = Arc::new(StatsReporter::new(
        stats_source,
        baggage_store,
        Arc::clone(&clock),
        config.stats.min_group_size,
    ));
    let cache_ttl = i64::try_from(config.stats.cache_ttl)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or_else(chrono::Duration::zero);
    let stats_cache = Arc::new(TtlCache::new(cache_ttl, clock));

    let app = build_router(
        AppState::new(baggage, stats, stats_cache),
        Features {
            baggage: config.baggage.enabled,
            reimbursement_stats: config.stats.reimbursement_enabled,
        },
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!(in_flight = effects.in_flight(), "Server stopped, flushing notifications");
    effects
        .drain(Duration::from_secs(config.server.shutdown_timeout))
        .await;

    info!("Shutdown complete");
    Ok(())
}

async fn connect_stores(
    config: &Config,
) -> anyhow::Result<(Arc<dyn BaggageStore>, Arc<dyn StatsSource>)> {
    match config.storage {
        StorageBackend::Memory => {
            warn!("Using in-memory storage; records are lost on restart and rooms must be created through PUT /api/rooms/:room");
            Ok((
                Arc::new(InMemoryBaggageStore::new()),
                Arc::new(InMemoryStatsSource::new()),
            ))
        },
        StorageBackend::Postgres => {
            info!("Connecting to PostgreSQL...");
            let pool = PgPoolOptions::new()
                .max_connections(config.postgres.max_connections)
                .min_connections(config.postgres.min_connections)
                .acquire_timeout(Duration::from_secs(config.postgres.connect_timeout))
                .idle_timeout(Some(Duration::from_secs(config.postgres.idle_timeout)))
                .connect(&config.postgres.url)
                .await
                .context("Failed to connect to PostgreSQL")?;
            let pool = Arc::new(pool);
            info!("PostgreSQL connected");

            let store = PostgresBaggageStore::new(Arc::clone(&pool));
            if config.postgres.run_migrations {
                store.migrate().await.context("Failed to run migrations")?;
                info!("Migrations applied");
            }

            Ok((Arc::new(store), Arc::new(PostgresStatsSource::new(pool))))
        },
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}

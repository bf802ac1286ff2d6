mod api;
mod config;
mod db;
mod error;
mod fetcher;
mod payout;
mod syncer;
mod types;
mod usecases;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::watch;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::middleware::request_logging;
use crate::api::routes::{router, ApiState};
use crate::config::{Config, SHUTDOWN_DEADLINE_SECS};
use crate::db::{SqliteBetStore, SqliteEventStore};
use crate::error::Result;
use crate::fetcher::HttpEventSourceClient;
use crate::payout::HttpPayoutClient;
use crate::syncer::EventSyncer;
use crate::usecases::{BetUseCase, EventUseCase};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let options = SqliteConnectOptions::new()
        .filename(&cfg.db_path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database ready at {}", cfg.db_path);

    // --- Stores and external clients ---
    let event_store = Arc::new(SqliteEventStore::new(pool.clone()));
    let bet_store = Arc::new(SqliteBetStore::new(pool.clone()));
    let payout_client = Arc::new(HttpPayoutClient::new(
        &cfg.payout_url,
        Duration::from_secs(cfg.payout_timeout_secs),
    )?);
    let source_client = Arc::new(HttpEventSourceClient::new(
        &cfg.event_source_url,
        Duration::from_secs(cfg.event_source_timeout_secs),
    )?);

    // --- Use cases ---
    let event_uc = Arc::new(EventUseCase::new(
        event_store.clone(),
        bet_store.clone(),
        payout_client,
    ));
    let bet_uc = Arc::new(BetUseCase::new(bet_store, event_store.clone()));

    // --- Event syncer (background, first cycle immediately) ---
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let event_syncer = EventSyncer::new(
        source_client,
        event_store,
        event_uc.clone(),
        bet_uc.clone(),
        Duration::from_secs(cfg.sync_interval_secs),
    );
    let syncer_handle = tokio::spawn(event_syncer.run(shutdown_rx));

    // --- HTTP API server ---
    let state = ApiState {
        pool: pool.clone(),
        events: event_uc,
        bets: bet_uc,
    };
    let app = router(state)
        .layer(TimeoutLayer::new(Duration::from_secs(cfg.http_timeout_secs)))
        .layer(CatchPanicLayer::new())
        .layer(axum::middleware::from_fn(request_logging));

    let bind_addr = format!("0.0.0.0:{}", cfg.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // --- Drain ---
    info!("HTTP server stopped, draining background workers");
    let _ = shutdown_tx.send(true);
    if tokio::time::timeout(Duration::from_secs(SHUTDOWN_DEADLINE_SECS), syncer_handle)
        .await
        .is_err()
    {
        warn!("event syncer did not stop within the shutdown deadline");
    }

    pool.close().await;
    info!("Shut down gracefully");
    Ok(())
}

/// Completes when SIGINT or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

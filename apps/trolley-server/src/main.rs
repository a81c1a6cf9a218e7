mod api;
mod config;
mod error;
mod extract;
mod handlers;
mod metrics;
mod server;

#[cfg(test)]
mod tests;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use trolley_core::Core;
use trolley_events::EventBus;
use trolley_events_memory::MemoryEventBus;
use trolley_identity::{IdentityProvider, KdfCost, PasswordIdentityProvider};
use trolley_store_sqlite::SqliteStore;

use config::ServerConfig;
use server::{api_router, health_router, AppState, ReadinessCheck};

// ────────────────────────────────────── CLI Types ──────────────────────────────────────

#[derive(Parser)]
#[command(name = "trolley-server")]
#[command(about = "Trolley server CLI for administration and serving")]
struct Cli {
    /// Database URL (sqlite://path/to/trolley.db or sqlite::memory:)
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve {
        /// API server address
        #[arg(long, default_value = "0.0.0.0:3001")]
        addr: String,

        /// Health check and metrics HTTP server address
        #[arg(long, default_value = "0.0.0.0:8080")]
        health_addr: String,
    },
    /// Create or upgrade the database schema, then exit
    Migrate,
}

fn database_url(database_url: Option<String>) -> String {
    database_url.unwrap_or_else(|| "sqlite://trolley.db".to_string())
}

// ────────────────────────────────────── Serve ──────────────────────────────────────

async fn cmd_migrate(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    SqliteStore::open(db_url).await?;
    tracing::info!(database = %db_url, "database schema is up to date");
    Ok(())
}

async fn cmd_serve(
    db_url: &str,
    addr: &str,
    health_addr: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;
    let metrics = crate::metrics::init_metrics()?;
    cmd_serve_with_ready(db_url, addr, health_addr, config, metrics, None).await
}

async fn cmd_serve_with_ready(
    db_url: &str,
    addr: &str,
    health_addr: &str,
    config: ServerConfig,
    metrics: metrics_exporter_prometheus::PrometheusHandle,
    ready_tx: Option<tokio::sync::oneshot::Sender<(SocketAddr, SocketAddr)>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = addr.parse()?;
    let health_addr: SocketAddr = health_addr.parse()?;

    let store = Arc::new(SqliteStore::open(db_url).await?);
    let events: Arc<dyn EventBus> = Arc::new(MemoryEventBus::new());
    // Credentials live next to profiles so accounts survive restarts.
    let identity: Arc<dyn IdentityProvider> = Arc::new(PasswordIdentityProvider::new(
        store.clone(),
        KdfCost::interactive(),
    ));
    let core = Arc::new(Core::new(
        store.clone(),
        events,
        store.clone(),
        config.core_config(),
    ));

    let app = api_router(AppState::new(core, identity));

    // /healthz always answers; /readyz once listeners are bound and the
    // database responds, and again false once shutdown starts.
    let (readiness_tx, readiness_rx) = tokio::sync::watch::channel(false);
    let health = health_router(
        ReadinessCheck::new(readiness_rx).with_store(store),
        metrics,
    );

    let api_listener = tokio::net::TcpListener::bind(addr).await?;
    let api_actual_addr = api_listener.local_addr()?;

    let health_listener = tokio::net::TcpListener::bind(health_addr).await?;
    let health_actual_addr = health_listener.local_addr()?;

    tracing::info!(addr = %api_actual_addr, origin = %config.public_origin, "trolley API listening");
    tracing::info!(addr = %health_actual_addr, "health checks listening");

    let _ = readiness_tx.send(true);

    if let Some(tx) = ready_tx {
        let _ = tx.send((api_actual_addr, health_actual_addr));
    }

    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);
    let shutdown_tx_clone = shutdown_tx.clone();

    tokio::spawn(async move {
        shutdown_signal(Some(readiness_tx)).await;
        let _ = shutdown_tx_clone.send(());
    });

    let mut shutdown_rx1 = shutdown_tx.subscribe();
    let health_server =
        axum::serve(health_listener, health).with_graceful_shutdown(async move {
            let _ = shutdown_rx1.recv().await;
        });

    let mut shutdown_rx2 = shutdown_tx.subscribe();
    let api_server = axum::serve(api_listener, app).with_graceful_shutdown(async move {
        let _ = shutdown_rx2.recv().await;
    });

    let (api_result, health_result) = tokio::join!(api_server, health_server);

    api_result?;
    health_result?;

    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal(readiness_tx: Option<tokio::sync::watch::Sender<bool>>) {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(error = %e, "failed to install signal handlers");
            std::future::pending::<()>().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("received SIGTERM, shutting down gracefully");
        }
        _ = sigint.recv() => {
            tracing::info!("received SIGINT, shutting down gracefully");
        }
    }

    // Stop advertising readiness so load balancers drain us first.
    if let Some(tx) = readiness_tx {
        let _ = tx.send(false);
    }
}

// ────────────────────────────────────── Main ──────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let db_url = database_url(cli.database_url);

    match cli.command {
        Command::Serve { addr, health_addr } => {
            cmd_serve(&db_url, &addr, &health_addr).await?;
        }
        Command::Migrate => {
            cmd_migrate(&db_url).await?;
        }
    }

    Ok(())
}

// ────────────────────────────────────── Tests ──────────────────────────────────────

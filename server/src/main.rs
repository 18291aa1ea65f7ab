//! Campus ledger HTTP server.
//!
//! Reads configuration from the environment (and a `.env` file when one is
//! present), selects the store, and serves the API until Ctrl+C or SIGTERM.

mod config;

use anyhow::Context;
use campus_ledger_core::environment::SystemClock;
use campus_ledger_core::{LedgerStore, Principal};
use campus_ledger_postgres::PostgresLedgerStore;
use campus_ledger_runtime::metrics::MetricsServer;
use campus_ledger_runtime::{EventLedger, InMemoryLedgerStore};
use campus_ledger_web::{AppState, SessionDirectory, build_router};
use config::{Config, StoreKind};
use sqlx::postgres::PgPoolOptions;
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_new(&config.server.log_level)
                .unwrap_or_else(|_| "info,campus_ledger=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    config.validate().context("Invalid configuration")?;
    info!(
        store = %config.ledger.store,
        host = %config.server.host,
        port = config.server.port,
        "Starting campus ledger server"
    );

    let mut metrics = MetricsServer::new(config.server.metrics_address()?);
    metrics.start().context("Failed to start metrics exporter")?;

    let store = build_store(&config).await?;
    let ledger = EventLedger::new(store, Arc::new(SystemClock)).with_policy(config.ledger.policy());

    if let Some(name) = &config.ledger.seed_default_college {
        seed_default_college(&ledger, name).await?;
    }

    let admin_token = match config.ledger.admin_token()? {
        Some(token) => token,
        None => {
            let token = Uuid::new_v4();
            warn!(
                admin_token = %token,
                "LEDGER_ADMIN_TOKEN not set, generated a bootstrap admin token for this process"
            );
            token
        }
    };
    let sessions = Arc::new(SessionDirectory::with_admin_token(admin_token));

    let app = build_router(AppState::new(ledger, sessions));

    let addr = config.server.bind_address()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "HTTP server listening");

    let shutdown_timeout = config.server.shutdown_timeout();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => result.context("HTTP server failed")?,
        () = async {
            shutdown_signal().await;
            tokio::time::sleep(shutdown_timeout).await;
        } => {
            warn!(
                timeout_secs = shutdown_timeout.as_secs(),
                "Shutdown timeout elapsed, dropping open connections"
            );
        }
    }

    info!("Server stopped");
    Ok(())
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn LedgerStore>> {
    match config.ledger.store_kind()? {
        StoreKind::Memory => {
            warn!("Using the in-memory store; data is lost on restart");
            Ok(Arc::new(InMemoryLedgerStore::new()))
        }
        StoreKind::Postgres => {
            info!(
                max_connections = config.postgres.max_connections,
                "Connecting to PostgreSQL"
            );
            let pool = PgPoolOptions::new()
                .max_connections(config.postgres.max_connections)
                .min_connections(config.postgres.min_connections)
                .acquire_timeout(config.postgres.connect_timeout())
                .connect(&config.postgres.url)
                .await
                .context("Failed to connect to PostgreSQL")?;

            let store = PostgresLedgerStore::from_pool(pool);
            store.migrate().await.context("Failed to run migrations")?;
            info!("PostgreSQL store ready");
            Ok(Arc::new(store))
        }
    }
}

async fn seed_default_college(ledger: &EventLedger, name: &str) -> anyhow::Result<()> {
    if ledger.list_colleges().await?.is_empty() {
        let college = ledger.create_college(&Principal::admin(), name).await?;
        info!(college_id = %college.id, name = %college.name, "Seeded default college");
    }
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
///
/// If a handler cannot be installed that branch never resolves, leaving the
/// other signal in charge.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
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

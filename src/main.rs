use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bistro_api::config::{AppConfig, StoreBackend};
use bistro_api::database::{MemoryStore, MongoStore, Store};
use bistro_api::payments::StripeClient;
use bistro_api::services::SettlementService;
use bistro_api::state::AppState;

/// Bistro Boss ordering backend.
#[derive(Parser, Debug)]
#[command(name = "bistro-api", version, about)]
struct Args {
    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Serve from an in-process store instead of MongoDB
    #[arg(long)]
    memory_store: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DB_USER, ACCESS_TOKEN_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bistro_api=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();
    let mut config = AppConfig::from_env();
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if args.memory_store {
        config.database.backend = StoreBackend::Memory;
    }
    config.validate()?;
    tracing::info!("Starting Bistro API in {:?} mode", config.environment);

    let store: Arc<dyn Store> = match config.database.backend {
        StoreBackend::Mongo => Arc::new(
            MongoStore::connect(&config.database)
                .await
                .context("failed to connect to MongoDB")?,
        ),
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };
    let processor = Arc::new(StripeClient::new(&config.payments)?);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let reconcile_every = config.settlement.reconcile_interval_secs;
    let state = AppState::new(config, store.clone(), processor);

    // Nothing is in flight before the listener binds.
    if let Err(e) = state.settlement.reconcile_pending(chrono::Duration::zero()).await {
        tracing::error!("Startup reconciliation failed: {}", e);
    }
    let reconciler = (reconcile_every > 0)
        .then(|| tokio::spawn(reconcile_loop(state.settlement.clone(), Duration::from_secs(reconcile_every))));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Server Running on {}", bind_addr);

    axum::serve(listener, bistro_api::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(handle) = reconciler {
        handle.abort();
    }
    store.shutdown().await;
    Ok(())
}

async fn reconcile_loop(settlement: SettlementService, every: Duration) {
    // Records younger than one interval may belong to a capture still running.
    let grace = chrono::Duration::from_std(every).unwrap_or_else(|_| chrono::Duration::zero());
    let mut ticker = tokio::time::interval(every);
    // The first tick completes immediately; startup already reconciled.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        if let Err(e) = settlement.reconcile_pending(grace).await {
            tracing::error!("Reconciliation sweep failed: {}", e);
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

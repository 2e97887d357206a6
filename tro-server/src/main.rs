//! Ticket Reservation & Ordering Server
//!
//! Sells seats for events with at-most-one buyer per seat: holds, orders,
//! payment settlement, a transactional outbox and a hold expirer, all in
//! one process.

mod api;
mod config;
mod observability;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::AppConfig;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tro_core::broker::EventPublisher;
use tro_core::cache::{self, IdempotencyStore, SeatLockCache};
use tro_core::catalog::CatalogReader;
use tro_core::framework::DatabaseProcessor;
use tro_core::processors::{ExpiryWorker, OutboxPublisher};
use server::{build_router, run_server};
use state::AppState;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How long workers get to drain after the server stops.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Ticket reservations & orders - transactional seat sales service
#[derive(Parser, Debug)]
#[command(name = "tro-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Override the listen address (e.g., 0.0.0.0:8080)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,

    /// Serve the HTTP API only, without the outbox publisher and expiry worker
    #[arg(long, default_value = "false")]
    no_workers: bool,
}

/// Handles for the spawned background processors.
struct Workers {
    /// Shutdown signal sender -- set to `true` to stop all processors.
    shutdown_tx: watch::Sender<bool>,
    /// Join handles for all spawned processor tasks.
    join_handles: Vec<JoinHandle<()>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting tro-server v{}", env!("CARGO_PKG_VERSION"));

    let mut config = AppConfig::load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if config.callback_secret.is_none() {
        tracing::warn!("CALLBACK_SECRET not set, payment callbacks are unauthenticated");
    }
    if let Some(endpoint) = &config.otlp_endpoint {
        tracing::info!(endpoint = %endpoint, "Trace export endpoint configured");
    }
    let config = Arc::new(config);

    // -- Stores ------------------------------------------------------------
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.crdb_dsn)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&db_pool).await?;
        tracing::info!("Migrations completed successfully");
    }

    let redis_conn = cache::connect(&config.redis_addr).await.map_err(|e| {
        tracing::error!("Failed to connect to redis: {}", e);
        anyhow::anyhow!(e)
    })?;
    let seat_locks = SeatLockCache::new(redis_conn.clone());
    let idempotency = IdempotencyStore::new(redis_conn);

    let catalog = CatalogReader::connect(&config.mongo_uri).await.map_err(|e| {
        tracing::error!("Failed to connect to catalog: {}", e);
        anyhow::anyhow!(e)
    })?;

    let publisher = EventPublisher::connect(&config.rabbit_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to broker: {}", e);
            anyhow::anyhow!(e)
        })?;

    let metrics_handle = observability::init_metrics()?;

    // -- Background processors ---------------------------------------------
    let workers = if args.no_workers {
        tracing::info!("Background processors disabled (--no-workers)");
        let (shutdown_tx, _shutdown_rx) = watch::channel(false);
        Workers {
            shutdown_tx,
            join_handles: Vec::new(),
        }
    } else {
        spawn_workers(&db_pool, seat_locks.clone(), publisher)
    };

    // -- HTTP server -------------------------------------------------------
    let state = AppState::new(
        db_pool.clone(),
        seat_locks,
        idempotency,
        catalog,
        config.clone(),
    );
    let router = build_router(state, metrics_handle);

    tracing::info!("Starting HTTP server on {}", config.listen);
    let result = run_server(router, config.listen).await;

    // --- Graceful shutdown sequence ---

    // 1. Signal all processors to stop
    tracing::info!("Signaling processors to shut down...");
    let _ = workers.shutdown_tx.send(true);

    // 2. Wait for processors to drain, bounded by the grace period
    for handle in workers.join_handles {
        if tokio::time::timeout(SHUTDOWN_GRACE, handle).await.is_err() {
            tracing::warn!("Processor did not drain within the grace period");
        }
    }
    tracing::info!("All processors shut down");

    // 3. Close database connections gracefully
    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Spawn the outbox publisher and expiry worker.
fn spawn_workers(
    db_pool: &PgPool,
    seat_locks: SeatLockCache,
    publisher: EventPublisher,
) -> Workers {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut join_handles = Vec::new();

    let outbox = OutboxPublisher::new(
        DatabaseProcessor {
            pool: db_pool.clone(),
        },
        publisher,
    );
    let outbox_shutdown_rx = shutdown_rx.clone();
    join_handles.push(tokio::spawn(async move {
        outbox.run(outbox_shutdown_rx).await;
    }));

    let expiry = ExpiryWorker::new(
        DatabaseProcessor {
            pool: db_pool.clone(),
        },
        seat_locks,
    );
    join_handles.push(tokio::spawn(async move {
        expiry.run(shutdown_rx).await;
    }));

    tracing::info!(workers = join_handles.len(), "Spawned background processors");

    Workers {
        shutdown_tx,
        join_handles,
    }
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,lapin=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

//! Preboard Server
//!
//! Takes paid reservations from prospective founders before they have an
//! account, and lets them claim the reservation once they sign up.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::{ConfigLoader, get_database_url};
use preboard_core::events::reservation_event_channel;
use preboard_core::framework::DatabaseProcessor;
use preboard_core::processors::{ConfirmationMailer, ExpirySweeper};
use preboard_core::services::{ClaimService, InitiationService, TransitionService};
use preboard_core::store::ReservationStore;
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Preboard - pre-onboarding payment reservations
#[derive(Parser, Debug)]
#[command(name = "preboard-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./preboard-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting preboard-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let listen_addr = loaded_config.server.listen;
    tracing::info!("Configuration loaded from {:?}", args.config);

    // Outbound adapters are fixed for the process lifetime
    let gateway = loaded_config.payment_gateway();
    let converter = loaded_config.currency_converter();
    let notifier = loaded_config.email_notifier();

    let shared_config = loaded_config.into_shared();

    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;

    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    let store: Arc<dyn ReservationStore> = Arc::new(DatabaseProcessor::new(db_pool.clone()));
    let (events_tx, events_rx) = reservation_event_channel();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Background processors
    let mailer = ConfirmationMailer::new(
        store.clone(),
        notifier,
        shared_config.mailer.clone(),
        shared_config.frontend.clone(),
    );
    let mailer_handle = tokio::spawn(mailer.run(shutdown_rx.clone(), events_rx));

    let sweeper = ExpirySweeper::new(store.clone());
    let sweeper_handle = tokio::spawn(sweeper.run(
        shutdown_rx,
        shared_config.sweeper.clone(),
        shared_config.sweeper.subscribe(),
    ));

    let state = AppState::new(
        store.clone(),
        InitiationService::new(
            store.clone(),
            gateway,
            converter,
            shared_config.checkout.clone(),
        ),
        TransitionService::new(store.clone(), events_tx),
        ClaimService::new(store),
        shared_config,
    );

    // Spawn config reload handler (listens for SIGHUP)
    let reload_shutdown = spawn_config_reload_handler(state.clone(), config_loader);

    let router = build_router(state);

    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    // Stop background work before the pool goes away
    let _ = shutdown_tx.send(true);
    reload_shutdown.notify_one();
    if let Err(e) = mailer_handle.await {
        tracing::error!("ConfirmationMailer task failed: {}", e);
    }
    if let Err(e) = sweeper_handle.await {
        tracing::error!("ExpirySweeper task failed: {}", e);
    }

    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

//! lifeboat dispatch service.
//!
//! Converts the current ranking into capacity-bounded work assignments for
//! rescuer nodes and reconciles their reported outcomes back into the
//! catalog.

use anyhow::Result;
use lifeboat_catalog::Database;
use lifeboat_dispatch::{
    allocator::AllocationEngine,
    api,
    cache::RankingCache,
    config,
    ranking_client::RankingClient,
    reconciler::{CatalogReconciler, RescueLog, RescueReconciler},
    state::AppState,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = config::Config::from_env()?;

    // Initialize tracing (prefer RUST_LOG, fallback to DISPATCH_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting lifeboat dispatch service");
    info!(
        listen_addr = %config.listen_addr,
        ranking_base_url = %config.ranking_base_url,
        "Configuration loaded"
    );

    // Connect to the catalog
    let db = match Database::connect(&config.database).await {
        Ok(db) => {
            info!("Database connection established");
            db
        }
        Err(e) => {
            error!(error = %e, "Failed to connect to database");
            return Err(e.into());
        }
    };

    // Run migrations in dev mode
    if config.dev_mode {
        info!("Running database migrations (dev mode)");
        if let Err(e) = db.run_migrations().await {
            error!(error = %e, "Failed to run migrations");
            return Err(e.into());
        }
    }

    let client = RankingClient::new(&config.ranking_base_url)?;
    let cache = RankingCache::new(&config.cache_path);
    let allocator = AllocationEngine::new(client, cache, db.pool().clone());

    let reconciler = match &config.rescue_log_path {
        Some(path) => {
            info!(path = %path.display(), "Using file-backed rescue log");
            RescueReconciler::Log(RescueLog::new(path))
        }
        None => RescueReconciler::Catalog(CatalogReconciler::new(db.pool().clone())),
    };

    // Create application state
    let state = AppState::new(db, allocator, reconciler);

    // Build and run the server
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening for connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await?;

    info!("Dispatch service shutdown complete");
    Ok(())
}

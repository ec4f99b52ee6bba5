//! Ranking background worker.
//!
//! Refreshes derived resource types and recomputes ranks on a periodic
//! interval, independent of request traffic.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::watch;
use tracing::{error, info, instrument};

use super::RankingEngine;

/// Worker that runs the rank recompute loop.
pub struct RankingWorker {
    engine: Arc<RankingEngine>,
    pool: PgPool,
    interval: Duration,
}

impl RankingWorker {
    /// Create a new ranking worker.
    pub fn new(engine: Arc<RankingEngine>, pool: PgPool, interval: Duration) -> Self {
        Self {
            engine,
            pool,
            interval,
        }
    }

    /// Run the worker until shutdown is signaled.
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Starting ranking worker"
        );

        let mut interval = tokio::time::interval(self.interval);
        // Don't immediately tick on startup - wait for first interval
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.run_recompute().await {
                        error!(error = %e, "Rank recompute failed");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Ranking worker shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Run a single recompute pass.
    async fn run_recompute(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let refresh = lifeboat_catalog::resource_types::refresh(&self.pool).await?;
        let records = self.engine.recompute(Utc::now()).await?;

        if refresh.resources_updated > 0 || !records.is_empty() {
            info!(
                resources_reclassified = refresh.resources_updated,
                ranks_emitted = records.len(),
                "Rank recompute complete"
            );
        }

        Ok(())
    }
}

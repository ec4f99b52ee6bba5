//! Allocation engine: converts a ranked list and a space budget into a
//! concrete multi-asset assignment.

mod packing;

use lifeboat_model::RankedAsset;
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::cache::RankingCache;
use crate::ranking_client::RankingClient;

pub use packing::{allocated_size_mb, pack, MAX_UNKNOWN_SIZE_ASSETS};

/// Result type for allocation operations.
pub type AllocationResult<T> = Result<T, AllocationError>;

/// Errors that can occur while allocating.
#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A recorded assignment of assets to one node.
#[derive(Debug, Clone)]
pub struct Allocation {
    pub node_id: String,
    pub allocation_id: Uuid,
    pub allocated_size_mb: f64,
    pub assets: Vec<RankedAsset>,
}

/// The allocation engine.
pub struct AllocationEngine {
    client: RankingClient,
    cache: RankingCache,
    pool: PgPool,
}

impl AllocationEngine {
    /// Create a new allocation engine.
    pub fn new(client: RankingClient, cache: RankingCache, pool: PgPool) -> Self {
        Self {
            client,
            cache,
            pool,
        }
    }

    /// The ranked assets currently available for allocation.
    ///
    /// Prefers a live call to the ranking service and refreshes the local
    /// cache write-through on success. On any client failure the last
    /// successfully cached list is served instead; with no cache either,
    /// the result is an empty list rather than an error.
    #[instrument(skip(self))]
    pub async fn get_available_assets(&self) -> Vec<RankedAsset> {
        match self.client.get_ranking().await {
            Ok(assets) => {
                if let Err(e) = self.cache.store(&assets).await {
                    warn!(error = %e, "Failed to refresh ranking cache");
                }
                assets
            }
            Err(e) => {
                warn!(error = %e, "Ranking service unavailable, falling back to cache");
                match self.cache.load().await {
                    Ok(cached) => cached,
                    Err(cache_err) => {
                        info!(error = %cache_err, "No usable ranking cache, serving empty list");
                        Vec::new()
                    }
                }
            }
        }
    }

    /// Pack the available assets into the offered space and record the
    /// assignment.
    ///
    /// Returns `None` when nothing fits, a defined empty-result condition
    /// rather than an error. The allocation log is append-only: repeated
    /// calls are safe to retry but may assign the same asset to several
    /// nodes, a tolerated race in this domain.
    #[instrument(skip(self))]
    pub async fn allocate_assets(
        &self,
        free_space_mb: f64,
        node_id: Option<String>,
    ) -> AllocationResult<Option<Allocation>> {
        let available = self.get_available_assets().await;
        let selected = pack(&available, free_space_mb);

        if selected.is_empty() {
            info!(
                available = available.len(),
                free_space_mb, "No asset fits the offered space"
            );
            return Ok(None);
        }

        let node_id = node_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let allocation_id = Uuid::new_v4();

        for asset in &selected {
            sqlx::query(
                r#"
                INSERT INTO allocations (allocation_id, node_id, asset_id, size_mb, priority)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(allocation_id)
            .bind(&node_id)
            .bind(asset.asset_id)
            .bind(asset.size_mb)
            .bind(asset.priority)
            .execute(&self.pool)
            .await?;
        }

        let allocated = allocated_size_mb(&selected);
        info!(
            node_id = %node_id,
            allocation_id = %allocation_id,
            assets = selected.len(),
            allocated_size_mb = allocated,
            "Assets allocated"
        );

        Ok(Some(Allocation {
            node_id,
            allocation_id,
            allocated_size_mb: allocated,
            assets: selected,
        }))
    }

    /// Release an allocated asset: mark its active allocation rows aborted.
    ///
    /// Unknown (asset, node) pairs are a no-op, so the call is idempotent.
    #[instrument(skip(self))]
    pub async fn release_assets(&self, asset_id: i64, node_id: &str) -> AllocationResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE allocations
            SET status = 'aborted', released_at = now()
            WHERE asset_id = $1 AND node_id = $2 AND status = 'allocated'
            "#,
        )
        .bind(asset_id)
        .bind(node_id)
        .execute(&self.pool)
        .await?;

        let released = result.rows_affected();
        info!(asset_id, node_id, released, "Assets released");
        Ok(released)
    }

    /// Number of active (non-aborted) allocation rows.
    pub async fn active_allocation_count(&self) -> AllocationResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM allocations WHERE status = 'allocated'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Number of entries in the local ranking cache, if readable.
    pub async fn cached_asset_count(&self) -> usize {
        self.cache.load().await.map(|c| c.len()).unwrap_or(0)
    }
}

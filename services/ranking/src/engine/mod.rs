//! Ranking engine: turns raw catalog state into an ordered worklist.
//!
//! Rank assignment itself is a pure computation over a snapshot (see
//! [`compute`]); this module owns the snapshot load, the append of changed
//! rank rows, and the ranked-asset page query served to the dispatch
//! service.

pub mod compute;
mod worker;

use chrono::{DateTime, Utc};
use lifeboat_model::RankedAsset;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, instrument};

pub use compute::{CompletionPolicy, DatasetSnapshot, LocatorCompletion, NewRankRecord};
pub use worker::RankingWorker;

/// Ranked-asset page size served per query.
const PAGE_SIZE: i64 = 100;

/// Result type for ranking operations.
pub type RankingResult<T> = Result<T, RankingError>;

/// Errors that can occur while ranking.
#[derive(Debug, thiserror::Error)]
pub enum RankingError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A rank row as persisted, echoed back from the recompute endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PersistedRankRecord {
    pub id: i64,
    pub dataset_id: i64,
    pub ranking_id: String,
    pub event_count: i64,
    pub db_rank: Option<i32>,
    pub rank: i32,
    pub updated: DateTime<Utc>,
}

/// The ranking engine.
pub struct RankingEngine {
    pool: PgPool,
    completion: Box<dyn CompletionPolicy>,
}

impl RankingEngine {
    /// Create an engine with the default locator-based completion rule.
    pub fn new(pool: PgPool) -> Self {
        Self::with_completion_policy(pool, Box::new(LocatorCompletion))
    }

    /// Create an engine with a custom completion rule.
    pub fn with_completion_policy(pool: PgPool, completion: Box<dyn CompletionPolicy>) -> Self {
        Self { pool, completion }
    }

    /// Run one recompute pass: snapshot the catalog, assign ranks, append
    /// the changed rows in one transaction, and return them.
    #[instrument(skip(self))]
    pub async fn recompute(&self, now: DateTime<Utc>) -> RankingResult<Vec<PersistedRankRecord>> {
        let snapshot = self.load_snapshot().await?;
        let records = compute::compute_rank(&snapshot, now);

        if records.is_empty() {
            debug!(datasets = snapshot.len(), "No rank changes");
            return Ok(Vec::new());
        }

        self.persist_ranks(&records).await
    }

    /// Capture per-dataset completion, popularity, and current rank.
    pub async fn load_snapshot(&self) -> RankingResult<Vec<DatasetSnapshot>> {
        let stats = sqlx::query_as::<_, DatasetStatsRow>(
            r#"
            SELECT d.id AS dataset_id,
                   COUNT(r.id) AS resource_count,
                   COUNT(r.id) FILTER (WHERE rescued.resource_id IS NOT NULL) AS rescued_resource_count,
                   COUNT(r.id) FILTER (WHERE linked.resource_id IS NULL) AS assetless_resource_count
            FROM datasets d
            LEFT JOIN resources r ON r.dataset_id = d.id
            LEFT JOIN (
                SELECT DISTINCT resource_id FROM resource_assets
            ) linked ON linked.resource_id = r.id
            LEFT JOIN (
                SELECT DISTINCT ra.resource_id
                FROM resource_assets ra
                JOIN rescues rc ON rc.asset_id = ra.asset_id
                WHERE rc.locator IS NOT NULL
            ) rescued ON rescued.resource_id = r.id
            GROUP BY d.id
            ORDER BY d.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let current = sqlx::query_as::<_, CurrentRankRow>(
            r#"
            SELECT DISTINCT ON (dataset_id) dataset_id, rank, event_count
            FROM dataset_ranks
            ORDER BY dataset_id, updated_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let current_by_dataset: std::collections::HashMap<i64, (i32, i64)> = current
            .into_iter()
            .map(|row| (row.dataset_id, (row.rank, row.event_count)))
            .collect();

        let gaps: i64 = stats.iter().map(|s| s.assetless_resource_count).sum();
        if gaps > 0 {
            debug!(assetless_resources = gaps, "Resources without assets excluded from popularity");
        }

        Ok(stats
            .into_iter()
            .map(|row| {
                let (rank, event_count) = match current_by_dataset.get(&row.dataset_id) {
                    Some(&(rank, events)) => (Some(rank), events),
                    None => (None, 0),
                };
                DatasetSnapshot {
                    dataset_id: row.dataset_id,
                    completed: self
                        .completion
                        .is_complete(row.resource_count, row.rescued_resource_count),
                    event_count,
                    current_rank: rank,
                }
            })
            .collect())
    }

    /// Append new rank rows atomically so concurrent readers observe either
    /// the prior ranking or the full new one, never a partial batch.
    async fn persist_ranks(
        &self,
        records: &[NewRankRecord],
    ) -> RankingResult<Vec<PersistedRankRecord>> {
        let mut tx = self.pool.begin().await?;
        let mut persisted = Vec::with_capacity(records.len());

        for record in records {
            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO dataset_ranks (dataset_id, ranking_id, event_count, rank, updated_at)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id
                "#,
            )
            .bind(record.dataset_id)
            .bind(&record.ranking_id)
            .bind(record.event_count)
            .bind(record.rank)
            .bind(record.updated_at)
            .fetch_one(&mut *tx)
            .await?;

            persisted.push(PersistedRankRecord {
                id,
                dataset_id: record.dataset_id,
                ranking_id: record.ranking_id.clone(),
                event_count: record.event_count,
                db_rank: record.db_rank,
                rank: record.rank,
                updated: record.updated_at,
            });
        }

        tx.commit().await?;
        Ok(persisted)
    }

    /// Serve the current best ranking, most urgent first.
    ///
    /// Assets whose resource has no successful rescue yet come first; when
    /// fewer than a full page exist, already-rescued assets fill the
    /// remainder in the same order, so a full page is attempted whenever any
    /// ranked data exists.
    #[instrument(skip(self))]
    pub async fn get_rank(&self) -> RankingResult<Vec<RankedAsset>> {
        let rows = sqlx::query_as::<_, RankedAssetRow>(
            r#"
            WITH current_ranks AS (
                SELECT DISTINCT ON (dataset_id) dataset_id, rank
                FROM dataset_ranks
                ORDER BY dataset_id, updated_at DESC, id DESC
            )
            SELECT r.dg_description AS path,
                   r.dg_name AS name,
                   cr.rank AS priority,
                   a.size_mb,
                   d.dg_id AS ds_id,
                   r.dg_id AS res_id,
                   a.id AS asset_id,
                   COALESCE(rescue.locator, r.dg_url, a.url) AS url
            FROM assets a
            JOIN resource_assets ra ON ra.asset_id = a.id
            JOIN resources r ON r.id = ra.resource_id
            JOIN datasets d ON d.id = r.dataset_id
            JOIN current_ranks cr ON cr.dataset_id = d.id
            LEFT JOIN LATERAL (
                SELECT locator
                FROM rescues
                WHERE asset_id = a.id AND status = 'success' AND locator IS NOT NULL
                ORDER BY updated_at DESC
                LIMIT 1
            ) rescue ON TRUE
            ORDER BY EXISTS (
                       SELECT 1
                       FROM resource_assets ra2
                       JOIN rescues rc2 ON rc2.asset_id = ra2.asset_id
                       WHERE ra2.resource_id = r.id AND rc2.status = 'success'
                   ) ASC,
                   cr.rank ASC,
                   a.id ASC
            LIMIT $1
            "#,
        )
        .bind(PAGE_SIZE)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RankedAsset::from).collect())
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(Debug)]
struct DatasetStatsRow {
    dataset_id: i64,
    resource_count: i64,
    rescued_resource_count: i64,
    assetless_resource_count: i64,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for DatasetStatsRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Self {
            dataset_id: row.try_get("dataset_id")?,
            resource_count: row.try_get("resource_count")?,
            rescued_resource_count: row.try_get("rescued_resource_count")?,
            assetless_resource_count: row.try_get("assetless_resource_count")?,
        })
    }
}

#[derive(Debug)]
struct CurrentRankRow {
    dataset_id: i64,
    rank: i32,
    event_count: i64,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for CurrentRankRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Self {
            dataset_id: row.try_get("dataset_id")?,
            rank: row.try_get("rank")?,
            event_count: row.try_get("event_count")?,
        })
    }
}

#[derive(Debug)]
struct RankedAssetRow {
    path: String,
    name: String,
    priority: i32,
    size_mb: Option<f64>,
    ds_id: String,
    res_id: String,
    asset_id: i64,
    url: Option<String>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for RankedAssetRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Self {
            path: row.try_get("path")?,
            name: row.try_get("name")?,
            priority: row.try_get("priority")?,
            size_mb: row.try_get("size_mb")?,
            ds_id: row.try_get("ds_id")?,
            res_id: row.try_get("res_id")?,
            asset_id: row.try_get("asset_id")?,
            url: row.try_get("url")?,
        })
    }
}

impl From<RankedAssetRow> for RankedAsset {
    fn from(row: RankedAssetRow) -> Self {
        Self {
            path: row.path,
            name: row.name,
            priority: row.priority,
            size_mb: row.size_mb,
            ds_id: row.ds_id,
            res_id: row.res_id,
            asset_id: row.asset_id,
            url: row.url.unwrap_or_default(),
        }
    }
}

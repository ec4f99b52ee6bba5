//! Rescue outcome reconciliation.
//!
//! Validates outcome reports against the catalog and upserts them into the
//! rescue log: one row per (asset, rescuer), re-reports update locator and
//! status in place. A JSON-file-backed variant ([`log::RescueLog`]) covers
//! deployments without the catalog store; both variants share
//! [`partition_reports`] so they agree on the updated/inserted split for
//! the same input.

pub mod log;

use std::collections::{HashMap, HashSet};

use lifeboat_model::ReportedAsset;
use sqlx::PgPool;
use tracing::{instrument, warn};

pub use log::RescueLog;

/// Result type for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Errors that can occur while reconciling rescue outcomes.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The reporting rescuer is not in the catalog.
    #[error("unknown rescuer {0}")]
    UnknownRescuer(i64),

    /// A reported asset id is not in the catalog.
    #[error("unknown asset {0}")]
    UnknownAsset(i64),

    /// A reported URL does not match the catalog record for that asset,
    /// which guards against stale or tampered client state.
    #[error("asset {asset_id} URL does not match the catalog record")]
    UrlMismatch { asset_id: i64 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("rescue log error: {0}")]
    Log(#[from] log::RescueLogError),
}

/// Outcome of one upsert batch: three disjoint asset-id lists.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpsertSummary {
    /// Existing (rescuer, asset) rows updated in place.
    pub updated: Vec<i64>,
    /// New (rescuer, asset) rows inserted.
    pub inserted: Vec<i64>,
    /// Rows whose individual commit failed; the rest of the batch is
    /// unaffected.
    pub not_committed: Vec<i64>,
}

impl UpsertSummary {
    /// Whether any row was durably recorded.
    pub fn committed_any(&self) -> bool {
        !self.updated.is_empty() || !self.inserted.is_empty()
    }
}

/// Split a report batch into updates of existing (rescuer, asset) pairs and
/// genuinely new inserts.
///
/// When one batch reports the same asset twice, the last report wins; the
/// earlier one is dropped before partitioning so both reconciler variants
/// apply identical writes.
pub fn partition_reports<'a>(
    existing: &HashSet<i64>,
    reports: &'a [ReportedAsset],
) -> (Vec<&'a ReportedAsset>, Vec<&'a ReportedAsset>) {
    let mut latest: HashMap<i64, &'a ReportedAsset> = HashMap::new();
    let mut order: Vec<i64> = Vec::new();
    for report in reports {
        if latest.insert(report.asset_id, report).is_none() {
            order.push(report.asset_id);
        }
    }

    let mut updates = Vec::new();
    let mut inserts = Vec::new();
    for asset_id in order {
        let report = latest[&asset_id];
        if existing.contains(&asset_id) {
            updates.push(report);
        } else {
            inserts.push(report);
        }
    }

    (updates, inserts)
}

/// Catalog-backed reconciler.
pub struct CatalogReconciler {
    pool: PgPool,
}

impl CatalogReconciler {
    /// Create a new catalog-backed reconciler.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Validate and durably record a batch of rescue outcomes.
    ///
    /// Fails fast, with nothing written, when the rescuer is unknown, a
    /// reported asset id is unknown, or a reported URL mismatches the
    /// catalog. Past validation, each row commits independently: a failing
    /// row lands in `not_committed` without blocking its siblings.
    #[instrument(skip(self, reports), fields(reports = reports.len()))]
    pub async fn upsert_rescues(
        &self,
        rescuer_id: i64,
        reports: &[ReportedAsset],
    ) -> ReconcileResult<UpsertSummary> {
        let rescuer_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM rescuers WHERE id = $1)")
                .bind(rescuer_id)
                .fetch_one(&self.pool)
                .await?;
        if !rescuer_exists {
            return Err(ReconcileError::UnknownRescuer(rescuer_id));
        }

        let mut asset_ids: Vec<i64> = reports.iter().map(|r| r.asset_id).collect();
        asset_ids.sort_unstable();
        asset_ids.dedup();

        let rows = sqlx::query_as::<_, AssetUrlRow>(
            "SELECT id, url FROM assets WHERE id = ANY($1::BIGINT[])",
        )
        .bind(&asset_ids)
        .fetch_all(&self.pool)
        .await?;

        let catalog_urls: HashMap<i64, String> =
            rows.into_iter().map(|r| (r.id, r.url)).collect();

        for report in reports {
            match catalog_urls.get(&report.asset_id) {
                None => return Err(ReconcileError::UnknownAsset(report.asset_id)),
                Some(url) if url != &report.url => {
                    return Err(ReconcileError::UrlMismatch {
                        asset_id: report.asset_id,
                    });
                }
                Some(_) => {}
            }
        }

        let existing: HashSet<i64> = sqlx::query_scalar::<_, i64>(
            "SELECT asset_id FROM rescues WHERE rescuer_id = $1 AND asset_id = ANY($2::BIGINT[])",
        )
        .bind(rescuer_id)
        .bind(&asset_ids)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .collect();

        let (updates, inserts) = partition_reports(&existing, reports);
        let mut summary = UpsertSummary::default();

        for report in updates {
            let result = sqlx::query(
                r#"
                UPDATE rescues
                SET locator = $1, status = $2, updated_at = now()
                WHERE rescuer_id = $3 AND asset_id = $4
                "#,
            )
            .bind(report.locator())
            .bind(report.status.to_string())
            .bind(rescuer_id)
            .bind(report.asset_id)
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => summary.updated.push(report.asset_id),
                Err(e) => {
                    warn!(asset_id = report.asset_id, error = %e, "Rescue update not committed");
                    summary.not_committed.push(report.asset_id);
                }
            }
        }

        for report in inserts {
            let result = sqlx::query(
                r#"
                INSERT INTO rescues (asset_id, rescuer_id, locator, status)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(report.asset_id)
            .bind(rescuer_id)
            .bind(report.locator())
            .bind(report.status.to_string())
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => summary.inserted.push(report.asset_id),
                Err(e) => {
                    warn!(asset_id = report.asset_id, error = %e, "Rescue insert not committed");
                    summary.not_committed.push(report.asset_id);
                }
            }
        }

        Ok(summary)
    }
}

/// Either reconciler variant, selected by configuration.
pub enum RescueReconciler {
    Catalog(CatalogReconciler),
    Log(RescueLog),
}

impl RescueReconciler {
    /// Upsert a batch of rescue outcomes through the configured backend.
    pub async fn upsert_rescues(
        &self,
        rescuer_id: i64,
        reports: &[ReportedAsset],
    ) -> ReconcileResult<UpsertSummary> {
        match self {
            Self::Catalog(catalog) => catalog.upsert_rescues(rescuer_id, reports).await,
            Self::Log(log) => Ok(log.upsert_rescues(rescuer_id, reports).await?),
        }
    }
}

#[derive(Debug)]
struct AssetUrlRow {
    id: i64,
    url: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for AssetUrlRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Self {
            id: row.try_get("id")?,
            url: row.try_get("url")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use lifeboat_model::RescueStatus;

    use super::*;

    fn report(asset_id: i64, status: RescueStatus) -> ReportedAsset {
        ReportedAsset {
            asset_id,
            ds_id: "ds".to_string(),
            res_id: "res".to_string(),
            path: "p".to_string(),
            name: "n".to_string(),
            priority: 1,
            size_mb: Some(1.0),
            url: format!("https://example.org/{asset_id}.csv"),
            magnet_link: None,
            status,
        }
    }

    #[test]
    fn test_partition_splits_existing_and_new() {
        let existing: HashSet<i64> = [1, 3].into_iter().collect();
        let reports = vec![
            report(1, RescueStatus::Success),
            report(2, RescueStatus::Fail),
            report(3, RescueStatus::Success),
        ];

        let (updates, inserts) = partition_reports(&existing, &reports);
        let update_ids: Vec<i64> = updates.iter().map(|r| r.asset_id).collect();
        let insert_ids: Vec<i64> = inserts.iter().map(|r| r.asset_id).collect();
        assert_eq!(update_ids, vec![1, 3]);
        assert_eq!(insert_ids, vec![2]);
    }

    #[test]
    fn test_partition_last_report_wins_within_batch() {
        let existing = HashSet::new();
        let reports = vec![
            report(71465, RescueStatus::Fail),
            report(71465, RescueStatus::Success),
        ];

        let (updates, inserts) = partition_reports(&existing, &reports);
        assert!(updates.is_empty());
        assert_eq!(inserts.len(), 1);
        assert_eq!(inserts[0].status, RescueStatus::Success);
    }

    #[test]
    fn test_partition_empty_reports() {
        let existing: HashSet<i64> = [1].into_iter().collect();
        let (updates, inserts) = partition_reports(&existing, &[]);
        assert!(updates.is_empty());
        assert!(inserts.is_empty());
    }

    #[test]
    fn test_summary_committed_any() {
        let mut summary = UpsertSummary::default();
        assert!(!summary.committed_any());
        summary.not_committed.push(1);
        assert!(!summary.committed_any());
        summary.inserted.push(2);
        assert!(summary.committed_any());
    }
}

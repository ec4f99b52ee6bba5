//! Derived resource-type refresh.
//!
//! Resource rows arrive from the ingestion pipeline with a locator URL and
//! no classification. This module recomputes `resources.resource_type` from
//! the URL shape and rolls the result up into each dataset's access counts
//! (`access_total_count` / `access_direct_dl_count`). The ranking worker
//! runs it before each recompute pass so ranks are built over fresh counts.

use lifeboat_model::ResourceType;
use sqlx::PgPool;
use tracing::{debug, instrument};

use crate::error::DbError;

/// Counts from one refresh pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RefreshStats {
    /// Resources whose stored type changed.
    pub resources_updated: u64,
    /// Datasets whose access counts were rewritten.
    pub datasets_updated: u64,
}

/// Reclassify every resource from its URL and update dataset access counts.
///
/// Classification is deterministic, so rewriting only changed rows keeps the
/// pass idempotent: a second run over unchanged data touches nothing.
#[instrument(skip(pool))]
pub async fn refresh(pool: &PgPool) -> Result<RefreshStats, DbError> {
    let mut stats = RefreshStats::default();

    let rows = sqlx::query_as::<_, ResourceUrlRow>(
        "SELECT id, dg_url, resource_type FROM resources",
    )
    .fetch_all(pool)
    .await
    .map_err(DbError::Query)?;

    for row in rows {
        let derived = ResourceType::from_url(row.dg_url.as_deref()).to_db_value();
        if derived == row.resource_type {
            continue;
        }

        let result = sqlx::query(
            "UPDATE resources SET resource_type = $1, updated_at = now() WHERE id = $2",
        )
        .bind(&derived)
        .bind(row.id)
        .execute(pool)
        .await
        .map_err(DbError::Query)?;

        stats.resources_updated += result.rows_affected();
    }

    // Roll classified types up into dataset access counts in one statement.
    let result = sqlx::query(
        r#"
        UPDATE datasets d
        SET access_total_count = counts.total,
            access_direct_dl_count = counts.direct,
            updated_at = now()
        FROM (
            SELECT dataset_id,
                   COUNT(*) FILTER (WHERE resource_type IS NOT NULL) AS total,
                   COUNT(*) FILTER (
                       WHERE resource_type IS NOT NULL
                         AND resource_type NOT IN ('web', 'dir')
                   ) AS direct
            FROM resources
            GROUP BY dataset_id
        ) counts
        WHERE counts.dataset_id = d.id
          AND (d.access_total_count != counts.total
               OR d.access_direct_dl_count != counts.direct)
        "#,
    )
    .execute(pool)
    .await
    .map_err(DbError::Query)?;

    stats.datasets_updated = result.rows_affected();

    debug!(
        resources_updated = stats.resources_updated,
        datasets_updated = stats.datasets_updated,
        "Resource type refresh complete"
    );

    Ok(stats)
}

#[derive(Debug)]
struct ResourceUrlRow {
    id: i64,
    dg_url: Option<String>,
    resource_type: Option<String>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for ResourceUrlRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Self {
            id: row.try_get("id")?,
            dg_url: row.try_get("dg_url")?,
            resource_type: row.try_get("resource_type")?,
        })
    }
}

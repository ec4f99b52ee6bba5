//! JSON-file-backed rescue log.
//!
//! Upsert variant for deployments without the catalog store. The full log
//! is loaded, this rescuer's reported entries are updated in place, new
//! (rescuer, asset) pairs are appended, and the file is rewritten
//! atomically as a full replace, never a partial write.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use lifeboat_model::{ReportedAsset, RescueStatus};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{partition_reports, UpsertSummary};

/// Errors from rescue log operations.
#[derive(Debug, thiserror::Error)]
pub enum RescueLogError {
    #[error("rescue log io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("rescue log serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One recorded rescue outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescueRecord {
    pub rescuer_id: i64,
    pub asset_id: i64,
    pub locator: String,
    pub status: RescueStatus,
    pub updated_at: DateTime<Utc>,
}

/// File-backed rescue log.
#[derive(Debug, Clone)]
pub struct RescueLog {
    path: PathBuf,
}

impl RescueLog {
    /// Create a rescue log at the given path.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path the log is stored at.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all recorded rescues; a missing file is an empty log.
    pub async fn load(&self) -> Result<Vec<RescueRecord>, RescueLogError> {
        match tokio::fs::read(&self.path).await {
            Ok(content) => Ok(serde_json::from_slice(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply a batch of rescue outcomes and rewrite the log.
    ///
    /// Produces the same updated/inserted partition as the catalog variant
    /// for the same input. The whole batch commits as one atomic file
    /// replace, so `not_committed` is always empty here; a failed write
    /// surfaces as an error with the previous log intact.
    #[instrument(skip(self, reports), fields(reports = reports.len()))]
    pub async fn upsert_rescues(
        &self,
        rescuer_id: i64,
        reports: &[ReportedAsset],
    ) -> Result<UpsertSummary, RescueLogError> {
        let mut records = self.load().await?;
        let now = Utc::now();

        let existing: HashSet<i64> = records
            .iter()
            .filter(|r| r.rescuer_id == rescuer_id)
            .map(|r| r.asset_id)
            .collect();

        let (updates, inserts) = partition_reports(&existing, reports);
        let mut summary = UpsertSummary::default();

        for report in updates {
            // Partitioning guarantees the record exists.
            if let Some(record) = records
                .iter_mut()
                .find(|r| r.rescuer_id == rescuer_id && r.asset_id == report.asset_id)
            {
                record.locator = report.locator().to_string();
                record.status = report.status;
                record.updated_at = now;
                summary.updated.push(report.asset_id);
            }
        }

        for report in inserts {
            records.push(RescueRecord {
                rescuer_id,
                asset_id: report.asset_id,
                locator: report.locator().to_string(),
                status: report.status,
                updated_at: now,
            });
            summary.inserted.push(report.asset_id);
        }

        self.store(&records).await?;

        debug!(
            updated = summary.updated.len(),
            inserted = summary.inserted.len(),
            "Rescue log rewritten"
        );

        Ok(summary)
    }

    /// Rewrite the log atomically via a temporary sibling file.
    async fn store(&self, records: &[RescueRecord]) -> Result<(), RescueLogError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_vec_pretty(records)?;
        let tmp_path = self.path.with_extension("tmp");

        tokio::fs::write(&tmp_path, content).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(asset_id: i64, status: RescueStatus, magnet: Option<&str>) -> ReportedAsset {
        ReportedAsset {
            asset_id,
            ds_id: "ds".to_string(),
            res_id: "res".to_string(),
            path: "p".to_string(),
            name: "n".to_string(),
            priority: 1,
            size_mb: Some(1.0),
            url: format!("https://example.org/{asset_id}.csv"),
            magnet_link: magnet.map(String::from),
            status,
        }
    }

    #[tokio::test]
    async fn test_first_report_inserts() {
        let dir = tempfile::tempdir().unwrap();
        let log = RescueLog::new(dir.path().join("rescues.json"));

        let summary = log
            .upsert_rescues(154562, &[report(71465, RescueStatus::Fail, None)])
            .await
            .unwrap();

        assert_eq!(summary.inserted, vec![71465]);
        assert!(summary.updated.is_empty());

        let records = log.load().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, RescueStatus::Fail);
    }

    #[tokio::test]
    async fn test_second_report_updates_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let log = RescueLog::new(dir.path().join("rescues.json"));

        log.upsert_rescues(154562, &[report(71465, RescueStatus::Fail, None)])
            .await
            .unwrap();
        let summary = log
            .upsert_rescues(
                154562,
                &[report(71465, RescueStatus::Success, Some("magnet:?xt=urn:btih:abc123"))],
            )
            .await
            .unwrap();

        assert_eq!(summary.updated, vec![71465]);
        assert!(summary.inserted.is_empty());

        // Exactly one row for the pair, reflecting only the latest report.
        let records = log.load().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, RescueStatus::Success);
        assert_eq!(records[0].locator, "magnet:?xt=urn:btih:abc123");
    }

    #[tokio::test]
    async fn test_other_rescuers_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let log = RescueLog::new(dir.path().join("rescues.json"));

        log.upsert_rescues(1, &[report(10, RescueStatus::Success, None)])
            .await
            .unwrap();
        // Same asset, different rescuer: a new pair, not an update.
        let summary = log
            .upsert_rescues(2, &[report(10, RescueStatus::Fail, None)])
            .await
            .unwrap();

        assert_eq!(summary.inserted, vec![10]);
        let records = log.load().await.unwrap();
        assert_eq!(records.len(), 2);

        let first = records.iter().find(|r| r.rescuer_id == 1).unwrap();
        assert_eq!(first.status, RescueStatus::Success);
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = RescueLog::new(dir.path().join("absent.json"));
        assert!(log.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mixed_batch() {
        let dir = tempfile::tempdir().unwrap();
        let log = RescueLog::new(dir.path().join("rescues.json"));

        log.upsert_rescues(7, &[report(1, RescueStatus::Fail, None)])
            .await
            .unwrap();
        let summary = log
            .upsert_rescues(
                7,
                &[
                    report(1, RescueStatus::Success, None),
                    report(2, RescueStatus::Success, None),
                ],
            )
            .await
            .unwrap();

        assert_eq!(summary.updated, vec![1]);
        assert_eq!(summary.inserted, vec![2]);
        assert_eq!(log.load().await.unwrap().len(), 2);
    }
}

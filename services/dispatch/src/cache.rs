//! Local ranked-list cache.
//!
//! Written through on every successful ranking call and read back when the
//! ranking service is unreachable. The file is replaced atomically (write
//! to a temporary sibling, then rename) so readers never observe a partial
//! write.

use std::path::{Path, PathBuf};

use lifeboat_model::RankedAsset;
use tracing::debug;

/// Errors from cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// File-backed ranked-list cache.
#[derive(Debug, Clone)]
pub struct RankingCache {
    path: PathBuf,
}

impl RankingCache {
    /// Create a cache at the given path.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path the cache is stored at.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the last successfully cached ranked list.
    pub async fn load(&self) -> Result<Vec<RankedAsset>, CacheError> {
        let content = tokio::fs::read(&self.path).await?;
        let assets = serde_json::from_slice(&content)?;
        Ok(assets)
    }

    /// Replace the cache contents atomically.
    pub async fn store(&self, assets: &[RankedAsset]) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_vec_pretty(assets)?;
        let tmp_path = self.path.with_extension("tmp");

        tokio::fs::write(&tmp_path, content).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        debug!(path = %self.path.display(), assets = assets.len(), "Ranking cache refreshed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_assets() -> Vec<RankedAsset> {
        vec![RankedAsset {
            path: "p".to_string(),
            name: "n".to_string(),
            priority: 1,
            size_mb: Some(4.5),
            ds_id: "ds".to_string(),
            res_id: "res".to_string(),
            asset_id: 42,
            url: "https://example.org/file.csv".to_string(),
        }]
    }

    #[tokio::test]
    async fn test_store_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RankingCache::new(dir.path().join("ranking_cache.json"));

        cache.store(&sample_assets()).await.unwrap();
        let loaded = cache.load().await.unwrap();
        assert_eq!(loaded, sample_assets());
    }

    #[tokio::test]
    async fn test_store_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RankingCache::new(dir.path().join("nested/data/cache.json"));

        cache.store(&[]).await.unwrap();
        assert!(cache.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RankingCache::new(dir.path().join("cache.json"));

        cache.store(&sample_assets()).await.unwrap();
        cache.store(&[]).await.unwrap();
        assert!(cache.load().await.unwrap().is_empty());
        // No leftover temp file after the rename.
        assert!(!dir.path().join("cache.tmp").exists());
    }

    #[tokio::test]
    async fn test_load_missing_cache_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RankingCache::new(dir.path().join("missing.json"));
        assert!(cache.load().await.is_err());
    }
}

//! Ranked-asset and rescue-report wire types.

use serde::{Deserialize, Serialize};

/// One entry of the ranked worklist served by the ranking service.
///
/// `priority` is the dataset's current rank (1 = most urgent). `size_mb` is
/// `None` until the asset has been probed; unknown sizes are packed
/// optimistically by the allocator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedAsset {
    /// Display path (resource description in the catalog).
    pub path: String,

    /// Display name.
    pub name: String,

    /// Dataset rank, 1 = most urgent.
    pub priority: i32,

    /// Estimated size in megabytes, if known.
    pub size_mb: Option<f64>,

    /// External dataset id.
    pub ds_id: String,

    /// External resource id.
    pub res_id: String,

    /// Catalog asset id.
    pub asset_id: i64,

    /// Retrieval locator: an existing rescue locator if one exists,
    /// else the original resource locator.
    pub url: String,
}

/// Outcome of one rescue attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RescueStatus {
    Success,
    Fail,
}

impl std::fmt::Display for RescueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RescueStatus::Success => write!(f, "success"),
            RescueStatus::Fail => write!(f, "fail"),
        }
    }
}

impl RescueStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "fail" => Some(Self::Fail),
            _ => None,
        }
    }
}

/// One asset outcome as reported by a rescuer after working through its
/// allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportedAsset {
    /// Catalog asset id.
    pub asset_id: i64,

    /// External dataset id.
    pub ds_id: String,

    /// External resource id.
    pub res_id: String,

    /// Display path.
    pub path: String,

    /// Display name.
    pub name: String,

    /// Priority the asset carried when allocated.
    pub priority: i32,

    /// Estimated size in megabytes, if known.
    pub size_mb: Option<f64>,

    /// The locator the asset was fetched from.
    pub url: String,

    /// Content-addressed locator produced by the rescuer, if any.
    #[serde(default)]
    pub magnet_link: Option<String>,

    /// Rescue outcome.
    pub status: RescueStatus,
}

impl ReportedAsset {
    /// The locator to record for this rescue: the rescuer-produced magnet
    /// link when present, else the download URL.
    pub fn locator(&self) -> &str {
        self.magnet_link.as_deref().unwrap_or(&self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranked_asset_roundtrip() {
        let json = r#"{
            "path": "data_gov_ca-gov_20250601_120256/package_search_S0000.json",
            "name": "CHHS CA mock data 1",
            "priority": 1,
            "size_mb": 4.5,
            "ds_id": "1e5add2c-88db-4a35-b23d-289db927f57a",
            "res_id": "907ca678-6428-4dca-9022-ec4dee9f8e37",
            "asset_id": 45445,
            "url": "https://data.chhs.ca.gov/dataset/5a281abf/download/indicator-24.csv"
        }"#;

        let asset: RankedAsset = serde_json::from_str(json).unwrap();
        assert_eq!(asset.priority, 1);
        assert_eq!(asset.asset_id, 45445);
        assert_eq!(asset.size_mb, Some(4.5));
    }

    #[test]
    fn test_ranked_asset_null_size() {
        let json = r#"{
            "path": "p",
            "name": "n",
            "priority": 3,
            "size_mb": null,
            "ds_id": "d",
            "res_id": "r",
            "asset_id": 1,
            "url": "https://example.org/file.csv"
        }"#;

        let asset: RankedAsset = serde_json::from_str(json).unwrap();
        assert!(asset.size_mb.is_none());
    }

    #[test]
    fn test_reported_asset_locator_prefers_magnet() {
        let with_magnet = ReportedAsset {
            asset_id: 71465,
            ds_id: "d3".to_string(),
            res_id: "r3".to_string(),
            path: "p".to_string(),
            name: "Dataset 3".to_string(),
            priority: 6,
            size_mb: Some(156.0),
            url: "https://example.org/file.zip".to_string(),
            magnet_link: Some("magnet:?xt=urn:btih:dd8255ecdc7ca55fb0bbf8".to_string()),
            status: RescueStatus::Success,
        };
        assert!(with_magnet.locator().starts_with("magnet:"));

        let without = ReportedAsset {
            magnet_link: None,
            ..with_magnet
        };
        assert_eq!(without.locator(), "https://example.org/file.zip");
    }

    #[test]
    fn test_rescue_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&RescueStatus::Success).unwrap(),
            "\"success\""
        );
        let status: RescueStatus = serde_json::from_str("\"fail\"").unwrap();
        assert_eq!(status, RescueStatus::Fail);
    }
}

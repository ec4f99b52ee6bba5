//! HTTP client for the ranking service.
//!
//! A pure transport concern: transport and status errors propagate to the
//! caller, which owns the cache-fallback decision. Individual malformed
//! entries in an otherwise valid response are skipped rather than failing
//! the whole call, so schema drift in one record cannot empty the worklist.

use std::time::Duration;

use lifeboat_model::{validate_locator, RankedAsset};
use serde::Deserialize;
use tracing::{debug, warn};

/// Request timeout for ranking calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Idle connections kept per host.
const MAX_IDLE_CONNECTIONS: usize = 5;

/// Errors from the ranking client.
#[derive(Debug, thiserror::Error)]
pub enum RankingClientError {
    #[error("ranking request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("ranking service returned status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Raw ranking response; entries are parsed individually.
#[derive(Debug, Deserialize)]
struct RawRankingResponse {
    #[serde(default)]
    asset: Vec<serde_json::Value>,
}

/// Client for the ranking service.
///
/// Holds one pooled connection for its lifetime; the pool is released when
/// the client is dropped.
pub struct RankingClient {
    client: reqwest::Client,
    base_url: String,
}

impl RankingClient {
    /// Create a new ranking client.
    pub fn new(base_url: &str) -> Result<Self, RankingClientError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .pool_max_idle_per_host(MAX_IDLE_CONNECTIONS)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Retrieve the current ranking, most urgent first.
    pub async fn get_ranking(&self) -> Result<Vec<RankedAsset>, RankingClientError> {
        let url = format!("{}/ranking", self.base_url);
        debug!(url = %url, "Retrieving ranking");

        let response = self.client.post(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RankingClientError::Status { status, body });
        }

        let raw: RawRankingResponse = response.json().await?;
        let total = raw.asset.len();

        let mut assets = Vec::with_capacity(total);
        for entry in raw.asset {
            match serde_json::from_value::<RankedAsset>(entry.clone()) {
                Ok(asset) => {
                    if let Err(e) = validate_locator(&asset.url) {
                        warn!(asset_id = asset.asset_id, error = %e, "Invalid asset locator ignored");
                        continue;
                    }
                    assets.push(asset);
                }
                Err(e) => {
                    warn!(entry = %entry, error = %e, "Invalid ranking entry ignored");
                }
            }
        }

        debug!(received = total, parsed = assets.len(), "Ranking received");
        Ok(assets)
    }
}

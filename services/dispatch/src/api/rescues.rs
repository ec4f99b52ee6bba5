//! Rescue outcome reporting.
//!
//! `POST /assets-downloaded` receives a rescuer's results for the assets it
//! attempted and upserts them into the rescue log.

use axum::{extract::State, response::IntoResponse, routing::post, Json, Router};
use lifeboat_model::{validate_locator, ReportedAsset};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::reconciler::ReconcileError;
use crate::state::AppState;

/// Create rescue reporting routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/assets-downloaded", post(assets_downloaded))
}

/// A rescuer's outcome report for one allocation.
#[derive(Debug, Deserialize)]
pub struct AssetsDownloadedRequest {
    /// Reporting rescuer; must pre-exist in the catalog.
    pub rescuer_id: i64,

    /// Free-form message from the rescuer.
    #[serde(default)]
    pub message: String,

    /// Per-asset outcomes.
    pub assets: Vec<ReportedAsset>,
}

/// Upsert outcome, split into three disjoint lists.
#[derive(Debug, Serialize)]
pub struct AssetsDownloadedResponse {
    pub status: String,
    pub message: String,
    pub updated_rescues: Vec<i64>,
    pub inserted_rescues: Vec<i64>,
    pub not_committed_rescues: Vec<i64>,
}

/// Record reported rescue outcomes.
///
/// POST /assets-downloaded
async fn assets_downloaded(
    State(state): State<AppState>,
    Json(req): Json<AssetsDownloadedRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.assets.is_empty() {
        return Err(ApiError::unprocessable(
            "empty_assets",
            "No assets in report",
        ));
    }

    for asset in &req.assets {
        if let Err(e) = validate_locator(&asset.url) {
            return Err(ApiError::unprocessable(
                "invalid_url",
                format!("asset {}: {e}", asset.asset_id),
            ));
        }
        if let Some(magnet) = &asset.magnet_link {
            if let Err(e) = validate_locator(magnet) {
                return Err(ApiError::unprocessable(
                    "invalid_magnet_link",
                    format!("asset {}: {e}", asset.asset_id),
                ));
            }
        }
    }

    let summary = state
        .reconciler()
        .upsert_rescues(req.rescuer_id, &req.assets)
        .await
        .map_err(|e| match e {
            ReconcileError::UnknownRescuer(id) => {
                ApiError::unprocessable("unknown_rescuer", format!("Rescuer {id} not found"))
            }
            ReconcileError::UnknownAsset(id) => {
                ApiError::unprocessable("unknown_asset", format!("Asset {id} not found"))
            }
            ReconcileError::UrlMismatch { asset_id } => ApiError::unprocessable(
                "url_mismatch",
                format!("Asset {asset_id} URL does not match the catalog record"),
            ),
            ReconcileError::Database(e) => {
                tracing::error!(error = %e, "Failed to upsert rescues");
                ApiError::internal("internal_error", "Failed to record rescues")
            }
            ReconcileError::Log(e) => {
                tracing::error!(error = %e, "Failed to rewrite rescue log");
                ApiError::internal("internal_error", "Failed to record rescues")
            }
        })?;

    if !summary.committed_any() {
        return Err(ApiError::internal(
            "nothing_committed",
            "No rescue row could be committed",
        ));
    }

    let status = if summary.not_committed.is_empty() {
        "success"
    } else {
        "partial"
    };

    tracing::info!(
        rescuer_id = req.rescuer_id,
        updated = summary.updated.len(),
        inserted = summary.inserted.len(),
        not_committed = summary.not_committed.len(),
        message = %req.message,
        "Rescue report processed"
    );

    Ok(Json(AssetsDownloadedResponse {
        status: status.to_string(),
        message: "Rescue report processed".to_string(),
        updated_rescues: summary.updated,
        inserted_rescues: summary.inserted,
        not_committed_rescues: summary.not_committed,
    }))
}

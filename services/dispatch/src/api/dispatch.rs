//! Allocation endpoints.
//!
//! `POST /dispatch` packs the current ranking into a rescuer's offered
//! space; `POST /release` returns an allocated asset; `GET /status` exposes
//! allocation counters.

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use lifeboat_model::RankedAsset;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::state::AppState;

/// Create allocation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dispatch", post(dispatch))
        .route("/release", post(release))
        .route("/status", get(status))
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Request for a work assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRequest {
    /// Rescuer name.
    pub name: String,

    /// Rescuer description.
    pub description: String,

    /// Free storage offered, in gigabytes.
    pub free_space_gb: f64,

    /// Node to assign to; generated when absent.
    #[serde(default)]
    pub node_id: Option<String>,
}

/// Response carrying the assigned work.
#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    pub status: String,
    pub message: String,

    /// Echo of the request payload.
    pub received_data: DispatchRequest,

    /// Assigned assets, in acceptance order.
    pub asset: Vec<RankedAsset>,

    /// Node the assignment is recorded under.
    pub node_id: String,

    /// Total assigned size, counting only assets with known size.
    pub allocated_size_mb: f64,

    /// Identifier of this assignment in the allocation log.
    pub allocation_id: Uuid,
}

/// Request to release an allocated asset.
#[derive(Debug, Deserialize)]
pub struct ReleaseRequest {
    pub asset_id: i64,
    pub node_id: String,
}

#[derive(Debug, Serialize)]
pub struct ReleaseResponse {
    pub status: String,
    pub released: u64,
}

/// System status counters.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub active_allocations: i64,
    pub cached_assets: usize,
}

// =============================================================================
// Handlers
// =============================================================================

/// Allocate assets into the offered space.
///
/// POST /dispatch
async fn dispatch(
    State(state): State<AppState>,
    Json(req): Json<DispatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.free_space_gb <= 0.0 {
        return Err(ApiError::bad_request(
            "invalid_free_space",
            "free_space_gb must be positive",
        ));
    }

    let free_space_mb = req.free_space_gb * 1024.0;

    let allocation = state
        .allocator()
        .allocate_assets(free_space_mb, req.node_id.clone())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to record allocation");
            ApiError::internal("internal_error", "Failed to record allocation")
        })?;

    let Some(allocation) = allocation else {
        return Err(ApiError::unprocessable(
            "no_fit",
            "No available assets matching the criteria",
        ));
    };

    Ok(Json(DispatchResponse {
        status: "success".to_string(),
        message: "Payload received and processed".to_string(),
        received_data: req,
        asset: allocation.assets,
        node_id: allocation.node_id,
        allocated_size_mb: allocation.allocated_size_mb,
        allocation_id: allocation.allocation_id,
    }))
}

/// Release an allocated asset.
///
/// POST /release
async fn release(
    State(state): State<AppState>,
    Json(req): Json<ReleaseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let released = state
        .allocator()
        .release_assets(req.asset_id, &req.node_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to release asset");
            ApiError::internal("internal_error", "Failed to release asset")
        })?;

    Ok(Json(ReleaseResponse {
        status: "success".to_string(),
        released,
    }))
}

/// System status counters.
///
/// GET /status
async fn status(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let active_allocations = state.allocator().active_allocation_count().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to count allocations");
        ApiError::internal("internal_error", "Failed to read status")
    })?;

    Ok(Json(StatusResponse {
        active_allocations,
        cached_assets: state.allocator().cached_asset_count().await,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_request_deserialization() {
        let json = r#"{
            "name": "rescuer-7",
            "description": "home NAS with spare space",
            "free_space_gb": 10.0
        }"#;
        let req: DispatchRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.name, "rescuer-7");
        assert_eq!(req.free_space_gb, 10.0);
        assert!(req.node_id.is_none());
    }

    #[test]
    fn test_dispatch_response_serialization() {
        let req = DispatchRequest {
            name: "r".to_string(),
            description: "d".to_string(),
            free_space_gb: 1.0,
            node_id: None,
        };
        let response = DispatchResponse {
            status: "success".to_string(),
            message: "Payload received and processed".to_string(),
            received_data: req,
            asset: vec![],
            node_id: "node-1".to_string(),
            allocated_size_mb: 0.0,
            allocation_id: Uuid::nil(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"success\""));
        assert!(json.contains("\"received_data\""));
        assert!(json.contains("\"asset\":[]"));
    }
}

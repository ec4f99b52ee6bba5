//! Ranking endpoints.
//!
//! `POST /ranking` serves the current best ranking to the dispatch service;
//! `POST /test_ranking` forces a recompute pass and returns the newly
//! emitted rank rows.

use axum::{extract::State, response::IntoResponse, routing::post, Json, Router};
use chrono::Utc;
use lifeboat_model::RankedAsset;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::engine::PersistedRankRecord;
use crate::state::AppState;

/// Create ranking routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ranking", post(ranking))
        .route("/test_ranking", post(test_ranking))
}

/// Response for the ranking query.
#[derive(Debug, Serialize)]
pub struct RankingResponse {
    /// Ranked asset list, most urgent first.
    pub asset: Vec<RankedAsset>,
}

/// Serve the current ranking, most urgent first.
///
/// POST /ranking
async fn ranking(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let assets = state.engine().get_rank().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to load ranking");
        ApiError::internal("internal_error", "Failed to load ranking")
    })?;

    tracing::info!(assets = assets.len(), "Ranking served");

    Ok(Json(RankingResponse { asset: assets }))
}

/// Force a recompute pass and return the newly persisted rank rows.
///
/// POST /test_ranking
async fn test_ranking(
    State(state): State<AppState>,
) -> Result<Json<Vec<PersistedRankRecord>>, ApiError> {
    let records = state.engine().recompute(Utc::now()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to recompute ranking");
        ApiError::internal("internal_error", "Failed to recompute ranking")
    })?;

    tracing::info!(ranks_emitted = records.len(), "Recompute triggered");

    Ok(Json(records))
}

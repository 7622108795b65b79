//! Analytics endpoints

use axum::extract::{Query, State};
use axum::Json;
use minact_common::Error;
use serde::{Deserialize, Serialize};

use crate::analytics;
use crate::api::ApiResult;
use crate::AppState;

/// GET /analytics/briefing
pub async fn daily_briefing(
    State(state): State<AppState>,
) -> ApiResult<Json<analytics::DailyBriefing>> {
    Ok(Json(analytics::daily_briefing(&state.db).await?))
}

#[derive(Debug, Deserialize)]
pub struct ProductivityQuery {
    /// Trailing window in days
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    7
}

/// GET /analytics/productivity?days=N
pub async fn productivity(
    State(state): State<AppState>,
    Query(query): Query<ProductivityQuery>,
) -> ApiResult<Json<analytics::ProductivityReport>> {
    if query.days <= 0 {
        return Err(Error::InvalidInput(format!("days out of range: {}", query.days)).into());
    }
    Ok(Json(analytics::productivity(&state.db, query.days).await?))
}

#[derive(Debug, Deserialize)]
pub struct BlockerScanRequest {
    pub transcript: String,
}

#[derive(Debug, Serialize)]
pub struct BlockerScanResponse {
    pub blockers: Vec<String>,
}

/// POST /analytics/blockers - keyword scan over raw transcript text
pub async fn scan_blockers(
    Json(req): Json<BlockerScanRequest>,
) -> ApiResult<Json<BlockerScanResponse>> {
    Ok(Json(BlockerScanResponse {
        blockers: analytics::scan_for_blockers(&req.transcript),
    }))
}

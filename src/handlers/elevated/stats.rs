// handlers/elevated/stats.rs - GET /admin-stats

use axum::{extract::State, Json};

use crate::error::ApiError;
use crate::services::AdminStats;
use crate::state::AppState;

pub async fn admin_stats(State(state): State<AppState>) -> Result<Json<AdminStats>, ApiError> {
    Ok(Json(state.reporting.admin_stats().await?))
}

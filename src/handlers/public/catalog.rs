// handlers/public/catalog.rs - GET /menu, GET /reviews

use axum::{extract::State, Json};

use crate::database::models::{MenuItem, Review};
use crate::error::ApiError;
use crate::state::AppState;

pub async fn list_menu(State(state): State<AppState>) -> Result<Json<Vec<MenuItem>>, ApiError> {
    Ok(Json(state.store.list_menu().await?))
}

pub async fn list_reviews(State(state): State<AppState>) -> Result<Json<Vec<Review>>, ApiError> {
    Ok(Json(state.store.list_reviews().await?))
}

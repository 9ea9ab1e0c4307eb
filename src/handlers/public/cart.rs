// handlers/public/cart.rs - POST /cart, DELETE /cart/:id

use axum::{extract::State, Json};

use crate::database::models::CartEntry;
use crate::database::{DeleteResult, InsertResult};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

pub async fn add_cart_entry(
    State(state): State<AppState>,
    ApiJson(entry): ApiJson<CartEntry>,
) -> Result<Json<InsertResult>, ApiError> {
    Ok(Json(state.store.insert_cart_entry(entry).await?))
}

/// Unknown or malformed ids report `deletedCount: 0`.
pub async fn remove_cart_entry(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<DeleteResult>, ApiError> {
    Ok(Json(state.store.delete_cart_entry(&id).await?))
}

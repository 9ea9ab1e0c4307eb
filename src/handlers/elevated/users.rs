// handlers/elevated/users.rs - GET /users

use axum::{extract::State, Json};

use crate::database::models::User;
use crate::error::ApiError;
use crate::state::AppState;

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.store.list_users().await?))
}

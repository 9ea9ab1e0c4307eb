// handlers/elevated/menu.rs - POST /menu, DELETE /menu/:id

use axum::{extract::State, Extension, Json};

use crate::database::models::MenuItem;
use crate::database::{DeleteResult, InsertResult};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::AuthUser;
use crate::state::AppState;

pub async fn add_menu_item(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    ApiJson(item): ApiJson<MenuItem>,
) -> Result<Json<InsertResult>, ApiError> {
    let name = item.name.clone();
    let result = state.store.insert_menu_item(item).await?;
    tracing::info!("{} added menu item '{}' ({})", admin.email, name, result.inserted_id);
    Ok(Json(result))
}

pub async fn remove_menu_item(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<DeleteResult>, ApiError> {
    let result = state.store.delete_menu_item(&id).await?;
    tracing::info!("{} removed menu item {} (deleted {})", admin.email, id, result.deleted_count);
    Ok(Json(result))
}

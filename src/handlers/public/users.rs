// handlers/public/users.rs - POST /users, PATCH /users/admin/:id

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::database::models::{NewUser, Role, User};
use crate::database::{DatabaseError, UpdateResult};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

const ALREADY_EXISTS: &str = "user already exist";

/// Registers an account on first sign-in. A second registration for the
/// same email is not an error; it answers with a message instead.
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(new_user): ApiJson<NewUser>,
) -> Result<Json<Value>, ApiError> {
    if new_user.email.trim().is_empty() {
        return Err(ApiError::bad_request("email is required"));
    }

    if state.store.find_user_by_email(&new_user.email).await?.is_some() {
        return Ok(Json(json!({ "message": ALREADY_EXISTS })));
    }

    match state.store.insert_user(User::from(new_user)).await {
        Ok(result) => Ok(Json(json!(result))),
        // Lost a race against a concurrent registration.
        Err(DatabaseError::Duplicate(_)) => Ok(Json(json!({ "message": ALREADY_EXISTS }))),
        Err(e) => Err(e.into()),
    }
}

pub async fn promote_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<UpdateResult>, ApiError> {
    let result = state.store.set_user_role(&id, Role::Admin).await?;
    if result.modified_count > 0 {
        tracing::info!("Promoted user {} to admin", id);
    }
    Ok(Json(result))
}

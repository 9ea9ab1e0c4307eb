// handlers/protected/users.rs - GET /users/admin/:email

use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::error::ApiError;
use crate::extract::ApiPath;
use crate::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AdminCheck {
    pub admin: bool,
}

/// Capability check for the caller's own account. Asking about somebody
/// else is answered `false`, not rejected.
pub async fn check_admin(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    ApiPath(email): ApiPath<String>,
) -> Result<Json<AdminCheck>, ApiError> {
    if caller.email != email {
        return Ok(Json(AdminCheck { admin: false }));
    }

    let user = state.store.find_user_by_email(&email).await?;
    Ok(Json(AdminCheck {
        admin: user.is_some_and(|u| u.is_admin()),
    }))
}

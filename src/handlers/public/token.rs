// handlers/public/token.rs - POST /jwt

use axum::{extract::State, Json};
use serde::Serialize;

use crate::auth::IdentityClaims;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Signs the posted identity claims into a bearer token valid for the
/// configured lifetime (one hour by default).
pub async fn issue_token(
    State(state): State<AppState>,
    ApiJson(identity): ApiJson<IdentityClaims>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = state.tokens.issue(identity)?;
    Ok(Json(TokenResponse { token }))
}

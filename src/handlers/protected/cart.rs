// handlers/protected/cart.rs - GET /cart?email=

use axum::{extract::State, Extension, Json};
use serde::Deserialize;

use crate::database::models::CartEntry;
use crate::error::ApiError;
use crate::extract::ApiQuery;
use crate::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CartQuery {
    pub email: Option<String>,
}

pub async fn list_cart(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<CartQuery>,
) -> Result<Json<Vec<CartEntry>>, ApiError> {
    let Some(email) = query.email.filter(|e| !e.is_empty()) else {
        return Ok(Json(Vec::new()));
    };

    if email != caller.email {
        tracing::warn!("{} attempted to read the cart of {}", caller.email, email);
        return Err(ApiError::forbidden("forbidden access"));
    }

    Ok(Json(state.store.find_cart(&email).await?))
}

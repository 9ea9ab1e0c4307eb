// handlers/protected/payments.rs - POST /create-payment-intent, POST /payments

use axum::{extract::State, Extension, Json};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::AuthUser;
use crate::services::settlement::{CaptureRequest, CaptureResponse, IntentRequest, IntentResponse};
use crate::state::AppState;

pub async fn create_payment_intent(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<IntentRequest>,
) -> Result<Json<IntentResponse>, ApiError> {
    Ok(Json(state.settlement.create_intent(request).await?))
}

pub async fn capture_payment(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    ApiJson(request): ApiJson<CaptureRequest>,
) -> Result<Json<CaptureResponse>, ApiError> {
    Ok(Json(state.settlement.capture(&caller, request).await?))
}

use axum::{Extension, Json, extract::State};
use axum_extra::extract::WithRejection;
use serde_json::Value;

use pmot_types::api::{VerifyPaymentRequest, VerifyPaymentResponse};

use crate::ledger;
use crate::middleware::Identity;
use crate::{ApiError, AppState};

/// POST /premium/order: returns the gateway's order object as-is.
pub async fn create_order(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, ApiError> {
    let order = ledger::create_order(&state, &identity).await?;
    Ok(Json(order.raw))
}

/// POST /premium/verify
pub async fn verify_payment(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    WithRejection(Json(req), _): WithRejection<Json<VerifyPaymentRequest>, ApiError>,
) -> Result<Json<VerifyPaymentResponse>, ApiError> {
    ledger::verify_and_grant(&state, &identity, req.payment_id, req.order_id, req.signature).await?;
    Ok(Json(VerifyPaymentResponse {
        status: "granted".to_string(),
        is_premium: true,
    }))
}

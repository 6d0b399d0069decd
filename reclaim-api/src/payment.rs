use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use reclaim_core::payment::PaymentConfirmation;
use reclaim_core::{Invoice, Role};
use reclaim_pickup::settlement::PaymentPreview;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::Claims;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct InitiateResponse {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub key_id: String,
    pub pickup_id: Uuid,
    pub user_name: String,
    pub email: String,
}

/// Callback fields posted by the checkout widget.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
    pub pickup_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmSimulatedRequest {
    pub pickup_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SettlementResponse {
    pub success: bool,
    pub transaction_id: String,
    pub invoices: Vec<Invoice>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payment/initiate/{pickup_id}", post(initiate))
        .route("/payment/verify", post(verify))
        .route("/payment/preview/{pickup_id}", get(preview))
        .route("/payment/confirm-simulated", post(confirm_simulated))
}

// ============================================================================
// Handlers
// ============================================================================

async fn initiate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(pickup_id): Path<Uuid>,
) -> Result<Json<InitiateResponse>, AppError> {
    claims.require(Role::Recycler)?;
    let checkout = state.payments.create_order(pickup_id).await?;

    Ok(Json(InitiateResponse {
        order_id: checkout.order.id,
        amount: checkout.order.amount,
        currency: checkout.order.currency,
        key_id: state.payments.key_id().to_string(),
        pickup_id,
        user_name: checkout.pickup.user_name,
        email: claims.email,
    }))
}

async fn verify(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<SettlementResponse>, AppError> {
    let payer_id = claims.require(Role::Recycler)?;
    let confirmation = PaymentConfirmation {
        order_id: req.razorpay_order_id,
        payment_id: req.razorpay_payment_id,
        signature: req.razorpay_signature,
    };

    let invoices = state.payments.verify_and_settle(&confirmation, req.pickup_id, payer_id).await?;
    Ok(Json(SettlementResponse {
        success: true,
        transaction_id: confirmation.payment_id,
        invoices,
    }))
}

async fn preview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(pickup_id): Path<Uuid>,
) -> Result<Json<PaymentPreview>, AppError> {
    claims.require(Role::Recycler)?;
    Ok(Json(state.payments.preview(pickup_id).await?))
}

async fn confirm_simulated(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ConfirmSimulatedRequest>,
) -> Result<Json<SettlementResponse>, AppError> {
    let payer_id = claims.require(Role::Recycler)?;
    let (transaction_id, invoices) = state.payments.confirm_simulated(req.pickup_id, payer_id).await?;
    tracing::info!("Simulated payment {} settled pickup {}", transaction_id, req.pickup_id);
    Ok(Json(SettlementResponse { success: true, transaction_id, invoices }))
}

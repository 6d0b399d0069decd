use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use reclaim_core::{Invoice, Notification, Role};
use reclaim_pickup::PendingItem;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::Claims;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct InvoicesResponse {
    pub invoices: Vec<Invoice>,
    pub pending_items: Vec<PendingItem>,
    pub role: Role,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/invoices", get(my_invoices))
        .route("/notifications", get(my_notifications))
        .route("/notifications/{id}/read", post(mark_read))
}

/// Settled payouts plus everything still in flight for the caller.
async fn my_invoices(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<InvoicesResponse>, AppError> {
    let user_id = claims.user_id()?;
    let role = claims.role()?;

    let invoices = state.payments.invoices_for(role, user_id).await?;
    let pending_items = state.payments.pending_items(role, user_id).await?;
    Ok(Json(InvoicesResponse { invoices, pending_items, role }))
}

async fn my_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let user_id = claims.user_id()?;
    Ok(Json(state.stores.notifications.list_notifications(user_id).await?))
}

async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let user_id = claims.user_id()?;
    if !state.stores.notifications.mark_read(user_id, id).await? {
        return Err(AppError::NotFoundError("Notification not found".to_string()));
    }
    Ok(Json(json!({ "success": true })))
}

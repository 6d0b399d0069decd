use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use reclaim_core::{PickupRequest, Role};
use reclaim_pickup::lifecycle::Inspection;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::Claims;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/engineer/requests", get(assigned_requests))
        .route("/engineer/requests/{id}/inspect", post(inspect))
}

async fn assigned_requests(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<PickupRequest>>, AppError> {
    let engineer_id = claims.require(Role::Engineer)?;
    Ok(Json(state.pickups.for_engineer(engineer_id).await?))
}

async fn inspect(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<Inspection>,
) -> Result<Json<PickupRequest>, AppError> {
    let engineer_id = claims.require(Role::Engineer)?;
    Ok(Json(state.pickups.inspect(engineer_id, id, req).await?))
}

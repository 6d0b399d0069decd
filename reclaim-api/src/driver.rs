use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use reclaim_core::{ActiveRoute, CollectionCluster, PickupRequest, Role};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::Claims;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/driver/clusters", get(my_clusters))
        .route("/driver/route", get(current_route))
        .route("/driver/pickups/{id}/collect", post(collect))
        .route("/driver/routes/{id}/complete", post(complete_route))
}

async fn my_clusters(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<CollectionCluster>>, AppError> {
    let driver_id = claims.require(Role::Driver)?;
    Ok(Json(state.pickups.clusters(Some(driver_id)).await?))
}

/// The open route with its stops, or `{"route": null}` when off duty.
async fn current_route(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>, AppError> {
    let driver_id = claims.require(Role::Driver)?;
    let sheet = state.pickups.route_sheet(driver_id).await?;
    Ok(Json(match sheet {
        Some(sheet) => serde_json::to_value(sheet)?,
        None => json!({ "route": null }),
    }))
}

async fn collect(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<PickupRequest>, AppError> {
    let driver_id = claims.require(Role::Driver)?;
    Ok(Json(state.pickups.collect(driver_id, id).await?))
}

async fn complete_route(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActiveRoute>, AppError> {
    let driver_id = claims.require(Role::Driver)?;
    Ok(Json(state.pickups.complete_route(driver_id, id).await?))
}

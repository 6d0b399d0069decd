use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use reclaim_core::{ActiveRoute, CollectionCluster, PickupRequest, PickupStatus, Role};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::Claims;
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub engineer_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CreateClusterRequest {
    pub name: String,
    pub driver_id: Uuid,
    pub engineer_id: Option<Uuid>,
    pub pickup_ids: Vec<Uuid>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/warehouse/requests", get(queue))
        .route("/warehouse/requests/{id}/assign", post(assign))
        .route("/warehouse/requests/{id}/receive", post(receive))
        .route("/warehouse/clusters", get(list_clusters).post(create_cluster))
        .route("/warehouse/clusters/{id}/dispatch", post(dispatch))
}

// ============================================================================
// Handlers
// ============================================================================

async fn queue(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<QueueQuery>,
) -> Result<Json<Vec<PickupRequest>>, AppError> {
    claims.require(Role::Warehouse)?;
    let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(raw.parse::<PickupStatus>()?),
        None => None,
    };
    Ok(Json(state.pickups.queue(status).await?))
}

async fn assign(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignRequest>,
) -> Result<Json<PickupRequest>, AppError> {
    claims.require(Role::Warehouse)?;
    Ok(Json(state.pickups.assign_engineer(id, req.engineer_id).await?))
}

async fn receive(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<PickupRequest>, AppError> {
    let warehouse_id = claims.require(Role::Warehouse)?;
    Ok(Json(state.pickups.receive(warehouse_id, id).await?))
}

async fn create_cluster(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateClusterRequest>,
) -> Result<(StatusCode, Json<CollectionCluster>), AppError> {
    let warehouse_id = claims.require(Role::Warehouse)?;
    let cluster = state
        .pickups
        .create_cluster(warehouse_id, &req.name, req.driver_id, req.engineer_id, &req.pickup_ids)
        .await?;
    Ok((StatusCode::CREATED, Json(cluster)))
}

async fn list_clusters(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<CollectionCluster>>, AppError> {
    claims.require(Role::Warehouse)?;
    Ok(Json(state.pickups.clusters(None).await?))
}

async fn dispatch(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ActiveRoute>), AppError> {
    claims.require(Role::Warehouse)?;
    let route = state.pickups.dispatch(id).await?;
    Ok((StatusCode::CREATED, Json(route)))
}

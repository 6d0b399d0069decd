use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use reclaim_core::{PickupRequest, Role};
use reclaim_pickup::lifecycle::NewPickup;
use uuid::Uuid;

use crate::auth::current_user;
use crate::error::AppError;
use crate::middleware::Claims;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/user/requests", get(list_requests).post(create_request))
        .route("/user/requests/{id}", get(get_request))
}

async fn create_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<NewPickup>,
) -> Result<(StatusCode, Json<PickupRequest>), AppError> {
    claims.require(Role::User)?;
    let user = current_user(&state, &claims).await?;
    let pickup = state.pickups.submit(&user, req).await?;
    Ok((StatusCode::CREATED, Json(pickup)))
}

async fn list_requests(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<PickupRequest>>, AppError> {
    let user_id = claims.require(Role::User)?;
    Ok(Json(state.pickups.for_user(user_id).await?))
}

async fn get_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<PickupRequest>, AppError> {
    let user_id = claims.require(Role::User)?;
    let pickup = state.pickups.get(id).await?;
    if pickup.user_id != user_id {
        return Err(AppError::unauthorized());
    }
    Ok(Json(pickup))
}

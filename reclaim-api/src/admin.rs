use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use reclaim_core::{Role, User};
use serde::Deserialize;

use crate::auth::{create_account, RegisterRequest};
use crate::error::AppError;
use crate::middleware::Claims;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct CreateStaffRequest {
    #[serde(flatten)]
    pub account: RegisterRequest,
    pub role: Role,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/admin/users", get(list_users).post(create_user))
}

async fn list_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<UsersQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    claims.require(Role::Admin)?;
    Ok(Json(state.stores.users.list_users(query.role).await?))
}

async fn create_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateStaffRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    claims.require(Role::Admin)?;
    let user = create_account(&state.stores, req.account, req.role).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

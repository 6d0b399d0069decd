use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Json, Router,
};
use reclaim_core::{Role, Stores, User};
use reclaim_shared::Masked;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::{auth_middleware, issue_token, Claims};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
    pub dashboard: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: User,
    pub dashboard: &'static str,
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(me))
        .route_layer(from_fn_with_state(state, auth_middleware))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

// ============================================================================
// Accounts
// ============================================================================

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| AppError::InternalServerError(format!("Salt generation failed: {}", e)))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::InternalServerError(format!("Password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

/// Validate and store a new account with the given role.
pub async fn create_account(stores: &Stores, req: RegisterRequest, role: Role) -> Result<User, AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::ValidationError("Name is required".to_string()));
    }
    if !req.email.contains('@') {
        return Err(AppError::ValidationError("A valid email is required".to_string()));
    }
    if req.password.len() < 8 {
        return Err(AppError::ValidationError("Password must be at least 8 characters".to_string()));
    }
    if stores.users.find_user_by_email(&req.email).await?.is_some() {
        return Err(AppError::ConflictError("Email is already registered".to_string()));
    }

    let mut user = User::new(name.to_string(), &req.email, hash_password(&req.password)?, role);
    user.phone = req.phone.filter(|p| !p.trim().is_empty()).map(Masked::new);
    user.address = req.address.filter(|a| !a.trim().is_empty()).map(Masked::new);
    stores.users.create_user(&user).await?;

    tracing::info!("Account {} created with role {}", user.id, role);
    Ok(user)
}

// ============================================================================
// Handlers
// ============================================================================

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let user = create_account(&state.stores, req, Role::User).await?;
    let token = issue_token(&user, &state.auth)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse { token, dashboard: user.role.dashboard_path(), user }),
    ))
}

async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Result<Json<AuthResponse>, AppError> {
    let invalid = || AppError::AuthenticationError("Invalid email or password".to_string());

    let user = state.stores.users.find_user_by_email(&req.email).await?.ok_or_else(invalid)?;
    if !verify_password(&req.password, &user.password_hash) {
        tracing::warn!("Failed login for {}", reclaim_shared::pii::redact_email(&user.email));
        return Err(invalid());
    }

    let token = issue_token(&user, &state.auth)?;
    Ok(Json(AuthResponse { token, dashboard: user.role.dashboard_path(), user }))
}

async fn me(State(state): State<AppState>, Extension(claims): Extension<Claims>) -> Result<Json<ProfileResponse>, AppError> {
    let user = current_user(&state, &claims).await?;
    Ok(Json(ProfileResponse { dashboard: user.role.dashboard_path(), user }))
}

/// Load the account behind a token.
pub async fn current_user(state: &AppState, claims: &Claims) -> Result<User, AppError> {
    state
        .stores
        .users
        .get_user(claims.user_id()?)
        .await?
        .ok_or_else(|| AppError::AuthenticationError("Account no longer exists".to_string()))
}

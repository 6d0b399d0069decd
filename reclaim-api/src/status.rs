use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::middleware::auth::bearer_claims;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/status", get(status))
}

/// Where a client should go next: the role dashboard when signed in.
async fn index(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    let redirect = bearer_claims(&headers, &state.auth)
        .and_then(|claims| claims.role().ok())
        .map(|role| role.dashboard_path())
        .unwrap_or("/auth/login");
    Json(json!({ "redirect": redirect }))
}

async fn status(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.stores.health.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok", "database": "ok" }))),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "database": "unavailable" })),
            )
        }
    }
}

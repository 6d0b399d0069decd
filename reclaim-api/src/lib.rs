use axum::{
    extract::{ConnectInfo, Request, State},
    http::{Method, StatusCode},
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod driver;
pub mod engineer;
pub mod error;
pub mod invoices;
pub mod middleware;
pub mod payment;
pub mod pricing;
pub mod state;
pub mod status;
pub mod user;
pub mod warehouse;

pub use state::AppState;

use crate::middleware::auth::auth_middleware;
use crate::middleware::resiliency::circuit_breaker_middleware;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let protected = Router::new()
        .merge(dashboard::routes())
        .merge(user::routes())
        .merge(engineer::routes())
        .merge(warehouse::routes())
        .merge(driver::routes())
        .merge(payment::routes().route_layer(from_fn_with_state(state.clone(), circuit_breaker_middleware)))
        .merge(invoices::routes())
        .merge(admin::routes())
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    let mut router = Router::new()
        .merge(status::routes())
        .merge(pricing::routes())
        .merge(auth::routes(state.clone()))
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    if state.rate_limit.is_some() {
        router = router.layer(from_fn_with_state(state.clone(), rate_limit_middleware));
    }

    router.with_state(state)
}

/// Fixed-window limit per client IP. Fails open when Redis errors.
async fn rate_limit_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(limit) = &state.rate_limit else {
        return next.run(req).await;
    };
    let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>().cloned() else {
        return next.run(req).await;
    };

    let key = format!("ratelimit:{}", addr.ip());
    match limit.redis.check_rate_limit(&key, limit.per_minute, 60).await {
        Ok(true) => next.run(req).await,
        Ok(false) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "Rate limit exceeded" })),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!("Rate limiter unavailable, allowing request: {}", e);
            next.run(req).await
        }
    }
}

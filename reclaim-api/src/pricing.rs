use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use reclaim_pickup::SplitBreakdown;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EstimateQuery {
    #[serde(default)]
    pub weight_grams: f64,
    pub engineer_price: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct EstimateResponse {
    pub amount: i64,
    pub splits: SplitBreakdown,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/pricing/estimate", get(estimate))
}

async fn estimate(
    State(state): State<AppState>,
    Query(query): Query<EstimateQuery>,
) -> Result<Json<EstimateResponse>, AppError> {
    if !query.weight_grams.is_finite() || query.weight_grams < 0.0 {
        return Err(AppError::ValidationError("weight_grams must be a non-negative number".to_string()));
    }
    if query.engineer_price.is_some_and(|p| p < 0) {
        return Err(AppError::ValidationError("engineer_price cannot be negative".to_string()));
    }

    let amount = state.payments.policy().estimate(query.weight_grams, query.engineer_price);
    Ok(Json(EstimateResponse { amount, splits: SplitBreakdown::of(amount) }))
}

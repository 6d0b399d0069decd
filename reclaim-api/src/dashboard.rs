use std::collections::BTreeMap;

use axum::{extract::State, routing::get, Extension, Json, Router};
use reclaim_core::repository::PickupFilter;
use reclaim_core::{PickupRequest, PickupStatus, Role};
use reclaim_pickup::PricingPolicy;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::current_user;
use crate::error::AppError;
use crate::middleware::Claims;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

fn count_by_status(pickups: &[PickupRequest]) -> BTreeMap<&'static str, usize> {
    let mut counts: BTreeMap<&'static str, usize> = PickupStatus::ALL.iter().map(|s| (s.as_str(), 0)).collect();
    for pickup in pickups {
        *counts.entry(pickup.status.as_str()).or_default() += 1;
    }
    counts
}

/// Sum of resolved amounts, saturating at `i64::MAX`.
fn total_amount(policy: &PricingPolicy, pickups: &[PickupRequest]) -> i64 {
    pickups
        .iter()
        .fold(0i64, |total, p| total.saturating_add(policy.resolve_amount(p)))
}

async fn dashboard(State(state): State<AppState>, Extension(claims): Extension<Claims>) -> Result<Json<Value>, AppError> {
    let user = current_user(&state, &claims).await?;
    let counters = counters_for(&state, user.role, user.id).await?;

    let unread = state
        .stores
        .notifications
        .list_notifications(user.id)
        .await?
        .iter()
        .filter(|n| !n.read)
        .count();

    Ok(Json(json!({
        "role": user.role,
        "name": user.name,
        "dashboard": user.role.dashboard_path(),
        "unread_notifications": unread,
        "counters": counters,
    })))
}

async fn counters_for(state: &AppState, role: Role, user_id: Uuid) -> Result<Value, AppError> {
    let counters = match role {
        Role::User => {
            let mine = state.pickups.for_user(user_id).await?;
            json!({
                "requests": mine.len(),
                "by_status": count_by_status(&mine),
            })
        }
        Role::Engineer => {
            let assigned = state.pickups.for_engineer(user_id).await?;
            json!({
                "assigned": assigned.iter().filter(|p| p.status == PickupStatus::Assigned).count(),
                "inspected": assigned.iter().filter(|p| p.status == PickupStatus::Inspected).count(),
                "open": assigned.len(),
            })
        }
        Role::Driver => {
            let clusters = state.pickups.clusters(Some(user_id)).await?;
            let stops = state
                .pickups
                .list(&PickupFilter {
                    driver_id: Some(user_id),
                    status: Some(PickupStatus::Scheduled),
                    ..Default::default()
                })
                .await?;
            let route = state.stores.clusters.active_route_for_driver(user_id).await?;
            json!({
                "clusters": clusters.len(),
                "stops_remaining": stops.len(),
                "active_route": route.map(|r| r.id),
            })
        }
        Role::Warehouse => {
            let all = state.pickups.list(&PickupFilter::default()).await?;
            let clusters = state.pickups.clusters(None).await?;
            json!({
                "by_status": count_by_status(&all),
                "clusters": clusters.len(),
            })
        }
        Role::Recycler => {
            let awaiting = state.pickups.queue(Some(PickupStatus::Collected)).await?;
            let recycled = state.pickups.queue(Some(PickupStatus::Recycled)).await?;
            json!({
                "awaiting_payment": awaiting.len(),
                "awaiting_amount": total_amount(state.payments.policy(), &awaiting),
                "recycled": recycled.len(),
            })
        }
        Role::Admin => {
            let users = state.stores.users.list_users(None).await?;
            let mut by_role: BTreeMap<&'static str, usize> = Role::ALL.iter().map(|r| (r.as_str(), 0)).collect();
            for u in &users {
                *by_role.entry(u.role.as_str()).or_default() += 1;
            }
            json!({ "users": users.len(), "by_role": by_role })
        }
    };
    Ok(counters)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn priced(price: i64) -> PickupRequest {
        let mut p = PickupRequest::new(Uuid::new_v4(), "A".into(), "addr".into(), "tv".into());
        p.engineer_price = Some(price);
        p
    }

    #[test]
    fn test_total_amount_sums_resolved_prices() {
        let policy = PricingPolicy::default();
        assert_eq!(total_amount(&policy, &[]), 0);
        assert_eq!(total_amount(&policy, &[priced(12_000), priced(30_000)]), 42_000);
    }

    #[test]
    fn test_total_amount_saturates() {
        let policy = PricingPolicy::default();
        let pickups = [priced(i64::MAX), priced(i64::MAX), priced(12_000)];
        assert_eq!(total_amount(&policy, &pickups), i64::MAX);
    }
}

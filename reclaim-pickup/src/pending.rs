use reclaim_core::repository::{ClusterRepository, PickupFilter, PickupOrder, PickupRepository};
use reclaim_core::{CoreResult, PickupRequest, PickupStatus, Role};
use serde::Serialize;
use uuid::Uuid;

use crate::finance::{share_bps, share_of, share_percentage};
use crate::pricing::PricingPolicy;

/// A pickup still waiting for payment, with the caller's expected cut.
#[derive(Debug, Clone, Serialize)]
pub struct PendingItem {
    #[serde(flatten)]
    pub pickup: PickupRequest,
    pub estimated_share: i64,
    pub share_percentage: String,
}

impl PendingItem {
    fn estimate(pickup: PickupRequest, role: Role, policy: &PricingPolicy) -> Self {
        let amount = policy.resolve_amount(&pickup);
        Self {
            estimated_share: share_of(amount, share_bps(role)),
            share_percentage: share_percentage(role),
            pickup,
        }
    }
}

/// Pickups that still owe `user_id` money, as seen from `role`.
pub async fn pending_items(
    pickups: &dyn PickupRepository,
    clusters: &dyn ClusterRepository,
    policy: &PricingPolicy,
    role: Role,
    user_id: Uuid,
) -> CoreResult<Vec<PendingItem>> {
    let filter = match role {
        Role::User => PickupFilter {
            user_id: Some(user_id),
            exclude_status: Some(PickupStatus::Recycled),
            ..Default::default()
        },
        Role::Engineer => PickupFilter {
            engineer_id: Some(user_id),
            exclude_status: Some(PickupStatus::Recycled),
            ..Default::default()
        },
        Role::Driver => {
            let ids: Vec<Uuid> = clusters
                .list_clusters(Some(user_id))
                .await?
                .iter()
                .flat_map(|c| c.pickup_ids())
                .collect();
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            PickupFilter {
                ids: Some(ids),
                exclude_status: Some(PickupStatus::Recycled),
                ..Default::default()
            }
        }
        Role::Warehouse => PickupFilter {
            status: Some(PickupStatus::Collected),
            order: PickupOrder::UpdatedDesc,
            ..Default::default()
        },
        Role::Recycler | Role::Admin => return Ok(Vec::new()),
    };

    let items = pickups
        .list_pickups(&filter)
        .await?
        .into_iter()
        .map(|p| PendingItem::estimate(p, role, policy))
        .collect();

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use reclaim_core::{CollectionCluster, Stores};
    use reclaim_store::memory::MemoryStore;

    fn pickup(owner: Uuid, weight: f64) -> PickupRequest {
        let mut p = PickupRequest::new(owner, "Asha".into(), "addr".into(), "monitor".into());
        p.approx_weight = Some(weight);
        p
    }

    async fn seed(stores: &Stores, pickups: &[PickupRequest]) {
        for p in pickups {
            stores.pickups.create_pickup(p).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_user_sees_own_unrecycled_newest_first() {
        let stores = MemoryStore::new().into_stores();
        let policy = PricingPolicy::default();
        let owner = Uuid::new_v4();

        let mut older = pickup(owner, 4_000.0);
        older.created_at = Utc::now() - Duration::hours(2);
        let newer = pickup(owner, 4_000.0);
        let mut done = pickup(owner, 4_000.0);
        done.status = PickupStatus::Recycled;
        let other = pickup(Uuid::new_v4(), 4_000.0);
        seed(&stores, &[older.clone(), newer.clone(), done, other]).await;

        let items = pending_items(stores.pickups.as_ref(), stores.clusters.as_ref(), &policy, Role::User, owner)
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].pickup.id, newer.id);
        assert_eq!(items[1].pickup.id, older.id);
        // 4 kg -> 200 INR, half of it
        assert_eq!(items[0].estimated_share, 10_000);
        assert_eq!(items[0].share_percentage, "50%");
    }

    #[tokio::test]
    async fn test_engineer_sees_assigned_with_engineer_share() {
        let stores = MemoryStore::new().into_stores();
        let policy = PricingPolicy::default();
        let engineer = Uuid::new_v4();

        let mut assigned = pickup(Uuid::new_v4(), 0.0);
        assigned.engineer_id = Some(engineer);
        assigned.engineer_price = Some(100_000);
        let unassigned = pickup(Uuid::new_v4(), 1_000.0);
        seed(&stores, &[assigned.clone(), unassigned]).await;

        let items = pending_items(stores.pickups.as_ref(), stores.clusters.as_ref(), &policy, Role::Engineer, engineer)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].estimated_share, 15_000);
        assert_eq!(items[0].share_percentage, "15%");
    }

    #[tokio::test]
    async fn test_driver_sees_pickups_in_own_clusters() {
        let stores = MemoryStore::new().into_stores();
        let policy = PricingPolicy::default();
        let driver = Uuid::new_v4();

        let a = pickup(Uuid::new_v4(), 2_000.0);
        let b = pickup(Uuid::new_v4(), 2_000.0);
        let elsewhere = pickup(Uuid::new_v4(), 2_000.0);
        seed(&stores, &[a.clone(), b.clone(), elsewhere.clone()]).await;

        let mut mine = CollectionCluster::new("East".into(), driver, Uuid::new_v4());
        mine.add_stop(a.id, a.user_id);
        mine.add_stop(b.id, b.user_id);
        stores.clusters.create_cluster(&mine).await.unwrap();

        let mut theirs = CollectionCluster::new("West".into(), Uuid::new_v4(), Uuid::new_v4());
        theirs.add_stop(elsewhere.id, elsewhere.user_id);
        stores.clusters.create_cluster(&theirs).await.unwrap();

        let items = pending_items(stores.pickups.as_ref(), stores.clusters.as_ref(), &policy, Role::Driver, driver)
            .await
            .unwrap();
        let ids: Vec<Uuid> = items.iter().map(|i| i.pickup.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&a.id) && ids.contains(&b.id));
        // 2 kg -> 100 INR, 10%
        assert!(items.iter().all(|i| i.estimated_share == 1_000));

        let nobody = pending_items(stores.pickups.as_ref(), stores.clusters.as_ref(), &policy, Role::Driver, Uuid::new_v4())
            .await
            .unwrap();
        assert!(nobody.is_empty());
    }

    #[tokio::test]
    async fn test_warehouse_sees_collected_by_update_time() {
        let stores = MemoryStore::new().into_stores();
        let policy = PricingPolicy::default();

        let mut first = pickup(Uuid::new_v4(), 8_000.0);
        first.status = PickupStatus::Collected;
        first.updated_at = Utc::now() - Duration::minutes(30);
        let mut second = pickup(Uuid::new_v4(), 8_000.0);
        second.status = PickupStatus::Collected;
        let scheduled = {
            let mut p = pickup(Uuid::new_v4(), 8_000.0);
            p.status = PickupStatus::Scheduled;
            p
        };
        seed(&stores, &[first.clone(), second.clone(), scheduled]).await;

        let items = pending_items(stores.pickups.as_ref(), stores.clusters.as_ref(), &policy, Role::Warehouse, Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].pickup.id, second.id);
        assert_eq!(items[0].estimated_share, 10_000);
    }

    #[tokio::test]
    async fn test_recycler_has_nothing_pending() {
        let stores = MemoryStore::new().into_stores();
        let items = pending_items(
            stores.pickups.as_ref(),
            stores.clusters.as_ref(),
            &PricingPolicy::default(),
            Role::Recycler,
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        assert!(items.is_empty());
    }
}

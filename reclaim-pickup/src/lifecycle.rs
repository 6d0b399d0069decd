use chrono::{NaiveDate, Utc};
use reclaim_core::repository::{PickupFilter, PickupOrder};
use reclaim_core::{
    ActiveRoute, CollectionCluster, CoreError, CoreResult, Notification, PickupRequest,
    PickupStatus, Role, Stores, User,
};
use reclaim_shared::models::events::PickupUpdatedEvent;
use serde::Deserialize;
use uuid::Uuid;

/// Fields a user supplies when asking for a pickup.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPickup {
    pub item_description: String,
    pub address: Option<String>,
    pub category: Option<String>,
    pub approx_weight: Option<f64>,
    pub scheduled_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// An engineer's inspection result. Price is paise.
#[derive(Debug, Clone, Deserialize)]
pub struct Inspection {
    pub final_weight: f64,
    pub engineer_price: Option<i64>,
    pub notes: Option<String>,
}

/// A driver's route with the pickups it visits, in stop order.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RouteSheet {
    pub route: ActiveRoute,
    pub cluster: CollectionCluster,
    pub pickups: Vec<PickupRequest>,
}

/// Drives pickups from request to collection.
pub struct PickupManager {
    stores: Stores,
}

impl PickupManager {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub async fn submit(&self, user: &User, request: NewPickup) -> CoreResult<PickupRequest> {
        let description = request.item_description.trim();
        if description.is_empty() {
            return Err(CoreError::ValidationError("Item description is required".to_string()));
        }

        let address = request
            .address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .or_else(|| user.address.as_ref().map(|a| a.expose().clone()))
            .ok_or_else(|| CoreError::ValidationError("Pickup address is required".to_string()))?;

        if let Some(weight) = request.approx_weight {
            if !weight.is_finite() || weight < 0.0 {
                return Err(CoreError::ValidationError("Weight must be a non-negative number".to_string()));
            }
        }

        let mut pickup = PickupRequest::new(user.id, user.name.clone(), address, description.to_string());
        pickup.category = request.category;
        pickup.approx_weight = request.approx_weight;
        pickup.scheduled_date = request.scheduled_date;
        pickup.notes = request.notes;

        self.stores.pickups.create_pickup(&pickup).await?;
        tracing::info!("Pickup {} requested by user {}", pickup.id, user.id);
        Ok(pickup)
    }

    pub async fn get(&self, pickup_id: Uuid) -> CoreResult<PickupRequest> {
        self.stores
            .pickups
            .get_pickup(pickup_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("Pickup not found".to_string()))
    }

    pub async fn list(&self, filter: &PickupFilter) -> CoreResult<Vec<PickupRequest>> {
        self.stores.pickups.list_pickups(filter).await
    }

    pub async fn for_user(&self, user_id: Uuid) -> CoreResult<Vec<PickupRequest>> {
        self.list(&PickupFilter { user_id: Some(user_id), ..Default::default() }).await
    }

    pub async fn for_engineer(&self, engineer_id: Uuid) -> CoreResult<Vec<PickupRequest>> {
        self.list(&PickupFilter {
            engineer_id: Some(engineer_id),
            exclude_status: Some(PickupStatus::Recycled),
            ..Default::default()
        })
        .await
    }

    /// Warehouse queue. Without a status, everything not yet recycled.
    pub async fn queue(&self, status: Option<PickupStatus>) -> CoreResult<Vec<PickupRequest>> {
        let filter = match status {
            Some(status) => PickupFilter { status: Some(status), order: PickupOrder::UpdatedDesc, ..Default::default() },
            None => PickupFilter { exclude_status: Some(PickupStatus::Recycled), ..Default::default() },
        };
        self.list(&filter).await
    }

    pub async fn assign_engineer(&self, pickup_id: Uuid, engineer_id: Uuid) -> CoreResult<PickupRequest> {
        self.require_role(engineer_id, Role::Engineer).await?;

        let mut pickup = self.get(pickup_id).await?;
        pickup.advance(PickupStatus::Assigned)?;
        pickup.engineer_id = Some(engineer_id);
        self.stores.pickups.save_pickup(&pickup).await?;

        self.notify(engineer_id, &pickup).await?;
        tracing::info!("Pickup {} assigned to engineer {}", pickup_id, engineer_id);
        Ok(pickup)
    }

    pub async fn inspect(&self, engineer_id: Uuid, pickup_id: Uuid, inspection: Inspection) -> CoreResult<PickupRequest> {
        if !inspection.final_weight.is_finite() || inspection.final_weight < 0.0 {
            return Err(CoreError::ValidationError("Weight must be a non-negative number".to_string()));
        }
        if inspection.engineer_price.is_some_and(|p| p < 0) {
            return Err(CoreError::ValidationError("Price cannot be negative".to_string()));
        }

        let mut pickup = self.get(pickup_id).await?;
        if pickup.engineer_id != Some(engineer_id) {
            return Err(CoreError::Forbidden("Pickup is assigned to another engineer".to_string()));
        }

        pickup.advance(PickupStatus::Inspected)?;
        pickup.final_weight = Some(inspection.final_weight);
        pickup.engineer_price = inspection.engineer_price;
        if inspection.notes.is_some() {
            pickup.notes = inspection.notes;
        }
        self.stores.pickups.save_pickup(&pickup).await?;

        self.notify(pickup.user_id, &pickup).await?;
        Ok(pickup)
    }

    /// Group pickups into a driver's cluster, in the given stop order.
    pub async fn create_cluster(
        &self,
        warehouse_id: Uuid,
        name: &str,
        driver_id: Uuid,
        engineer_id: Option<Uuid>,
        pickup_ids: &[Uuid],
    ) -> CoreResult<CollectionCluster> {
        if name.trim().is_empty() {
            return Err(CoreError::ValidationError("Cluster name is required".to_string()));
        }
        if pickup_ids.is_empty() {
            return Err(CoreError::ValidationError("A cluster needs at least one pickup".to_string()));
        }
        self.require_role(driver_id, Role::Driver).await?;
        if let Some(engineer_id) = engineer_id {
            self.require_role(engineer_id, Role::Engineer).await?;
        }

        let mut pickups = Vec::with_capacity(pickup_ids.len());
        for id in pickup_ids {
            if pickups.iter().any(|p: &PickupRequest| p.id == *id) {
                return Err(CoreError::ValidationError(format!("Pickup {} listed twice", id)));
            }
            let pickup = self.get(*id).await?;
            if pickup.cluster_id.is_some() {
                return Err(CoreError::Conflict(format!("Pickup {} is already clustered", id)));
            }
            if !pickup.status.can_transition_to(PickupStatus::Scheduled) {
                return Err(CoreError::Conflict(format!("Pickup {} is already {}", id, pickup.status)));
            }
            pickups.push(pickup);
        }

        let mut cluster = CollectionCluster::new(name.trim().to_string(), driver_id, warehouse_id);
        cluster.engineer_id = engineer_id;
        for pickup in &pickups {
            cluster.add_stop(pickup.id, pickup.user_id);
        }
        self.stores.clusters.create_cluster(&cluster).await?;

        for mut pickup in pickups {
            pickup.advance(PickupStatus::Scheduled)?;
            pickup.driver_id = Some(driver_id);
            pickup.cluster_id = Some(cluster.id);
            pickup.warehouse_id = Some(warehouse_id);
            if pickup.engineer_id.is_none() {
                pickup.engineer_id = engineer_id;
            }
            self.stores.pickups.save_pickup(&pickup).await?;
            self.notify(pickup.user_id, &pickup).await?;
        }

        self.stores
            .notifications
            .push_notification(&Notification::new(
                driver_id,
                "cluster",
                format!("Cluster {} with {} stops assigned to you", cluster.name, cluster.stops.len()),
                None,
            ))
            .await?;

        tracing::info!("Cluster {} created with {} stops for driver {}", cluster.id, cluster.stops.len(), driver_id);
        Ok(cluster)
    }

    pub async fn clusters(&self, driver_id: Option<Uuid>) -> CoreResult<Vec<CollectionCluster>> {
        self.stores.clusters.list_clusters(driver_id).await
    }

    /// Start the cluster's route. One open route per cluster.
    pub async fn dispatch(&self, cluster_id: Uuid) -> CoreResult<ActiveRoute> {
        let cluster = self
            .stores
            .clusters
            .get_cluster(cluster_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("Cluster not found".to_string()))?;

        if self.stores.clusters.active_route_for_cluster(cluster_id).await?.is_some() {
            return Err(CoreError::Conflict(format!("Cluster {} is already on the road", cluster_id)));
        }

        let route = ActiveRoute::start(&cluster);
        self.stores.clusters.create_route(&route).await?;
        tracing::info!("Route {} dispatched for cluster {}", route.id, cluster_id);
        Ok(route)
    }

    /// The driver's open route with its pickups in stop order.
    pub async fn route_sheet(&self, driver_id: Uuid) -> CoreResult<Option<RouteSheet>> {
        let Some(route) = self.stores.clusters.active_route_for_driver(driver_id).await? else {
            return Ok(None);
        };
        let cluster = self
            .stores
            .clusters
            .get_cluster(route.cluster_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("Cluster not found".to_string()))?;

        let mut pickups = Vec::with_capacity(cluster.stops.len());
        for stop in &cluster.stops {
            if let Some(p) = self.stores.pickups.get_pickup(stop.pickup_id).await? {
                pickups.push(p);
            }
        }

        Ok(Some(RouteSheet { route, cluster, pickups }))
    }

    pub async fn collect(&self, driver_id: Uuid, pickup_id: Uuid) -> CoreResult<PickupRequest> {
        let mut pickup = self.get(pickup_id).await?;
        if pickup.driver_id != Some(driver_id) {
            return Err(CoreError::Forbidden("Pickup is not on your route".to_string()));
        }
        pickup.advance(PickupStatus::Collected)?;
        self.stores.pickups.save_pickup(&pickup).await?;
        self.notify(pickup.user_id, &pickup).await?;
        Ok(pickup)
    }

    pub async fn complete_route(&self, driver_id: Uuid, route_id: Uuid) -> CoreResult<ActiveRoute> {
        let mut route = self
            .stores
            .clusters
            .get_route(route_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("Route not found".to_string()))?;
        if route.driver_id != driver_id {
            return Err(CoreError::Forbidden("Route belongs to another driver".to_string()));
        }
        route.complete()?;
        self.stores.clusters.save_route(&route).await?;
        Ok(route)
    }

    /// Book a collected pickup into a warehouse.
    pub async fn receive(&self, warehouse_id: Uuid, pickup_id: Uuid) -> CoreResult<PickupRequest> {
        let mut pickup = self.get(pickup_id).await?;
        if pickup.status != PickupStatus::Collected {
            return Err(CoreError::Conflict(format!("Pickup {} is {}, not collected", pickup_id, pickup.status)));
        }
        pickup.warehouse_id = Some(warehouse_id);
        pickup.touch();
        self.stores.pickups.save_pickup(&pickup).await?;
        Ok(pickup)
    }

    async fn require_role(&self, user_id: Uuid, role: Role) -> CoreResult<User> {
        let user = self
            .stores
            .users
            .get_user(user_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("{} {} not found", role, user_id)))?;
        if user.role != role {
            return Err(CoreError::ValidationError(format!("User {} is not a {}", user_id, role)));
        }
        Ok(user)
    }

    async fn notify(&self, recipient_id: Uuid, pickup: &PickupRequest) -> CoreResult<()> {
        let event = PickupUpdatedEvent {
            pickup_id: pickup.id,
            recipient_id,
            status: pickup.status.to_string(),
            timestamp: Utc::now(),
        };
        self.stores
            .notifications
            .push_notification(&Notification::new(recipient_id, "pickup", event.message(), Some(pickup.id)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reclaim_store::memory::MemoryStore;

    async fn staff(stores: &Stores, role: Role) -> User {
        let user = User::new(format!("{} one", role), &format!("{}-{}@example.com", role, Uuid::new_v4()), "hash".into(), role);
        stores.users.create_user(&user).await.unwrap();
        user
    }

    fn request(desc: &str) -> NewPickup {
        NewPickup {
            item_description: desc.to_string(),
            address: Some("12 MG Road".to_string()),
            category: Some("laptop".to_string()),
            approx_weight: Some(2_500.0),
            scheduled_date: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_full_pickup_lifecycle() {
        let stores = MemoryStore::new().into_stores();
        let manager = PickupManager::new(stores.clone());
        let owner = staff(&stores, Role::User).await;
        let engineer = staff(&stores, Role::Engineer).await;
        let driver = staff(&stores, Role::Driver).await;
        let warehouse = staff(&stores, Role::Warehouse).await;

        let pickup = manager.submit(&owner, request("Old laptop")).await.unwrap();
        assert_eq!(pickup.status, PickupStatus::Pending);

        manager.assign_engineer(pickup.id, engineer.id).await.unwrap();
        let inspected = manager
            .inspect(engineer.id, pickup.id, Inspection { final_weight: 2_300.0, engineer_price: Some(45_000), notes: None })
            .await
            .unwrap();
        assert_eq!(inspected.status, PickupStatus::Inspected);
        assert_eq!(inspected.engineer_price, Some(45_000));

        let cluster = manager
            .create_cluster(warehouse.id, "Indiranagar", driver.id, None, &[pickup.id])
            .await
            .unwrap();
        assert_eq!(cluster.stops.len(), 1);

        let route = manager.dispatch(cluster.id).await.unwrap();
        assert!(manager.dispatch(cluster.id).await.is_err());

        let sheet = manager.route_sheet(driver.id).await.unwrap().unwrap();
        assert_eq!(sheet.pickups[0].status, PickupStatus::Scheduled);

        let collected = manager.collect(driver.id, pickup.id).await.unwrap();
        assert_eq!(collected.status, PickupStatus::Collected);

        manager.receive(warehouse.id, pickup.id).await.unwrap();
        manager.complete_route(driver.id, route.id).await.unwrap();
        assert!(manager.route_sheet(driver.id).await.unwrap().is_none());

        let owner_notes = stores.notifications.list_notifications(owner.id).await.unwrap();
        assert!(owner_notes.len() >= 3);
    }

    #[tokio::test]
    async fn test_submit_validates_input() {
        let stores = MemoryStore::new().into_stores();
        let manager = PickupManager::new(stores.clone());
        let owner = staff(&stores, Role::User).await;

        assert!(manager.submit(&owner, request("   ")).await.is_err());

        let mut no_address = request("TV");
        no_address.address = None;
        assert!(matches!(manager.submit(&owner, no_address).await, Err(CoreError::ValidationError(_))));

        let mut negative = request("TV");
        negative.approx_weight = Some(-5.0);
        assert!(manager.submit(&owner, negative).await.is_err());
    }

    #[tokio::test]
    async fn test_only_assigned_engineer_inspects() {
        let stores = MemoryStore::new().into_stores();
        let manager = PickupManager::new(stores.clone());
        let owner = staff(&stores, Role::User).await;
        let engineer = staff(&stores, Role::Engineer).await;
        let intruder = staff(&stores, Role::Engineer).await;

        let pickup = manager.submit(&owner, request("Printer")).await.unwrap();
        manager.assign_engineer(pickup.id, engineer.id).await.unwrap();

        let err = manager
            .inspect(intruder.id, pickup.id, Inspection { final_weight: 1.0, engineer_price: None, notes: None })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_assign_requires_engineer_role() {
        let stores = MemoryStore::new().into_stores();
        let manager = PickupManager::new(stores.clone());
        let owner = staff(&stores, Role::User).await;
        let driver = staff(&stores, Role::Driver).await;

        let pickup = manager.submit(&owner, request("Fridge")).await.unwrap();
        assert!(manager.assign_engineer(pickup.id, driver.id).await.is_err());
    }

    #[tokio::test]
    async fn test_pickup_cannot_join_two_clusters() {
        let stores = MemoryStore::new().into_stores();
        let manager = PickupManager::new(stores.clone());
        let owner = staff(&stores, Role::User).await;
        let driver = staff(&stores, Role::Driver).await;
        let warehouse = staff(&stores, Role::Warehouse).await;

        let pickup = manager.submit(&owner, request("Microwave")).await.unwrap();
        manager.create_cluster(warehouse.id, "A", driver.id, None, &[pickup.id]).await.unwrap();
        let err = manager
            .create_cluster(warehouse.id, "B", driver.id, None, &[pickup.id])
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_driver_cannot_collect_foreign_pickup() {
        let stores = MemoryStore::new().into_stores();
        let manager = PickupManager::new(stores.clone());
        let owner = staff(&stores, Role::User).await;
        let driver = staff(&stores, Role::Driver).await;
        let other = staff(&stores, Role::Driver).await;
        let warehouse = staff(&stores, Role::Warehouse).await;

        let pickup = manager.submit(&owner, request("Router")).await.unwrap();
        manager.create_cluster(warehouse.id, "A", driver.id, None, &[pickup.id]).await.unwrap();
        assert!(matches!(manager.collect(other.id, pickup.id).await, Err(CoreError::Forbidden(_))));
        assert!(matches!(manager.receive(warehouse.id, pickup.id).await, Err(CoreError::Conflict(_))));
    }
}

use async_trait::async_trait;
use reclaim_core::repository::{
    ClusterRepository, HealthCheck, InvoiceRepository, NotificationRepository, OrderRepository,
    PickupFilter, PickupOrder, PickupRepository, UserRepository,
};
use reclaim_core::payment::GatewayOrder;
use reclaim_core::{
    ActiveRoute, CollectionCluster, CoreError, CoreResult, Invoice, Notification, PaymentStatus,
    PickupRequest, PickupStatus, Role, RouteStatus, Settlement, Stores, User,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    pickups: HashMap<Uuid, PickupRequest>,
    clusters: HashMap<Uuid, CollectionCluster>,
    routes: HashMap<Uuid, ActiveRoute>,
    invoices: Vec<Invoice>,
    orders: HashMap<String, GatewayOrder>,
    notifications: Vec<Notification>,
}

/// Process-local store used when no database is configured, and in tests.
/// Every operation runs under one lock, so settlements are atomic.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_stores(self) -> Stores {
        Stores {
            users: Arc::new(self.clone()),
            pickups: Arc::new(self.clone()),
            clusters: Arc::new(self.clone()),
            invoices: Arc::new(self.clone()),
            orders: Arc::new(self.clone()),
            notifications: Arc::new(self.clone()),
            health: Arc::new(self),
        }
    }
}

fn sort_pickups(pickups: &mut [PickupRequest], order: PickupOrder) {
    match order {
        PickupOrder::CreatedDesc => pickups.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        PickupOrder::UpdatedDesc => pickups.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: &User) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(CoreError::Conflict(format!("Email {} is already registered", user.email)));
        }
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> CoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        let email = reclaim_core::identity::normalize_email(email);
        Ok(self.inner.read().await.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self, role: Option<Role>) -> CoreResult<Vec<User>> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner
            .users
            .values()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }
}

#[async_trait]
impl PickupRepository for MemoryStore {
    async fn create_pickup(&self, pickup: &PickupRequest) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.pickups.contains_key(&pickup.id) {
            return Err(CoreError::Conflict(format!("Pickup {} already exists", pickup.id)));
        }
        inner.pickups.insert(pickup.id, pickup.clone());
        Ok(())
    }

    async fn get_pickup(&self, id: Uuid) -> CoreResult<Option<PickupRequest>> {
        Ok(self.inner.read().await.pickups.get(&id).cloned())
    }

    async fn save_pickup(&self, pickup: &PickupRequest) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        match inner.pickups.get_mut(&pickup.id) {
            Some(slot) if slot.is_settled() => {
                Err(CoreError::Conflict(format!("Pickup {} has already been paid", pickup.id)))
            }
            Some(slot) => {
                *slot = pickup.clone();
                Ok(())
            }
            None => Err(CoreError::NotFound(format!("Pickup {} not found", pickup.id))),
        }
    }

    async fn list_pickups(&self, filter: &PickupFilter) -> CoreResult<Vec<PickupRequest>> {
        let inner = self.inner.read().await;
        let mut pickups: Vec<PickupRequest> = inner
            .pickups
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        sort_pickups(&mut pickups, filter.order);
        Ok(pickups)
    }
}

#[async_trait]
impl ClusterRepository for MemoryStore {
    async fn create_cluster(&self, cluster: &CollectionCluster) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.clusters.contains_key(&cluster.id) {
            return Err(CoreError::Conflict(format!("Cluster {} already exists", cluster.id)));
        }
        // A pickup belongs to at most one cluster
        if let Some(taken) = cluster
            .pickup_ids()
            .into_iter()
            .find(|id| inner.clusters.values().any(|c| c.contains(*id)))
        {
            return Err(CoreError::Conflict(format!("Pickup {} is already in a cluster", taken)));
        }
        inner.clusters.insert(cluster.id, cluster.clone());
        Ok(())
    }

    async fn get_cluster(&self, id: Uuid) -> CoreResult<Option<CollectionCluster>> {
        Ok(self.inner.read().await.clusters.get(&id).cloned())
    }

    async fn list_clusters(&self, driver_id: Option<Uuid>) -> CoreResult<Vec<CollectionCluster>> {
        let inner = self.inner.read().await;
        let mut clusters: Vec<CollectionCluster> = inner
            .clusters
            .values()
            .filter(|c| driver_id.map_or(true, |d| c.driver_id == d))
            .cloned()
            .collect();
        clusters.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(clusters)
    }

    async fn find_cluster_for_pickup(&self, pickup_id: Uuid) -> CoreResult<Option<CollectionCluster>> {
        let inner = self.inner.read().await;
        Ok(inner.clusters.values().find(|c| c.contains(pickup_id)).cloned())
    }

    async fn create_route(&self, route: &ActiveRoute) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        let open = route.status == RouteStatus::InProgress
            && inner
                .routes
                .values()
                .any(|r| r.cluster_id == route.cluster_id && r.status == RouteStatus::InProgress);
        if open {
            return Err(CoreError::Conflict(format!(
                "Cluster {} already has a route in progress",
                route.cluster_id
            )));
        }
        inner.routes.insert(route.id, route.clone());
        Ok(())
    }

    async fn get_route(&self, id: Uuid) -> CoreResult<Option<ActiveRoute>> {
        Ok(self.inner.read().await.routes.get(&id).cloned())
    }

    async fn save_route(&self, route: &ActiveRoute) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        match inner.routes.get_mut(&route.id) {
            Some(slot) => {
                *slot = route.clone();
                Ok(())
            }
            None => Err(CoreError::NotFound(format!("Route {} not found", route.id))),
        }
    }

    async fn active_route_for_driver(&self, driver_id: Uuid) -> CoreResult<Option<ActiveRoute>> {
        let inner = self.inner.read().await;
        Ok(inner
            .routes
            .values()
            .filter(|r| r.driver_id == driver_id && r.status == RouteStatus::InProgress)
            .max_by_key(|r| r.started_at)
            .cloned())
    }

    async fn active_route_for_cluster(&self, cluster_id: Uuid) -> CoreResult<Option<ActiveRoute>> {
        let inner = self.inner.read().await;
        Ok(inner
            .routes
            .values()
            .find(|r| r.cluster_id == cluster_id && r.status == RouteStatus::InProgress)
            .cloned())
    }
}

#[async_trait]
impl InvoiceRepository for MemoryStore {
    async fn record_settlement(&self, settlement: &Settlement) -> CoreResult<()> {
        let mut inner = self.inner.write().await;

        let pickup = inner
            .pickups
            .get_mut(&settlement.pickup_id)
            .ok_or_else(|| CoreError::NotFound(format!("Pickup {} not found", settlement.pickup_id)))?;

        if pickup.is_settled() {
            return Err(CoreError::Conflict(format!("Pickup {} has already been paid", settlement.pickup_id)));
        }

        pickup.status = PickupStatus::Recycled;
        pickup.payment_status = PaymentStatus::Paid;
        pickup.transaction_id = Some(settlement.transaction_id.clone());
        pickup.updated_at = settlement.settled_at;

        inner.invoices.extend(settlement.invoices.iter().cloned());
        inner.notifications.extend(settlement.notifications.iter().cloned());
        Ok(())
    }

    async fn list_invoices(&self, recipient_id: Uuid, include_role: Option<Role>) -> CoreResult<Vec<Invoice>> {
        let inner = self.inner.read().await;
        let mut invoices: Vec<Invoice> = inner
            .invoices
            .iter()
            .filter(|i| i.recipient_id == Some(recipient_id) || include_role == Some(i.recipient_role))
            .cloned()
            .collect();
        invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invoices)
    }

    async fn invoices_for_pickup(&self, pickup_id: Uuid) -> CoreResult<Vec<Invoice>> {
        let inner = self.inner.read().await;
        Ok(inner.invoices.iter().filter(|i| i.pickup_id == pickup_id).cloned().collect())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn record_order(&self, order: &GatewayOrder) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.orders.contains_key(&order.id) {
            return Err(CoreError::Conflict(format!("Order {} already exists", order.id)));
        }
        inner.orders.insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn get_order(&self, id: &str) -> CoreResult<Option<GatewayOrder>> {
        Ok(self.inner.read().await.orders.get(id).cloned())
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn push_notification(&self, notification: &Notification) -> CoreResult<()> {
        self.inner.write().await.notifications.push(notification.clone());
        Ok(())
    }

    async fn list_notifications(&self, recipient_id: Uuid) -> CoreResult<Vec<Notification>> {
        let inner = self.inner.read().await;
        let mut notes: Vec<Notification> = inner
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id)
            .cloned()
            .collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notes)
    }

    async fn mark_read(&self, recipient_id: Uuid, id: Uuid) -> CoreResult<bool> {
        let mut inner = self.inner.write().await;
        match inner
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.recipient_id == recipient_id)
        {
            Some(n) => {
                n.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl HealthCheck for MemoryStore {
    async fn ping(&self) -> CoreResult<()> {
        Ok(())
    }
}

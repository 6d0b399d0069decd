use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::cluster::{ActiveRoute, CollectionCluster};
use crate::identity::{Role, User};
use crate::invoice::{Invoice, Notification, Settlement};
use crate::payment::GatewayOrder;
use crate::pickup::{PickupRequest, PickupStatus};
use crate::CoreResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PickupOrder {
    #[default]
    CreatedDesc,
    UpdatedDesc,
}

/// Conjunctive filter over pickup requests. `None` fields match anything.
#[derive(Debug, Clone, Default)]
pub struct PickupFilter {
    pub ids: Option<Vec<Uuid>>,
    pub user_id: Option<Uuid>,
    pub engineer_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub status: Option<PickupStatus>,
    pub exclude_status: Option<PickupStatus>,
    pub order: PickupOrder,
}

impl PickupFilter {
    pub fn matches(&self, pickup: &PickupRequest) -> bool {
        if let Some(ids) = &self.ids {
            if !ids.contains(&pickup.id) {
                return false;
            }
        }
        if self.user_id.is_some_and(|id| pickup.user_id != id) {
            return false;
        }
        if self.engineer_id.is_some_and(|id| pickup.engineer_id != Some(id)) {
            return false;
        }
        if self.driver_id.is_some_and(|id| pickup.driver_id != Some(id)) {
            return false;
        }
        if self.status.is_some_and(|s| pickup.status != s) {
            return false;
        }
        if self.exclude_status.is_some_and(|s| pickup.status == s) {
            return false;
        }
        true
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the email is taken.
    async fn create_user(&self, user: &User) -> CoreResult<()>;

    async fn get_user(&self, id: Uuid) -> CoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> CoreResult<Option<User>>;

    async fn list_users(&self, role: Option<Role>) -> CoreResult<Vec<User>>;
}

#[async_trait]
pub trait PickupRepository: Send + Sync {
    async fn create_pickup(&self, pickup: &PickupRequest) -> CoreResult<()>;

    async fn get_pickup(&self, id: Uuid) -> CoreResult<Option<PickupRequest>>;

    /// Overwrite a stored pickup. `NotFound` if it does not exist,
    /// `Conflict` if it has been settled since it was read.
    async fn save_pickup(&self, pickup: &PickupRequest) -> CoreResult<()>;

    async fn list_pickups(&self, filter: &PickupFilter) -> CoreResult<Vec<PickupRequest>>;
}

#[async_trait]
pub trait ClusterRepository: Send + Sync {
    async fn create_cluster(&self, cluster: &CollectionCluster) -> CoreResult<()>;

    async fn get_cluster(&self, id: Uuid) -> CoreResult<Option<CollectionCluster>>;

    async fn list_clusters(&self, driver_id: Option<Uuid>) -> CoreResult<Vec<CollectionCluster>>;

    async fn find_cluster_for_pickup(&self, pickup_id: Uuid) -> CoreResult<Option<CollectionCluster>>;

    async fn create_route(&self, route: &ActiveRoute) -> CoreResult<()>;

    async fn get_route(&self, id: Uuid) -> CoreResult<Option<ActiveRoute>>;

    async fn save_route(&self, route: &ActiveRoute) -> CoreResult<()>;

    /// The in-progress route of a driver, if any.
    async fn active_route_for_driver(&self, driver_id: Uuid) -> CoreResult<Option<ActiveRoute>>;

    async fn active_route_for_cluster(&self, cluster_id: Uuid) -> CoreResult<Option<ActiveRoute>>;
}

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Atomically write the invoices and notifications and mark the pickup
    /// recycled and paid. `Conflict` if the pickup was already settled.
    async fn record_settlement(&self, settlement: &Settlement) -> CoreResult<()>;

    /// Invoices addressed to `recipient_id`, plus every invoice for
    /// `include_role` when given. Newest first.
    async fn list_invoices(
        &self,
        recipient_id: Uuid,
        include_role: Option<Role>,
    ) -> CoreResult<Vec<Invoice>>;

    async fn invoices_for_pickup(&self, pickup_id: Uuid) -> CoreResult<Vec<Invoice>>;
}

/// Gateway orders as opened at checkout, so a confirmation can be matched
/// to the pickup and amount it was issued for.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// `Conflict` if an order with the same provider id exists.
    async fn record_order(&self, order: &GatewayOrder) -> CoreResult<()>;

    async fn get_order(&self, id: &str) -> CoreResult<Option<GatewayOrder>>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn push_notification(&self, notification: &Notification) -> CoreResult<()>;

    async fn list_notifications(&self, recipient_id: Uuid) -> CoreResult<Vec<Notification>>;

    /// `false` when no such notification belongs to the recipient.
    async fn mark_read(&self, recipient_id: Uuid, id: Uuid) -> CoreResult<bool>;
}

/// Connectivity check for the status route.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> CoreResult<()>;
}

/// Every repository the services need, behind trait objects so the
/// Postgres and in-memory stores are interchangeable.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserRepository>,
    pub pickups: Arc<dyn PickupRepository>,
    pub clusters: Arc<dyn ClusterRepository>,
    pub invoices: Arc<dyn InvoiceRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub health: Arc<dyn HealthCheck>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_matches_conjunctively() {
        let owner = Uuid::new_v4();
        let mut p = PickupRequest::new(owner, "Asha".into(), "addr".into(), "tv".into());

        let mine = PickupFilter { user_id: Some(owner), exclude_status: Some(PickupStatus::Recycled), ..Default::default() };
        assert!(mine.matches(&p));

        p.status = PickupStatus::Recycled;
        assert!(!mine.matches(&p));

        let by_engineer = PickupFilter { engineer_id: Some(Uuid::new_v4()), ..Default::default() };
        assert!(!by_engineer.matches(&p));

        let by_ids = PickupFilter { ids: Some(vec![p.id]), status: Some(PickupStatus::Recycled), ..Default::default() };
        assert!(by_ids.matches(&p));
    }
}

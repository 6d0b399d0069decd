use chrono::Utc;
use reclaim_core::payment::{GatewayOrder, PaymentConfirmation, PaymentGateway};
use reclaim_core::{
    CoreError, CoreResult, Invoice, Notification, PickupRequest, Role, Settlement, Stores,
};
use reclaim_shared::models::events::PayoutEvent;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::finance::{share_bps, SplitBreakdown, PAYEE_ROLES};
use crate::pending::{pending_items, PendingItem};
use crate::pricing::PricingPolicy;

/// What the recycler sees before paying.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentPreview {
    pub pickup_id: Uuid,
    pub amount: i64,
    pub splits: SplitBreakdown,
    pub user_name: String,
}

/// A gateway order plus the pickup it was opened for.
#[derive(Debug, Clone)]
pub struct Checkout {
    pub order: GatewayOrder,
    pub pickup: PickupRequest,
}

/// Who gets paid for a pickup, by role.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payees {
    pub user: Option<Uuid>,
    pub driver: Option<Uuid>,
    pub engineer: Option<Uuid>,
    pub warehouse: Option<Uuid>,
}

impl Payees {
    pub fn for_role(&self, role: Role) -> Option<Uuid> {
        match role {
            Role::User => self.user,
            Role::Driver => self.driver,
            Role::Engineer => self.engineer,
            Role::Warehouse => self.warehouse,
            _ => None,
        }
    }
}

/// Takes payment for pickups and splits it into invoices.
pub struct PaymentService {
    gateway: Arc<dyn PaymentGateway>,
    stores: Stores,
    policy: PricingPolicy,
    currency: String,
}

impl PaymentService {
    pub fn new(gateway: Arc<dyn PaymentGateway>, stores: Stores, policy: PricingPolicy, currency: &str) -> Self {
        Self {
            gateway,
            stores,
            policy,
            currency: currency.to_string(),
        }
    }

    pub fn key_id(&self) -> &str {
        self.gateway.key_id()
    }

    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    /// Load a pickup that can still be paid for.
    pub async fn load_payable(&self, pickup_id: Uuid) -> CoreResult<PickupRequest> {
        let pickup = self
            .stores
            .pickups
            .get_pickup(pickup_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("Pickup not found".to_string()))?;

        if pickup.is_settled() {
            return Err(CoreError::Conflict(format!("Pickup {} has already been paid", pickup_id)));
        }
        Ok(pickup)
    }

    pub async fn preview(&self, pickup_id: Uuid) -> CoreResult<PaymentPreview> {
        let pickup = self.load_payable(pickup_id).await?;
        let amount = self.policy.resolve_amount(&pickup);
        Ok(PaymentPreview {
            pickup_id,
            amount,
            splits: SplitBreakdown::of(amount),
            user_name: pickup.user_name,
        })
    }

    /// Open a gateway order for the pickup's resolved amount.
    pub async fn create_order(&self, pickup_id: Uuid) -> CoreResult<Checkout> {
        let pickup = self.load_payable(pickup_id).await?;
        let amount = self.policy.resolve_amount(&pickup);
        let order = self.gateway.create_order(pickup_id, amount, &self.currency).await?;
        self.stores.orders.record_order(&order).await?;
        tracing::info!(
            "{} order {} opened for pickup {} ({} paise)",
            self.gateway.provider(),
            order.id,
            pickup_id,
            order.amount
        );
        Ok(Checkout { order, pickup })
    }

    pub fn verify_signature(&self, confirmation: &PaymentConfirmation) -> bool {
        self.gateway.verify_signature(confirmation)
    }

    /// Check the checkout signature and that the order was opened for this
    /// pickup at its current amount, then settle using the gateway payment
    /// id as the transaction id.
    pub async fn verify_and_settle(
        &self,
        confirmation: &PaymentConfirmation,
        pickup_id: Uuid,
        payer_id: Uuid,
    ) -> CoreResult<Vec<Invoice>> {
        if !self.verify_signature(confirmation) {
            tracing::warn!("Signature mismatch for order {} (pickup {})", confirmation.order_id, pickup_id);
            return Err(CoreError::ValidationError("Payment verification failed".to_string()));
        }

        let order = self
            .stores
            .orders
            .get_order(&confirmation.order_id)
            .await?
            .ok_or_else(|| CoreError::ValidationError(format!("Unknown order {}", confirmation.order_id)))?;
        if order.pickup_id != pickup_id {
            tracing::warn!("Order {} belongs to pickup {}, not {}", order.id, order.pickup_id, pickup_id);
            return Err(CoreError::ValidationError("Order does not belong to this pickup".to_string()));
        }

        let pickup = self.load_payable(pickup_id).await?;
        let amount = self.policy.resolve_amount(&pickup);
        if order.amount != amount {
            tracing::warn!("Order {} was for {} paise, pickup {} now costs {}", order.id, order.amount, pickup_id, amount);
            return Err(CoreError::ValidationError("Order amount does not match the pickup".to_string()));
        }
        self.distribute_and_generate_invoices(pickup_id, amount, &confirmation.payment_id, Some(payer_id))
            .await
    }

    /// Settle without a gateway round trip. Returns the generated
    /// transaction id with the invoices.
    pub async fn confirm_simulated(&self, pickup_id: Uuid, payer_id: Uuid) -> CoreResult<(String, Vec<Invoice>)> {
        let pickup = self.load_payable(pickup_id).await?;
        let amount = self.policy.resolve_amount(&pickup);
        let transaction_id = simulated_transaction_id();
        let invoices = self
            .distribute_and_generate_invoices(pickup_id, amount, &transaction_id, Some(payer_id))
            .await?;
        Ok((transaction_id, invoices))
    }

    /// Split `amount` across the four payees and record one invoice each,
    /// plus a notification for every payee that exists.
    pub async fn distribute_and_generate_invoices(
        &self,
        pickup_id: Uuid,
        amount: i64,
        transaction_id: &str,
        payer_id: Option<Uuid>,
    ) -> CoreResult<Vec<Invoice>> {
        if amount <= 0 {
            return Err(CoreError::ValidationError("Amount must be positive".to_string()));
        }

        let pickup = self.load_payable(pickup_id).await?;
        let payees = self.resolve_payees(&pickup).await?;
        let splits = SplitBreakdown::of(amount);
        let now = Utc::now();

        let invoices: Vec<Invoice> = PAYEE_ROLES
            .iter()
            .map(|role| Invoice {
                id: Uuid::new_v4(),
                invoice_number: invoice_number(now, pickup_id, *role),
                pickup_id,
                transaction_id: transaction_id.to_string(),
                payer_id,
                recipient_id: payees.for_role(*role),
                recipient_role: *role,
                share_bps: share_bps(*role),
                amount: splits.for_role(*role),
                total_amount: amount,
                currency: self.currency.clone(),
                created_at: now,
            })
            .collect();

        let notifications: Vec<Notification> = invoices
            .iter()
            .filter_map(|invoice| {
                let recipient_id = invoice.recipient_id?;
                let event = PayoutEvent {
                    pickup_id,
                    invoice_number: invoice.invoice_number.clone(),
                    recipient_id,
                    recipient_role: invoice.recipient_role.to_string(),
                    amount: invoice.amount,
                    currency: invoice.currency.clone(),
                    transaction_id: transaction_id.to_string(),
                    timestamp: now,
                };
                Some(Notification::new(recipient_id, "payout", event.message(), Some(pickup_id)))
            })
            .collect();

        let settlement = Settlement {
            pickup_id,
            transaction_id: transaction_id.to_string(),
            invoices: invoices.clone(),
            notifications,
            settled_at: now,
        };

        self.stores.invoices.record_settlement(&settlement).await?;

        tracing::info!(
            "Pickup {} settled: {} paise across {} invoices (txn {})",
            pickup_id,
            amount,
            invoices.len(),
            transaction_id
        );

        Ok(invoices)
    }

    /// Pickup fields win; the cluster fills in whoever the pickup lacks.
    pub async fn resolve_payees(&self, pickup: &PickupRequest) -> CoreResult<Payees> {
        let mut payees = Payees {
            user: Some(pickup.user_id),
            driver: pickup.driver_id,
            engineer: pickup.engineer_id,
            warehouse: pickup.warehouse_id,
        };

        if payees.driver.is_none() || payees.engineer.is_none() || payees.warehouse.is_none() {
            if let Some(cluster) = self.stores.clusters.find_cluster_for_pickup(pickup.id).await? {
                payees.driver = payees.driver.or(Some(cluster.driver_id));
                payees.engineer = payees.engineer.or(cluster.engineer_id);
                payees.warehouse = payees.warehouse.or(Some(cluster.warehouse_id));
            }
        }

        Ok(payees)
    }

    /// Invoices visible to a user. Warehouses see every warehouse invoice.
    pub async fn invoices_for(&self, role: Role, user_id: Uuid) -> CoreResult<Vec<Invoice>> {
        let include_role = (role == Role::Warehouse).then_some(Role::Warehouse);
        self.stores.invoices.list_invoices(user_id, include_role).await
    }

    pub async fn pending_items(&self, role: Role, user_id: Uuid) -> CoreResult<Vec<PendingItem>> {
        pending_items(
            self.stores.pickups.as_ref(),
            self.stores.clusters.as_ref(),
            &self.policy,
            role,
            user_id,
        )
        .await
    }
}

/// `TXN_SIM_` followed by 12 upper-case hex characters.
pub fn simulated_transaction_id() -> String {
    let hex = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("TXN_SIM_{}", &hex[..12])
}

/// `INV-YYYYMMDD-<pickup hex>-<ROLE>`. A pickup settles once and gets one
/// invoice per role, so the number is unique.
fn invoice_number(at: chrono::DateTime<Utc>, pickup_id: Uuid, role: Role) -> String {
    format!(
        "INV-{}-{}-{}",
        at.format("%Y%m%d"),
        pickup_id.simple().to_string().to_uppercase(),
        role.as_str().to_uppercase()
    )
}

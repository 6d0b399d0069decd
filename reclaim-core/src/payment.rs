use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreResult;

/// An order opened with the payment provider for one pickup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String, // Provider's ID (e.g., order_Hx...)
    pub pickup_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// What the checkout widget hands back after the payer completes payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Public key the browser checkout needs.
    fn key_id(&self) -> &str;

    fn provider(&self) -> &'static str;

    /// Open an order for `amount` minor units.
    async fn create_order(
        &self,
        pickup_id: Uuid,
        amount: i64,
        currency: &str,
    ) -> CoreResult<GatewayOrder>;

    /// Check the provider's signature over the order and payment ids.
    fn verify_signature(&self, confirmation: &PaymentConfirmation) -> bool;
}

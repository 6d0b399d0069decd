use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reclaim_core::payment::{GatewayOrder, PaymentConfirmation, PaymentGateway};
use reclaim_core::{CoreError, CoreResult};
use reclaim_shared::Masked;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 of `"{order_id}|{payment_id}"`, the Razorpay checkout
/// signature scheme.
pub fn sign_payment(secret: &str, order_id: &str, payment_id: &str) -> CoreResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| CoreError::InternalError(format!("HMAC key rejected: {}", e)))?;
    mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a checkout signature.
pub fn verify_payment_signature(secret: &str, confirmation: &PaymentConfirmation) -> bool {
    let Ok(expected) = hex::decode(confirmation.signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(format!("{}|{}", confirmation.order_id, confirmation.payment_id).as_bytes());
    mac.verify_slice(&expected).is_ok()
}

// ============================================================================
// Razorpay
// ============================================================================

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: String,
    notes: OrderNotes,
}

#[derive(Debug, Serialize)]
struct OrderNotes {
    pickup_id: String,
}

#[derive(Debug, Deserialize)]
struct RazorpayOrder {
    id: String,
    amount: i64,
    currency: String,
    #[serde(default)]
    receipt: Option<String>,
    status: String,
}

/// Talks to the Razorpay Orders REST API.
pub struct RazorpayGateway {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: Masked<String>,
}

impl RazorpayGateway {
    pub fn new(base_url: &str, key_id: &str, key_secret: &str) -> CoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| CoreError::InternalError(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            key_id: key_id.to_string(),
            key_secret: Masked::new(key_secret.to_string()),
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    fn provider(&self) -> &'static str {
        "razorpay"
    }

    async fn create_order(
        &self,
        pickup_id: Uuid,
        amount: i64,
        currency: &str,
    ) -> CoreResult<GatewayOrder> {
        let body = CreateOrderBody {
            amount,
            currency,
            receipt: receipt_for(pickup_id),
            notes: OrderNotes { pickup_id: pickup_id.to_string() },
        };

        let response = self
            .client
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(self.key_secret.expose()))
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::GatewayError(format!("Order request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!("Razorpay rejected order for pickup {}: {} {}", pickup_id, status, text);
            return Err(CoreError::GatewayError(format!("Razorpay returned {}: {}", status, text)));
        }

        let order: RazorpayOrder = response
            .json()
            .await
            .map_err(|e| CoreError::GatewayError(format!("Malformed order response: {}", e)))?;

        tracing::info!("Razorpay order {} created for pickup {}", order.id, pickup_id);

        Ok(GatewayOrder {
            id: order.id,
            pickup_id,
            amount: order.amount,
            currency: order.currency,
            receipt: order.receipt.unwrap_or_else(|| receipt_for(pickup_id)),
            status: order.status,
            created_at: Utc::now(),
        })
    }

    fn verify_signature(&self, confirmation: &PaymentConfirmation) -> bool {
        verify_payment_signature(self.key_secret.expose(), confirmation)
    }
}

// ============================================================================
// Simulated
// ============================================================================

/// In-process gateway for demos and tests. Orders are never sent anywhere,
/// but signatures follow the same HMAC scheme as Razorpay.
pub struct SimulatedGateway {
    key_id: String,
    key_secret: Masked<String>,
}

impl SimulatedGateway {
    pub fn new(key_id: &str, key_secret: &str) -> Self {
        Self {
            key_id: key_id.to_string(),
            key_secret: Masked::new(key_secret.to_string()),
        }
    }

    /// Produce the signature a successful checkout would return.
    pub fn sign(&self, order_id: &str, payment_id: &str) -> CoreResult<String> {
        sign_payment(self.key_secret.expose(), order_id, payment_id)
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    fn provider(&self) -> &'static str {
        "simulated"
    }

    async fn create_order(
        &self,
        pickup_id: Uuid,
        amount: i64,
        currency: &str,
    ) -> CoreResult<GatewayOrder> {
        if amount <= 0 {
            return Err(CoreError::GatewayError("Order amount must be positive".to_string()));
        }
        let suffix = Uuid::new_v4().simple().to_string();
        Ok(GatewayOrder {
            id: format!("order_sim_{}", &suffix[..14]),
            pickup_id,
            amount,
            currency: currency.to_string(),
            receipt: receipt_for(pickup_id),
            status: "created".to_string(),
            created_at: Utc::now(),
        })
    }

    fn verify_signature(&self, confirmation: &PaymentConfirmation) -> bool {
        verify_payment_signature(self.key_secret.expose(), confirmation)
    }
}

fn receipt_for(pickup_id: Uuid) -> String {
    format!("pickup_{}", pickup_id.simple())
}

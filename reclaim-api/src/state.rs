use std::sync::Arc;

use reclaim_core::payment::PaymentGateway;
use reclaim_core::Stores;
use reclaim_pickup::{PaymentService, PickupManager, PricingPolicy};
use reclaim_store::RedisClient;

use crate::middleware::resiliency::ResiliencyState;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct RateLimit {
    pub redis: Arc<RedisClient>,
    pub per_minute: i64,
}

#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub pickups: Arc<PickupManager>,
    pub payments: Arc<PaymentService>,
    pub resiliency: Arc<ResiliencyState>,
    pub rate_limit: Option<RateLimit>,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(
        stores: Stores,
        gateway: Arc<dyn PaymentGateway>,
        policy: PricingPolicy,
        currency: &str,
        auth: AuthConfig,
    ) -> Self {
        Self {
            pickups: Arc::new(PickupManager::new(stores.clone())),
            payments: Arc::new(PaymentService::new(gateway, stores.clone(), policy, currency)),
            resiliency: Arc::new(ResiliencyState::default()),
            rate_limit: None,
            stores,
            auth,
        }
    }

    pub fn with_rate_limit(mut self, redis: Arc<RedisClient>, per_minute: i64) -> Self {
        self.rate_limit = Some(RateLimit { redis, per_minute });
        self
    }
}

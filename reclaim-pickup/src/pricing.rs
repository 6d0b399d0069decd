use reclaim_core::PickupRequest;
use serde::{Deserialize, Serialize};

/// Fallback pricing for pickups an engineer has not priced yet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PricingPolicy {
    /// 5 paise per gram is 50 INR per kg.
    pub rate_paise_per_gram: f64,

    /// Floor applied to weight-based amounts (paise).
    pub minimum_amount: i64,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            rate_paise_per_gram: 5.0,
            minimum_amount: 10_000,
        }
    }
}

impl PricingPolicy {
    /// Amount payable for a pickup, in paise.
    pub fn resolve_amount(&self, pickup: &PickupRequest) -> i64 {
        self.estimate(pickup.effective_weight(), pickup.engineer_price)
    }

    /// An engineer's positive price wins; otherwise weight times rate,
    /// raised to the minimum.
    pub fn estimate(&self, weight_grams: f64, engineer_price: Option<i64>) -> i64 {
        if let Some(price) = engineer_price.filter(|p| *p > 0) {
            return price;
        }

        let weight = if weight_grams.is_finite() && weight_grams > 0.0 {
            weight_grams
        } else {
            0.0
        };

        let amount = (weight * self.rate_paise_per_gram).round() as i64;
        amount.max(self.minimum_amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_engineer_price_wins() {
        let policy = PricingPolicy::default();
        assert_eq!(policy.estimate(100_000.0, Some(42_000)), 42_000);
        // A zero price counts as unpriced
        assert_eq!(policy.estimate(4_000.0, Some(0)), 20_000);
    }

    #[test]
    fn test_weight_fallback_and_minimum() {
        let policy = PricingPolicy::default();
        // 4 kg at 50 INR/kg = 200 INR
        assert_eq!(policy.estimate(4_000.0, None), 20_000);
        // 500 g = 25 INR, raised to the 100 INR floor
        assert_eq!(policy.estimate(500.0, None), 10_000);
        assert_eq!(policy.estimate(0.0, None), 10_000);
        assert_eq!(policy.estimate(-10.0, None), 10_000);
        assert_eq!(policy.estimate(f64::INFINITY, None), 10_000);
    }

    #[test]
    fn test_resolve_amount_uses_final_weight() {
        let policy = PricingPolicy::default();
        let mut pickup = PickupRequest::new(Uuid::new_v4(), "Asha".into(), "addr".into(), "fridge".into());
        pickup.approx_weight = Some(30_000.0);
        assert_eq!(policy.resolve_amount(&pickup), 150_000);
        pickup.final_weight = Some(28_000.0);
        assert_eq!(policy.resolve_amount(&pickup), 140_000);
        pickup.engineer_price = Some(125_000);
        assert_eq!(policy.resolve_amount(&pickup), 125_000);
    }
}

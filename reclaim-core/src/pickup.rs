use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::CoreError;

/// Pickup lifecycle, in order. Moves are forward only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PickupStatus {
    Pending,
    Assigned,
    Inspected,
    Scheduled,
    Collected,
    Recycled,
}

impl PickupStatus {
    pub const ALL: [PickupStatus; 6] = [
        PickupStatus::Pending,
        PickupStatus::Assigned,
        PickupStatus::Inspected,
        PickupStatus::Scheduled,
        PickupStatus::Collected,
        PickupStatus::Recycled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PickupStatus::Pending => "pending",
            PickupStatus::Assigned => "assigned",
            PickupStatus::Inspected => "inspected",
            PickupStatus::Scheduled => "scheduled",
            PickupStatus::Collected => "collected",
            PickupStatus::Recycled => "recycled",
        }
    }

    pub fn can_transition_to(&self, next: PickupStatus) -> bool {
        *self != PickupStatus::Recycled && next > *self
    }

    pub fn is_terminal(&self) -> bool {
        *self == PickupStatus::Recycled
    }
}

impl fmt::Display for PickupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PickupStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PickupStatus::ALL
            .iter()
            .find(|st| st.as_str() == s)
            .copied()
            .ok_or_else(|| CoreError::ValidationError(format!("Unknown pickup status: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "paid" => Ok(PaymentStatus::Paid),
            other => Err(CoreError::ValidationError(format!("Unknown payment status: {}", other))),
        }
    }
}

/// A scheduled e-waste collection. Weights are grams, prices are paise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickupRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub address: String,
    pub item_description: String,
    pub category: Option<String>,
    pub approx_weight: Option<f64>,
    pub final_weight: Option<f64>,
    pub engineer_id: Option<Uuid>,
    pub engineer_price: Option<i64>,
    pub driver_id: Option<Uuid>,
    pub cluster_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub status: PickupStatus,
    pub payment_status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PickupRequest {
    pub fn new(user_id: Uuid, user_name: String, address: String, item_description: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            user_name,
            address,
            item_description,
            category: None,
            approx_weight: None,
            final_weight: None,
            engineer_id: None,
            engineer_price: None,
            driver_id: None,
            cluster_id: None,
            warehouse_id: None,
            status: PickupStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            transaction_id: None,
            scheduled_date: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `next`, refusing backward or post-terminal moves.
    pub fn advance(&mut self, next: PickupStatus) -> Result<(), CoreError> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::Conflict(format!(
                "Pickup {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        self.touch();
        Ok(())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn is_settled(&self) -> bool {
        self.payment_status == PaymentStatus::Paid || self.status.is_terminal()
    }

    /// Weight used for pricing: inspected weight wins over the estimate.
    pub fn effective_weight(&self) -> f64 {
        self.final_weight
            .filter(|w| *w > 0.0)
            .or(self.approx_weight)
            .filter(|w| w.is_finite() && *w > 0.0)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pickup() -> PickupRequest {
        PickupRequest::new(Uuid::new_v4(), "Asha".into(), "12 MG Road".into(), "Old laptop".into())
    }

    #[test]
    fn test_forward_transitions_only() {
        assert!(PickupStatus::Pending.can_transition_to(PickupStatus::Assigned));
        assert!(PickupStatus::Pending.can_transition_to(PickupStatus::Scheduled));
        assert!(!PickupStatus::Collected.can_transition_to(PickupStatus::Pending));
        assert!(!PickupStatus::Recycled.can_transition_to(PickupStatus::Recycled));
        assert!(!PickupStatus::Inspected.can_transition_to(PickupStatus::Inspected));
    }

    #[test]
    fn test_advance_rejects_backward_move() {
        let mut p = pickup();
        p.advance(PickupStatus::Collected).unwrap();
        let err = p.advance(PickupStatus::Assigned).unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
        assert_eq!(p.status, PickupStatus::Collected);
    }

    #[test]
    fn test_effective_weight_prefers_final() {
        let mut p = pickup();
        assert_eq!(p.effective_weight(), 0.0);
        p.approx_weight = Some(1200.0);
        assert_eq!(p.effective_weight(), 1200.0);
        p.final_weight = Some(950.0);
        assert_eq!(p.effective_weight(), 950.0);
        p.final_weight = Some(0.0);
        assert_eq!(p.effective_weight(), 1200.0);
        p.approx_weight = Some(f64::NAN);
        assert_eq!(p.effective_weight(), 0.0);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(PickupStatus::Collected).unwrap(), "collected");
        assert_eq!("recycled".parse::<PickupStatus>().unwrap(), PickupStatus::Recycled);
    }
}

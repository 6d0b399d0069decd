use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Raised once per paid party when a pickup is settled.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PayoutEvent {
    pub pickup_id: Uuid,
    pub invoice_number: String,
    pub recipient_id: Uuid,
    pub recipient_role: String,
    pub amount: i64,
    pub currency: String,
    pub transaction_id: String,
    pub timestamp: DateTime<Utc>,
}

impl PayoutEvent {
    pub fn message(&self) -> String {
        format!(
            "Payment of {} {} credited as {} share for pickup {} (invoice {})",
            format_minor_units(self.amount),
            self.currency,
            self.recipient_role,
            self.pickup_id,
            self.invoice_number
        )
    }
}

/// Raised when a pickup changes hands (assignment, scheduling, collection).
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PickupUpdatedEvent {
    pub pickup_id: Uuid,
    pub recipient_id: Uuid,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl PickupUpdatedEvent {
    pub fn message(&self) -> String {
        format!("Pickup {} is now {}", self.pickup_id, self.status)
    }
}

/// Renders paise as rupees with two decimals.
pub fn format_minor_units(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_minor_units() {
        assert_eq!(format_minor_units(10000), "100.00");
        assert_eq!(format_minor_units(1505), "15.05");
        assert_eq!(format_minor_units(-250), "-2.50");
    }

    #[test]
    fn test_payout_message() {
        let event = PayoutEvent {
            pickup_id: Uuid::nil(),
            invoice_number: "INV-20260101-00000000000000000000000000000000-DRIVER".to_string(),
            recipient_id: Uuid::nil(),
            recipient_role: "driver".to_string(),
            amount: 1000,
            currency: "INR".to_string(),
            transaction_id: "TXN_SIM_000000000000".to_string(),
            timestamp: Utc::now(),
        };
        let msg = event.message();
        assert!(msg.contains("10.00 INR"));
        assert!(msg.contains("driver share"));
    }
}

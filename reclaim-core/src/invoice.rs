use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::Role;

/// One party's disbursement after a pickup's payment settles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub pickup_id: Uuid,
    pub transaction_id: String,
    pub payer_id: Option<Uuid>,
    pub recipient_id: Option<Uuid>,
    pub recipient_role: Role,
    pub share_bps: i32,
    pub amount: i64,
    pub total_amount: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub kind: String,
    pub message: String,
    pub pickup_id: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(recipient_id: Uuid, kind: &str, message: String, pickup_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient_id,
            kind: kind.to_string(),
            message,
            pickup_id,
            read: false,
            created_at: Utc::now(),
        }
    }
}

/// Everything written when a pickup is paid for. Stores apply it atomically.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub pickup_id: Uuid,
    pub transaction_id: String,
    pub invoices: Vec<Invoice>,
    pub notifications: Vec<Notification>,
    pub settled_at: DateTime<Utc>,
}

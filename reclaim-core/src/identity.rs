use chrono::{DateTime, Utc};
use reclaim_shared::Masked;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::CoreError;

/// Marketplace roles. Each one gets its own dashboard.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Engineer,
    Driver,
    Warehouse,
    Recycler,
    Admin,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::User,
        Role::Engineer,
        Role::Driver,
        Role::Warehouse,
        Role::Recycler,
        Role::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Engineer => "engineer",
            Role::Driver => "driver",
            Role::Warehouse => "warehouse",
            Role::Recycler => "recycler",
            Role::Admin => "admin",
        }
    }

    /// Landing route after login.
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Role::User => "/user/requests",
            Role::Engineer => "/engineer/requests",
            Role::Driver => "/driver/route",
            Role::Warehouse => "/warehouse/requests",
            Role::Recycler => "/invoices",
            Role::Admin => "/admin/users",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .find(|r| r.as_str() == s)
            .copied()
            .ok_or_else(|| CoreError::ValidationError(format!("Unknown role: {}", s)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<Masked<String>>,
    pub address: Option<Masked<String>>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: &str, password_hash: String, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email: normalize_email(email),
            phone: None,
            address: None,
            password_hash,
            role,
            created_at: Utc::now(),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

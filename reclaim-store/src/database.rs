use async_trait::async_trait;
use reclaim_core::repository::HealthCheck;
use reclaim_core::{CoreError, CoreResult, Stores};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::cluster_repo::StoreClusterRepository;
use crate::invoice_repo::{StoreInvoiceRepository, StoreNotificationRepository};
use crate::order_repo::StoreOrderRepository;
use crate::pickup_repo::StorePickupRepository;
use crate::user_repo::StoreUserRepository;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Postgres-backed repositories sharing this pool.
    pub fn stores(&self) -> Stores {
        Stores {
            users: Arc::new(StoreUserRepository::new(self.pool.clone())),
            pickups: Arc::new(StorePickupRepository::new(self.pool.clone())),
            clusters: Arc::new(StoreClusterRepository::new(self.pool.clone())),
            invoices: Arc::new(StoreInvoiceRepository::new(self.pool.clone())),
            orders: Arc::new(StoreOrderRepository::new(self.pool.clone())),
            notifications: Arc::new(StoreNotificationRepository::new(self.pool.clone())),
            health: Arc::new(self.clone()),
        }
    }
}

#[async_trait]
impl HealthCheck for DbClient {
    async fn ping(&self) -> CoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(storage_error)
    }
}

/// Unique violations become `Conflict`; everything else is a storage failure.
pub(crate) fn storage_error(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return CoreError::Conflict(db_err.message().to_string());
        }
    }
    tracing::error!("Database error: {}", err);
    CoreError::StorageError(err.to_string())
}

/// Parse a TEXT column into one of the domain enums.
pub(crate) fn parse_column<T>(value: &str) -> CoreResult<T>
where
    T: std::str::FromStr<Err = CoreError>,
{
    value
        .parse()
        .map_err(|e: CoreError| CoreError::StorageError(format!("Corrupt column value: {}", e)))
}

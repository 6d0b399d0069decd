use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reclaim_core::payment::GatewayOrder;
use reclaim_core::repository::OrderRepository;
use reclaim_core::CoreResult;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::storage_error;

pub struct StoreOrderRepository {
    pool: PgPool,
}

impl StoreOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: String,
    pickup_id: Uuid,
    amount: i64,
    currency: String,
    receipt: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for GatewayOrder {
    fn from(row: OrderRow) -> Self {
        GatewayOrder {
            id: row.id,
            pickup_id: row.pickup_id,
            amount: row.amount,
            currency: row.currency,
            receipt: row.receipt,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl OrderRepository for StoreOrderRepository {
    async fn record_order(&self, order: &GatewayOrder) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO gateway_orders (id, pickup_id, amount, currency, receipt, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&order.id)
        .bind(order.pickup_id)
        .bind(order.amount)
        .bind(&order.currency)
        .bind(&order.receipt)
        .bind(&order.status)
        .bind(order.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn get_order(&self, id: &str) -> CoreResult<Option<GatewayOrder>> {
        let row = sqlx::query_as::<_, OrderRow>(
            "SELECT id, pickup_id, amount, currency, receipt, status, created_at FROM gateway_orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(row.map(GatewayOrder::from))
    }
}

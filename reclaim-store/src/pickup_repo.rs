use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reclaim_core::repository::{PickupFilter, PickupOrder, PickupRepository};
use reclaim_core::{CoreError, CoreResult, PickupRequest};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::database::{parse_column, storage_error};

pub struct StorePickupRepository {
    pool: PgPool,
}

impl StorePickupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct PickupRow {
    id: Uuid,
    user_id: Uuid,
    user_name: String,
    address: String,
    item_description: String,
    category: Option<String>,
    approx_weight: Option<f64>,
    final_weight: Option<f64>,
    engineer_id: Option<Uuid>,
    engineer_price: Option<i64>,
    driver_id: Option<Uuid>,
    cluster_id: Option<Uuid>,
    warehouse_id: Option<Uuid>,
    status: String,
    payment_status: String,
    transaction_id: Option<String>,
    scheduled_date: Option<NaiveDate>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PickupRow> for PickupRequest {
    type Error = CoreError;

    fn try_from(row: PickupRow) -> Result<Self, Self::Error> {
        Ok(PickupRequest {
            id: row.id,
            user_id: row.user_id,
            user_name: row.user_name,
            address: row.address,
            item_description: row.item_description,
            category: row.category,
            approx_weight: row.approx_weight,
            final_weight: row.final_weight,
            engineer_id: row.engineer_id,
            engineer_price: row.engineer_price,
            driver_id: row.driver_id,
            cluster_id: row.cluster_id,
            warehouse_id: row.warehouse_id,
            status: parse_column(&row.status)?,
            payment_status: parse_column(&row.payment_status)?,
            transaction_id: row.transaction_id,
            scheduled_date: row.scheduled_date,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub(crate) const PICKUP_COLUMNS: &str = "id, user_id, user_name, address, item_description, category, \
     approx_weight, final_weight, engineer_id, engineer_price, driver_id, cluster_id, warehouse_id, \
     status, payment_status, transaction_id, scheduled_date, notes, created_at, updated_at";

#[async_trait]
impl PickupRepository for StorePickupRepository {
    async fn create_pickup(&self, pickup: &PickupRequest) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO pickup_requests (id, user_id, user_name, address, item_description, category,
                approx_weight, final_weight, engineer_id, engineer_price, driver_id, cluster_id, warehouse_id,
                status, payment_status, transaction_id, scheduled_date, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            "#,
        )
        .bind(pickup.id)
        .bind(pickup.user_id)
        .bind(&pickup.user_name)
        .bind(&pickup.address)
        .bind(&pickup.item_description)
        .bind(&pickup.category)
        .bind(pickup.approx_weight)
        .bind(pickup.final_weight)
        .bind(pickup.engineer_id)
        .bind(pickup.engineer_price)
        .bind(pickup.driver_id)
        .bind(pickup.cluster_id)
        .bind(pickup.warehouse_id)
        .bind(pickup.status.as_str())
        .bind(pickup.payment_status.as_str())
        .bind(&pickup.transaction_id)
        .bind(pickup.scheduled_date)
        .bind(&pickup.notes)
        .bind(pickup.created_at)
        .bind(pickup.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn get_pickup(&self, id: Uuid) -> CoreResult<Option<PickupRequest>> {
        let row = sqlx::query_as::<_, PickupRow>(&format!(
            "SELECT {} FROM pickup_requests WHERE id = $1",
            PICKUP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        row.map(PickupRequest::try_from).transpose()
    }

    async fn save_pickup(&self, pickup: &PickupRequest) -> CoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE pickup_requests SET
                user_name = $2, address = $3, item_description = $4, category = $5,
                approx_weight = $6, final_weight = $7, engineer_id = $8, engineer_price = $9,
                driver_id = $10, cluster_id = $11, warehouse_id = $12, status = $13,
                payment_status = $14, transaction_id = $15, scheduled_date = $16, notes = $17,
                updated_at = $18
            WHERE id = $1 AND payment_status = 'unpaid' AND status <> 'recycled'
            "#,
        )
        .bind(pickup.id)
        .bind(&pickup.user_name)
        .bind(&pickup.address)
        .bind(&pickup.item_description)
        .bind(&pickup.category)
        .bind(pickup.approx_weight)
        .bind(pickup.final_weight)
        .bind(pickup.engineer_id)
        .bind(pickup.engineer_price)
        .bind(pickup.driver_id)
        .bind(pickup.cluster_id)
        .bind(pickup.warehouse_id)
        .bind(pickup.status.as_str())
        .bind(pickup.payment_status.as_str())
        .bind(&pickup.transaction_id)
        .bind(pickup.scheduled_date)
        .bind(&pickup.notes)
        .bind(pickup.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pickup_requests WHERE id = $1)")
                .bind(pickup.id)
                .fetch_one(&self.pool)
                .await
                .map_err(storage_error)?;
            return Err(if exists {
                CoreError::Conflict(format!("Pickup {} has already been paid", pickup.id))
            } else {
                CoreError::NotFound(format!("Pickup {} not found", pickup.id))
            });
        }
        Ok(())
    }

    async fn list_pickups(&self, filter: &PickupFilter) -> CoreResult<Vec<PickupRequest>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM pickup_requests WHERE TRUE", PICKUP_COLUMNS));

        if let Some(ids) = &filter.ids {
            qb.push(" AND id = ANY(").push_bind(ids.clone()).push(")");
        }
        if let Some(user_id) = filter.user_id {
            qb.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(engineer_id) = filter.engineer_id {
            qb.push(" AND engineer_id = ").push_bind(engineer_id);
        }
        if let Some(driver_id) = filter.driver_id {
            qb.push(" AND driver_id = ").push_bind(driver_id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(status) = filter.exclude_status {
            qb.push(" AND status <> ").push_bind(status.as_str());
        }
        qb.push(match filter.order {
            PickupOrder::CreatedDesc => " ORDER BY created_at DESC",
            PickupOrder::UpdatedDesc => " ORDER BY updated_at DESC",
        });

        let rows = qb
            .build_query_as::<PickupRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        rows.into_iter().map(PickupRequest::try_from).collect()
    }
}

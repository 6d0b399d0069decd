use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reclaim_core::repository::ClusterRepository;
use reclaim_core::{ActiveRoute, ClusterStop, CollectionCluster, CoreError, CoreResult};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::{parse_column, storage_error};

pub struct StoreClusterRepository {
    pool: PgPool,
}

impl StoreClusterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach stops to cluster rows, keeping the row order.
    async fn hydrate(&self, rows: Vec<ClusterRow>) -> CoreResult<Vec<CollectionCluster>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let stops = sqlx::query_as::<_, StopRow>(
            "SELECT cluster_id, pickup_id, user_id, sequence FROM cluster_stops WHERE cluster_id = ANY($1) ORDER BY sequence",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        let mut by_cluster: HashMap<Uuid, Vec<ClusterStop>> = HashMap::new();
        for stop in stops {
            by_cluster.entry(stop.cluster_id).or_default().push(ClusterStop {
                pickup_id: stop.pickup_id,
                user_id: stop.user_id,
                sequence: stop.sequence,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| CollectionCluster {
                stops: by_cluster.remove(&row.id).unwrap_or_default(),
                id: row.id,
                name: row.name,
                driver_id: row.driver_id,
                engineer_id: row.engineer_id,
                warehouse_id: row.warehouse_id,
                created_at: row.created_at,
            })
            .collect())
    }
}

#[derive(sqlx::FromRow)]
struct ClusterRow {
    id: Uuid,
    name: String,
    driver_id: Uuid,
    engineer_id: Option<Uuid>,
    warehouse_id: Uuid,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct StopRow {
    cluster_id: Uuid,
    pickup_id: Uuid,
    user_id: Uuid,
    sequence: i32,
}

#[derive(sqlx::FromRow)]
struct RouteRow {
    id: Uuid,
    cluster_id: Uuid,
    driver_id: Uuid,
    status: String,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<RouteRow> for ActiveRoute {
    type Error = CoreError;

    fn try_from(row: RouteRow) -> Result<Self, Self::Error> {
        Ok(ActiveRoute {
            id: row.id,
            cluster_id: row.cluster_id,
            driver_id: row.driver_id,
            status: parse_column(&row.status)?,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

const CLUSTER_COLUMNS: &str = "id, name, driver_id, engineer_id, warehouse_id, created_at";
const ROUTE_COLUMNS: &str = "id, cluster_id, driver_id, status, started_at, completed_at";

#[async_trait]
impl ClusterRepository for StoreClusterRepository {
    async fn create_cluster(&self, cluster: &CollectionCluster) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        sqlx::query(
            r#"
            INSERT INTO collection_clusters (id, name, driver_id, engineer_id, warehouse_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(cluster.id)
        .bind(&cluster.name)
        .bind(cluster.driver_id)
        .bind(cluster.engineer_id)
        .bind(cluster.warehouse_id)
        .bind(cluster.created_at)
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;

        for stop in &cluster.stops {
            sqlx::query(
                "INSERT INTO cluster_stops (cluster_id, pickup_id, user_id, sequence) VALUES ($1, $2, $3, $4)",
            )
            .bind(cluster.id)
            .bind(stop.pickup_id)
            .bind(stop.user_id)
            .bind(stop.sequence)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;
        }

        tx.commit().await.map_err(storage_error)?;
        Ok(())
    }

    async fn get_cluster(&self, id: Uuid) -> CoreResult<Option<CollectionCluster>> {
        let row = sqlx::query_as::<_, ClusterRow>(&format!(
            "SELECT {} FROM collection_clusters WHERE id = $1",
            CLUSTER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_clusters(&self, driver_id: Option<Uuid>) -> CoreResult<Vec<CollectionCluster>> {
        let rows = match driver_id {
            Some(driver_id) => {
                sqlx::query_as::<_, ClusterRow>(&format!(
                    "SELECT {} FROM collection_clusters WHERE driver_id = $1 ORDER BY created_at DESC",
                    CLUSTER_COLUMNS
                ))
                .bind(driver_id)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, ClusterRow>(&format!(
                    "SELECT {} FROM collection_clusters ORDER BY created_at DESC",
                    CLUSTER_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(storage_error)?;

        self.hydrate(rows).await
    }

    async fn find_cluster_for_pickup(&self, pickup_id: Uuid) -> CoreResult<Option<CollectionCluster>> {
        let cluster_id: Option<Uuid> =
            sqlx::query_scalar("SELECT cluster_id FROM cluster_stops WHERE pickup_id = $1")
                .bind(pickup_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_error)?;

        match cluster_id {
            Some(id) => self.get_cluster(id).await,
            None => Ok(None),
        }
    }

    async fn create_route(&self, route: &ActiveRoute) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO active_routes (id, cluster_id, driver_id, status, started_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(route.id)
        .bind(route.cluster_id)
        .bind(route.driver_id)
        .bind(route.status.as_str())
        .bind(route.started_at)
        .bind(route.completed_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn get_route(&self, id: Uuid) -> CoreResult<Option<ActiveRoute>> {
        let row = sqlx::query_as::<_, RouteRow>(&format!("SELECT {} FROM active_routes WHERE id = $1", ROUTE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        row.map(ActiveRoute::try_from).transpose()
    }

    async fn save_route(&self, route: &ActiveRoute) -> CoreResult<()> {
        let result = sqlx::query("UPDATE active_routes SET status = $2, completed_at = $3 WHERE id = $1")
            .bind(route.id)
            .bind(route.status.as_str())
            .bind(route.completed_at)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("Route {} not found", route.id)));
        }
        Ok(())
    }

    async fn active_route_for_driver(&self, driver_id: Uuid) -> CoreResult<Option<ActiveRoute>> {
        let row = sqlx::query_as::<_, RouteRow>(&format!(
            "SELECT {} FROM active_routes WHERE driver_id = $1 AND status = 'in_progress' ORDER BY started_at DESC LIMIT 1",
            ROUTE_COLUMNS
        ))
        .bind(driver_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        row.map(ActiveRoute::try_from).transpose()
    }

    async fn active_route_for_cluster(&self, cluster_id: Uuid) -> CoreResult<Option<ActiveRoute>> {
        let row = sqlx::query_as::<_, RouteRow>(&format!(
            "SELECT {} FROM active_routes WHERE cluster_id = $1 AND status = 'in_progress' LIMIT 1",
            ROUTE_COLUMNS
        ))
        .bind(cluster_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        row.map(ActiveRoute::try_from).transpose()
    }
}

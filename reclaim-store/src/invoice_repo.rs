use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reclaim_core::repository::{InvoiceRepository, NotificationRepository};
use reclaim_core::{CoreError, CoreResult, Invoice, Notification, Role, Settlement};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::database::{parse_column, storage_error};

pub struct StoreInvoiceRepository {
    pool: PgPool,
}

impl StoreInvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct InvoiceRow {
    id: Uuid,
    invoice_number: String,
    pickup_id: Uuid,
    transaction_id: String,
    payer_id: Option<Uuid>,
    recipient_id: Option<Uuid>,
    recipient_role: String,
    share_bps: i32,
    amount: i64,
    total_amount: i64,
    currency: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = CoreError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        Ok(Invoice {
            id: row.id,
            invoice_number: row.invoice_number,
            pickup_id: row.pickup_id,
            transaction_id: row.transaction_id,
            payer_id: row.payer_id,
            recipient_id: row.recipient_id,
            recipient_role: parse_column(&row.recipient_role)?,
            share_bps: row.share_bps,
            amount: row.amount,
            total_amount: row.total_amount,
            currency: row.currency,
            created_at: row.created_at,
        })
    }
}

const INVOICE_COLUMNS: &str = "id, invoice_number, pickup_id, transaction_id, payer_id, recipient_id, \
     recipient_role, share_bps, amount, total_amount, currency, created_at";

#[async_trait]
impl InvoiceRepository for StoreInvoiceRepository {
    async fn record_settlement(&self, settlement: &Settlement) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        // Row lock serialises concurrent settlements of the same pickup
        let state: Option<(String, String)> = sqlx::query_as(
            "SELECT status, payment_status FROM pickup_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(settlement.pickup_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage_error)?;

        let (status, payment_status) = state
            .ok_or_else(|| CoreError::NotFound(format!("Pickup {} not found", settlement.pickup_id)))?;
        if status == "recycled" || payment_status == "paid" {
            return Err(CoreError::Conflict(format!(
                "Pickup {} has already been paid",
                settlement.pickup_id
            )));
        }

        for invoice in &settlement.invoices {
            sqlx::query(
                r#"
                INSERT INTO invoices (id, invoice_number, pickup_id, transaction_id, payer_id, recipient_id,
                                      recipient_role, share_bps, amount, total_amount, currency, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                "#,
            )
            .bind(invoice.id)
            .bind(&invoice.invoice_number)
            .bind(invoice.pickup_id)
            .bind(&invoice.transaction_id)
            .bind(invoice.payer_id)
            .bind(invoice.recipient_id)
            .bind(invoice.recipient_role.as_str())
            .bind(invoice.share_bps)
            .bind(invoice.amount)
            .bind(invoice.total_amount)
            .bind(&invoice.currency)
            .bind(invoice.created_at)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;
        }

        for note in &settlement.notifications {
            insert_notification(&mut *tx, note).await?;
        }

        sqlx::query(
            r#"
            UPDATE pickup_requests
            SET status = 'recycled', payment_status = 'paid', transaction_id = $2, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(settlement.pickup_id)
        .bind(&settlement.transaction_id)
        .bind(settlement.settled_at)
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;
        info!(
            "Settlement recorded for pickup {} ({} invoices)",
            settlement.pickup_id,
            settlement.invoices.len()
        );
        Ok(())
    }

    async fn list_invoices(&self, recipient_id: Uuid, include_role: Option<Role>) -> CoreResult<Vec<Invoice>> {
        let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {} FROM invoices \
             WHERE recipient_id = $1 OR ($2::text IS NOT NULL AND recipient_role = $2) \
             ORDER BY created_at DESC",
            INVOICE_COLUMNS
        ))
        .bind(recipient_id)
        .bind(include_role.map(|r| r.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.into_iter().map(Invoice::try_from).collect()
    }

    async fn invoices_for_pickup(&self, pickup_id: Uuid) -> CoreResult<Vec<Invoice>> {
        let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {} FROM invoices WHERE pickup_id = $1 ORDER BY share_bps DESC",
            INVOICE_COLUMNS
        ))
        .bind(pickup_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.into_iter().map(Invoice::try_from).collect()
    }
}

async fn insert_notification<'e, E>(executor: E, note: &Notification) -> CoreResult<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO notifications (id, recipient_id, kind, message, pickup_id, read, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(note.id)
    .bind(note.recipient_id)
    .bind(&note.kind)
    .bind(&note.message)
    .bind(note.pickup_id)
    .bind(note.read)
    .bind(note.created_at)
    .execute(executor)
    .await
    .map_err(storage_error)?;
    Ok(())
}

pub struct StoreNotificationRepository {
    pool: PgPool,
}

impl StoreNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    recipient_id: Uuid,
    kind: String,
    message: String,
    pickup_id: Option<Uuid>,
    read: bool,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id: row.id,
            recipient_id: row.recipient_id,
            kind: row.kind,
            message: row.message,
            pickup_id: row.pickup_id,
            read: row.read,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl NotificationRepository for StoreNotificationRepository {
    async fn push_notification(&self, notification: &Notification) -> CoreResult<()> {
        insert_notification(&self.pool, notification).await
    }

    async fn list_notifications(&self, recipient_id: Uuid) -> CoreResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, recipient_id, kind, message, pickup_id, read, created_at
            FROM notifications
            WHERE recipient_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(recipient_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(rows.into_iter().map(Notification::from).collect())
    }

    async fn mark_read(&self, recipient_id: Uuid, id: Uuid) -> CoreResult<bool> {
        let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1 AND recipient_id = $2")
            .bind(id)
            .bind(recipient_id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected() > 0)
    }
}

//! PostgreSQL implementation of PaymentLogRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, PaymentId, PaymentLogId, RecurrentPaymentId, Timestamp};
use crate::ports::{PaymentLogEntry, PaymentLogRepository};

pub struct PostgresPaymentLogRepository {
    pool: PgPool,
}

impl PostgresPaymentLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentLogRow {
    id: Uuid,
    payment_id: Uuid,
    recurrent_payment_id: Option<Uuid>,
    success: bool,
    source: String,
    payload: JsonValue,
    created_at: DateTime<Utc>,
}

impl From<PaymentLogRow> for PaymentLogEntry {
    fn from(row: PaymentLogRow) -> Self {
        PaymentLogEntry {
            id: PaymentLogId::from_uuid(row.id),
            payment_id: PaymentId::from_uuid(row.payment_id),
            recurrent_payment_id: row.recurrent_payment_id.map(RecurrentPaymentId::from_uuid),
            success: row.success,
            source: row.source,
            payload: row.payload,
            created_at: Timestamp::from_datetime(row.created_at),
        }
    }
}

#[async_trait]
impl PaymentLogRepository for PostgresPaymentLogRepository {
    async fn append(&self, entry: &PaymentLogEntry) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payment_logs (
                id, payment_id, recurrent_payment_id, success, source, payload, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.payment_id.as_uuid())
        .bind(entry.recurrent_payment_id.map(|id| *id.as_uuid()))
        .bind(entry.success)
        .bind(&entry.source)
        .bind(&entry.payload)
        .bind(entry.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to append payment log: {}", e)))?;

        Ok(())
    }

    async fn find_by_payment(
        &self,
        payment_id: &PaymentId,
    ) -> Result<Vec<PaymentLogEntry>, DomainError> {
        let rows: Vec<PaymentLogRow> = sqlx::query_as(
            r#"
            SELECT id, payment_id, recurrent_payment_id, success, source, payload, created_at
            FROM payment_logs
            WHERE payment_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(payment_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load payment logs: {}", e)))?;

        Ok(rows.into_iter().map(PaymentLogEntry::from).collect())
    }
}

//! PostgreSQL implementation of RecurrentPaymentRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentId, PaymentToken, RecurrentPaymentId, SubscriptionTypeId,
    Timestamp, UserId,
};
use crate::domain::recurrent::{RecurrentPayment, RecurrentPaymentState};
use crate::ports::{RecurrentPaymentRepository, RecurrentTransition};

use super::payment_repository::{parse_column, upsert_payment};

const SELECT_COLUMNS: &str = r#"
    SELECT id, cid, user_id, gateway_code, subscription_type_id, next_subscription_type_id,
           parent_payment_id, payment_id, charge_at, expires_at, retries, state, status,
           custom_amount, note, charged_at, created_at, updated_at
    FROM recurrent_payments
"#;

pub struct PostgresRecurrentPaymentRepository {
    pool: PgPool,
}

impl PostgresRecurrentPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RecurrentPaymentRow {
    id: Uuid,
    cid: String,
    user_id: String,
    gateway_code: String,
    subscription_type_id: Uuid,
    next_subscription_type_id: Option<Uuid>,
    parent_payment_id: Option<Uuid>,
    payment_id: Option<Uuid>,
    charge_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    retries: i32,
    state: String,
    status: Option<String>,
    custom_amount: Option<Decimal>,
    note: Option<String>,
    charged_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RecurrentPaymentRow> for RecurrentPayment {
    type Error = DomainError;

    fn try_from(row: RecurrentPaymentRow) -> Result<Self, Self::Error> {
        Ok(RecurrentPayment {
            id: RecurrentPaymentId::from_uuid(row.id),
            token: PaymentToken::new(row.cid)
                .map_err(|e| DomainError::database(format!("Invalid cid: {}", e)))?,
            user_id: UserId::new(row.user_id)
                .map_err(|e| DomainError::database(format!("Invalid user_id: {}", e)))?,
            gateway_code: row.gateway_code,
            subscription_type_id: SubscriptionTypeId::from_uuid(row.subscription_type_id),
            next_subscription_type_id: row.next_subscription_type_id.map(SubscriptionTypeId::from_uuid),
            parent_payment_id: row.parent_payment_id.map(PaymentId::from_uuid),
            payment_id: row.payment_id.map(PaymentId::from_uuid),
            charge_at: Timestamp::from_datetime(row.charge_at),
            expires_at: row.expires_at.map(Timestamp::from_datetime),
            retries: row.retries,
            state: parse_column::<RecurrentPaymentState>("state", &row.state)?,
            status: row.status,
            custom_amount: row.custom_amount,
            note: row.note,
            charged_at: row.charged_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

async fn insert_row(conn: &mut PgConnection, rp: &RecurrentPayment) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        INSERT INTO recurrent_payments (
            id, cid, user_id, gateway_code, subscription_type_id, next_subscription_type_id,
            parent_payment_id, payment_id, charge_at, expires_at, retries, state, status,
            custom_amount, note, charged_at, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        "#,
    )
    .bind(rp.id.as_uuid())
    .bind(rp.token.as_str())
    .bind(rp.user_id.as_str())
    .bind(&rp.gateway_code)
    .bind(rp.subscription_type_id.as_uuid())
    .bind(rp.next_subscription_type_id.map(|id| *id.as_uuid()))
    .bind(rp.parent_payment_id.map(|id| *id.as_uuid()))
    .bind(rp.payment_id.map(|id| *id.as_uuid()))
    .bind(rp.charge_at.as_datetime())
    .bind(rp.expires_at.map(|t| *t.as_datetime()))
    .bind(rp.retries)
    .bind(rp.state.as_str())
    .bind(&rp.status)
    .bind(rp.custom_amount)
    .bind(&rp.note)
    .bind(rp.charged_at.map(|t| *t.as_datetime()))
    .bind(rp.created_at.as_datetime())
    .bind(rp.updated_at.as_datetime())
    .execute(conn)
    .await
    .map_err(|e| DomainError::database(format!("Failed to save recurrent payment: {}", e)))?;

    Ok(())
}

async fn update_row(conn: &mut PgConnection, rp: &RecurrentPayment) -> Result<(), DomainError> {
    let result = sqlx::query(
        r#"
        UPDATE recurrent_payments SET
            next_subscription_type_id = $2,
            payment_id = $3,
            charge_at = $4,
            expires_at = $5,
            retries = $6,
            state = $7,
            status = $8,
            custom_amount = $9,
            note = $10,
            charged_at = $11,
            updated_at = $12
        WHERE id = $1
        "#,
    )
    .bind(rp.id.as_uuid())
    .bind(rp.next_subscription_type_id.map(|id| *id.as_uuid()))
    .bind(rp.payment_id.map(|id| *id.as_uuid()))
    .bind(rp.charge_at.as_datetime())
    .bind(rp.expires_at.map(|t| *t.as_datetime()))
    .bind(rp.retries)
    .bind(rp.state.as_str())
    .bind(&rp.status)
    .bind(rp.custom_amount)
    .bind(&rp.note)
    .bind(rp.charged_at.map(|t| *t.as_datetime()))
    .bind(rp.updated_at.as_datetime())
    .execute(conn)
    .await
    .map_err(|e| DomainError::database(format!("Failed to update recurrent payment: {}", e)))?;

    if result.rows_affected() == 0 {
        return Err(DomainError::new(
            ErrorCode::RecurrentPaymentNotFound,
            format!("Recurrent payment not found: {}", rp.id),
        ));
    }

    Ok(())
}

/// Converts due rows, dropping malformed ones so the rest of the batch still runs.
fn convert_due_rows(rows: Vec<RecurrentPaymentRow>) -> Vec<RecurrentPayment> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id;
            match RecurrentPayment::try_from(row) {
                Ok(rp) => Some(rp),
                Err(err) => {
                    tracing::error!(
                        recurrent_payment_id = %id,
                        error = %err,
                        "Skipping malformed due recurrent payment"
                    );
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl RecurrentPaymentRepository for PostgresRecurrentPaymentRepository {
    async fn save(&self, recurrent_payment: &RecurrentPayment) -> Result<(), DomainError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DomainError::database(format!("Failed to acquire connection: {}", e)))?;
        insert_row(&mut *conn, recurrent_payment).await
    }

    async fn update(&self, recurrent_payment: &RecurrentPayment) -> Result<(), DomainError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DomainError::database(format!("Failed to acquire connection: {}", e)))?;
        update_row(&mut *conn, recurrent_payment).await
    }

    async fn find_by_id(
        &self,
        id: &RecurrentPaymentId,
    ) -> Result<Option<RecurrentPayment>, DomainError> {
        let row: Option<RecurrentPaymentRow> =
            sqlx::query_as(&format!("{} WHERE id = $1", SELECT_COLUMNS))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::database(format!("Failed to find recurrent payment: {}", e))
                })?;

        row.map(RecurrentPayment::try_from).transpose()
    }

    async fn find_due(&self, window_end: Timestamp) -> Result<Vec<RecurrentPayment>, DomainError> {
        // Random order keeps one stuck token from starving the others.
        let rows: Vec<RecurrentPaymentRow> = sqlx::query_as(&format!(
            r#"{}
            WHERE status IS NULL
              AND retries >= 0
              AND state = 'active'
              AND charge_at <= $1
            ORDER BY random()
            "#,
            SELECT_COLUMNS
        ))
        .bind(window_end.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to select due payments: {}", e)))?;

        Ok(convert_due_rows(rows))
    }

    async fn find_last_charged_by_token(
        &self,
        token: &PaymentToken,
    ) -> Result<Option<RecurrentPayment>, DomainError> {
        let row: Option<RecurrentPaymentRow> = sqlx::query_as(&format!(
            r#"{}
            WHERE cid = $1 AND state = 'charged'
            ORDER BY charged_at DESC NULLS LAST, updated_at DESC
            LIMIT 1
            "#,
            SELECT_COLUMNS
        ))
        .bind(token.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find last charge: {}", e)))?;

        row.map(RecurrentPayment::try_from).transpose()
    }

    async fn find_active_by_gateway(
        &self,
        gateway_code: &str,
    ) -> Result<Vec<RecurrentPayment>, DomainError> {
        let rows: Vec<RecurrentPaymentRow> = sqlx::query_as(&format!(
            r#"{}
            WHERE gateway_code = $1 AND state = 'active'
            ORDER BY charge_at ASC
            "#,
            SELECT_COLUMNS
        ))
        .bind(gateway_code)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find active payments: {}", e)))?;

        rows.into_iter().map(RecurrentPayment::try_from).collect()
    }

    async fn commit_transition(&self, transition: RecurrentTransition) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database(format!("Failed to begin transaction: {}", e)))?;

        if let Some(payment) = &transition.payment {
            upsert_payment(&mut *tx, payment).await?;
        }
        update_row(&mut *tx, &transition.current).await?;
        if let Some(follow_up) = &transition.follow_up {
            insert_row(&mut *tx, follow_up).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit transition: {}", e)))
    }
}

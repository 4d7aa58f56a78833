//! PostgreSQL implementation of PaymentRepository.
//!
//! A payment is stored in `payments` with its lines in `payment_items`;
//! lines are rewritten on every save so their order follows the container.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentId, SubscriptionId, SubscriptionTypeId, Timestamp, UserId,
};
use crate::domain::payment::{
    AdditionalType, Payment, PaymentItem, PaymentItemContainer, PaymentItemType, PaymentStatus,
};
use crate::ports::PaymentRepository;

pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    variable_symbol: String,
    user_id: String,
    gateway_code: String,
    subscription_type_id: Option<Uuid>,
    subscription_id: Option<Uuid>,
    amount: Decimal,
    additional_amount: Option<Decimal>,
    additional_type: Option<String>,
    status: String,
    paid_at: Option<DateTime<Utc>>,
    recurrent_charge: bool,
    note: Option<String>,
    result_code: Option<String>,
    result_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentItemRow {
    name: String,
    unit_price: Decimal,
    vat: Decimal,
    count: i32,
    item_type: String,
    subscription_type_id: Option<Uuid>,
}

impl TryFrom<PaymentItemRow> for PaymentItem {
    type Error = DomainError;

    fn try_from(row: PaymentItemRow) -> Result<Self, Self::Error> {
        Ok(PaymentItem {
            name: row.name,
            unit_price: row.unit_price,
            vat: row.vat,
            count: u32::try_from(row.count).map_err(|_| {
                DomainError::database(format!("Invalid payment item count: {}", row.count))
            })?,
            item_type: parse_column::<PaymentItemType>("item_type", &row.item_type)?,
            subscription_type_id: row.subscription_type_id.map(SubscriptionTypeId::from_uuid),
        })
    }
}

fn payment_from_rows(row: PaymentRow, items: Vec<PaymentItemRow>) -> Result<Payment, DomainError> {
    let items = items
        .into_iter()
        .map(PaymentItem::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Payment {
        id: PaymentId::from_uuid(row.id),
        variable_symbol: row.variable_symbol,
        user_id: UserId::new(row.user_id)
            .map_err(|e| DomainError::database(format!("Invalid user_id: {}", e)))?,
        gateway_code: row.gateway_code,
        subscription_type_id: row.subscription_type_id.map(SubscriptionTypeId::from_uuid),
        subscription_id: row.subscription_id.map(SubscriptionId::from_uuid),
        amount: row.amount,
        additional_amount: row.additional_amount,
        additional_type: row
            .additional_type
            .as_deref()
            .map(|s| parse_column::<AdditionalType>("additional_type", s))
            .transpose()?,
        status: parse_column::<PaymentStatus>("status", &row.status)?,
        paid_at: row.paid_at.map(Timestamp::from_datetime),
        recurrent_charge: row.recurrent_charge,
        items: PaymentItemContainer::from_items(items),
        note: row.note,
        result_code: row.result_code,
        result_message: row.result_message,
        created_at: Timestamp::from_datetime(row.created_at),
        updated_at: Timestamp::from_datetime(row.updated_at),
    })
}

/// Parses a text column into a domain enum.
pub(super) fn parse_column<T>(column: &str, value: &str) -> Result<T, DomainError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| DomainError::database(format!("Invalid {} value '{}': {}", column, value, e)))
}

/// Inserts the payment or updates every mutable column of an existing one,
/// then rewrites its items.
pub(super) async fn upsert_payment(
    conn: &mut PgConnection,
    payment: &Payment,
) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        INSERT INTO payments (
            id, variable_symbol, user_id, gateway_code, subscription_type_id, subscription_id,
            amount, additional_amount, additional_type, status, paid_at, recurrent_charge,
            note, result_code, result_message, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        ON CONFLICT (id) DO UPDATE SET
            amount = EXCLUDED.amount,
            additional_amount = EXCLUDED.additional_amount,
            additional_type = EXCLUDED.additional_type,
            status = EXCLUDED.status,
            paid_at = EXCLUDED.paid_at,
            subscription_id = EXCLUDED.subscription_id,
            note = EXCLUDED.note,
            result_code = EXCLUDED.result_code,
            result_message = EXCLUDED.result_message,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(payment.id.as_uuid())
    .bind(&payment.variable_symbol)
    .bind(payment.user_id.as_str())
    .bind(&payment.gateway_code)
    .bind(payment.subscription_type_id.map(|id| *id.as_uuid()))
    .bind(payment.subscription_id.map(|id| *id.as_uuid()))
    .bind(payment.amount)
    .bind(payment.additional_amount)
    .bind(payment.additional_type.map(|t| t.as_str()))
    .bind(payment.status.as_str())
    .bind(payment.paid_at.map(|t| *t.as_datetime()))
    .bind(payment.recurrent_charge)
    .bind(&payment.note)
    .bind(&payment.result_code)
    .bind(&payment.result_message)
    .bind(payment.created_at.as_datetime())
    .bind(payment.updated_at.as_datetime())
    .execute(&mut *conn)
    .await
    .map_err(|e| DomainError::database(format!("Failed to save payment: {}", e)))?;

    replace_items(conn, payment).await
}

async fn replace_items(conn: &mut PgConnection, payment: &Payment) -> Result<(), DomainError> {
    sqlx::query("DELETE FROM payment_items WHERE payment_id = $1")
        .bind(payment.id.as_uuid())
        .execute(&mut *conn)
        .await
        .map_err(|e| DomainError::database(format!("Failed to clear payment items: {}", e)))?;

    for (position, item) in payment.items.items().iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO payment_items (
                payment_id, position, name, unit_price, vat, count, item_type, subscription_type_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(position as i32)
        .bind(&item.name)
        .bind(item.unit_price)
        .bind(item.vat)
        .bind(item.count as i32)
        .bind(item.item_type.as_str())
        .bind(item.subscription_type_id.map(|id| *id.as_uuid()))
        .execute(&mut *conn)
        .await
        .map_err(|e| DomainError::database(format!("Failed to save payment item: {}", e)))?;
    }

    Ok(())
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn save(&self, payment: &Payment) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database(format!("Failed to begin transaction: {}", e)))?;

        upsert_payment(&mut *tx, payment).await?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit payment: {}", e)))
    }

    async fn update(&self, payment: &Payment) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database(format!("Failed to begin transaction: {}", e)))?;

        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM payments WHERE id = $1 FOR UPDATE")
            .bind(payment.id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| DomainError::database(format!("Failed to lock payment: {}", e)))?;
        if exists.is_none() {
            return Err(DomainError::new(
                ErrorCode::PaymentNotFound,
                format!("Payment not found: {}", payment.id),
            ));
        }

        upsert_payment(&mut *tx, payment).await?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit payment: {}", e)))
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, variable_symbol, user_id, gateway_code, subscription_type_id, subscription_id,
                   amount, additional_amount, additional_type, status, paid_at, recurrent_charge,
                   note, result_code, result_message, created_at, updated_at
            FROM payments
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find payment: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items: Vec<PaymentItemRow> = sqlx::query_as(
            r#"
            SELECT name, unit_price, vat, count, item_type, subscription_type_id
            FROM payment_items
            WHERE payment_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load payment items: {}", e)))?;

        payment_from_rows(row, items).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item_row(item_type: &str, count: i32) -> PaymentItemRow {
        PaymentItemRow {
            name: "Web".to_string(),
            unit_price: dec!(4.20),
            vat: dec!(20),
            count,
            item_type: item_type.to_string(),
            subscription_type_id: None,
        }
    }

    fn payment_row(status: &str, additional_type: Option<&str>) -> PaymentRow {
        let now = Utc::now();
        PaymentRow {
            id: Uuid::new_v4(),
            variable_symbol: "1234567890".to_string(),
            user_id: "user-1".to_string(),
            gateway_code: "comfortpay".to_string(),
            subscription_type_id: None,
            subscription_id: None,
            amount: dec!(4.20),
            additional_amount: None,
            additional_type: additional_type.map(str::to_string),
            status: status.to_string(),
            paid_at: None,
            recurrent_charge: true,
            note: None,
            result_code: None,
            result_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn item_row_converts_to_domain() {
        let item = PaymentItem::try_from(item_row("subscription_type", 2)).unwrap();

        assert_eq!(item.item_type, PaymentItemType::Subscription);
        assert_eq!(item.count, 2);
    }

    #[test]
    fn item_row_rejects_negative_count_and_unknown_type() {
        assert!(PaymentItem::try_from(item_row("subscription_type", -1)).is_err());
        assert!(PaymentItem::try_from(item_row("voucher", 1)).is_err());
    }

    #[test]
    fn payment_rows_convert_with_items_in_order() {
        let mut donation = item_row("donation", 1);
        donation.name = "Donation".to_string();

        let payment = payment_from_rows(
            payment_row("paid", Some("recurrent")),
            vec![item_row("subscription_type", 1), donation],
        )
        .unwrap();

        assert_eq!(payment.status, PaymentStatus::Paid);
        assert_eq!(payment.additional_type, Some(AdditionalType::Recurrent));
        assert_eq!(payment.items.len(), 2);
        assert_eq!(payment.items.items()[1].name, "Donation");
    }

    #[test]
    fn payment_row_rejects_unknown_status() {
        let err = payment_from_rows(payment_row("lost", None), Vec::new()).unwrap_err();

        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(err.message().contains("status"));
    }
}

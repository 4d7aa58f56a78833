//! PostgreSQL implementation of SubscriptionTypeReader.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, SubscriptionTypeId};
use crate::domain::subscription::{SubscriptionType, SubscriptionTypeItem};
use crate::ports::SubscriptionTypeReader;

pub struct PostgresSubscriptionTypeReader {
    pool: PgPool,
}

impl PostgresSubscriptionTypeReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionTypeRow {
    id: Uuid,
    code: String,
    name: String,
    price: Decimal,
    length_days: i32,
    next_subscription_type_id: Option<Uuid>,
    active: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionTypeItemRow {
    name: String,
    amount: Decimal,
    vat: Decimal,
}

fn to_domain(
    row: SubscriptionTypeRow,
    items: Vec<SubscriptionTypeItemRow>,
) -> Result<SubscriptionType, DomainError> {
    let length_days = u32::try_from(row.length_days).map_err(|_| {
        DomainError::database(format!(
            "Invalid length_days {} for subscription type {}",
            row.length_days, row.code
        ))
    })?;

    Ok(SubscriptionType {
        id: SubscriptionTypeId::from_uuid(row.id),
        code: row.code,
        name: row.name,
        price: row.price,
        length_days,
        items: items
            .into_iter()
            .map(|item| SubscriptionTypeItem {
                name: item.name,
                amount: item.amount,
                vat: item.vat,
            })
            .collect(),
        next_subscription_type_id: row.next_subscription_type_id.map(SubscriptionTypeId::from_uuid),
        active: row.active,
    })
}

#[async_trait]
impl SubscriptionTypeReader for PostgresSubscriptionTypeReader {
    async fn find_by_id(
        &self,
        id: &SubscriptionTypeId,
    ) -> Result<Option<SubscriptionType>, DomainError> {
        let row: Option<SubscriptionTypeRow> = sqlx::query_as(
            r#"
            SELECT id, code, name, price, length_days, next_subscription_type_id, active
            FROM subscription_types
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find subscription type: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items: Vec<SubscriptionTypeItemRow> = sqlx::query_as(
            r#"
            SELECT name, amount, vat
            FROM subscription_type_items
            WHERE subscription_type_id = $1
            ORDER BY sorting ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to load subscription type items: {}", e))
        })?;

        to_domain(row, items).map(Some)
    }
}

//! PostgreSQL implementation of PaymentGatewayReader.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::DomainError;
use crate::domain::payment::PaymentGateway;
use crate::ports::PaymentGatewayReader;

pub struct PostgresPaymentGatewayReader {
    pool: PgPool,
}

impl PostgresPaymentGatewayReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentGatewayRow {
    code: String,
    name: String,
    active: bool,
    visible: bool,
    is_recurrent: bool,
    sorting: i32,
}

impl From<PaymentGatewayRow> for PaymentGateway {
    fn from(row: PaymentGatewayRow) -> Self {
        PaymentGateway {
            code: row.code,
            name: row.name,
            active: row.active,
            visible: row.visible,
            is_recurrent: row.is_recurrent,
            sorting: row.sorting,
        }
    }
}

#[async_trait]
impl PaymentGatewayReader for PostgresPaymentGatewayReader {
    async fn find_all(&self) -> Result<Vec<PaymentGateway>, DomainError> {
        let rows: Vec<PaymentGatewayRow> = sqlx::query_as(
            r#"
            SELECT code, name, active, visible, is_recurrent, sorting
            FROM payment_gateways
            ORDER BY sorting, code
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load payment gateways: {}", e)))?;

        Ok(rows.into_iter().map(PaymentGateway::from).collect())
    }
}

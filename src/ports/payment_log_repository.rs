//! Payment log port - append-only audit of gateway calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::foundation::{DomainError, PaymentId, PaymentLogId, RecurrentPaymentId, Timestamp};

/// Source tag of entries written by the recurring charge run.
pub const RECURRENT_CHARGE_LOG_SOURCE: &str = "recurrent_payment_charge";

/// Immutable audit record of one gateway call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentLogEntry {
    pub id: PaymentLogId,
    pub payment_id: PaymentId,
    pub recurrent_payment_id: Option<RecurrentPaymentId>,
    pub success: bool,
    pub source: String,
    /// Raw gateway response.
    pub payload: JsonValue,
    pub created_at: Timestamp,
}

#[async_trait]
pub trait PaymentLogRepository: Send + Sync {
    async fn append(&self, entry: &PaymentLogEntry) -> Result<(), DomainError>;

    /// Entries of a payment, oldest first.
    async fn find_by_payment(&self, payment_id: &PaymentId)
        -> Result<Vec<PaymentLogEntry>, DomainError>;
}

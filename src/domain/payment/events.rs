//! Payment domain events.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{EventId, PaymentId, Timestamp, UserId};

/// A settled payment was refunded through its gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRefunded {
    pub event_id: EventId,
    pub payment_id: PaymentId,
    pub user_id: UserId,
    pub gateway_code: String,
    pub amount: Decimal,
    pub occurred_at: Timestamp,
}

crate::domain_event!(
    PaymentRefunded,
    event_type = "payment.refunded.v1",
    schema_version = 1,
    aggregate_id = payment_id,
    aggregate_type = "Payment",
    occurred_at = occurred_at,
    event_id = event_id
);

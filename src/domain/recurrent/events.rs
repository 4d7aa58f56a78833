//! Recurrent payment domain events.
//!
//! Consumed by subscription provisioning, customer notifications and
//! analytics.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{EventId, PaymentId, RecurrentPaymentId, Timestamp, UserId};
use crate::domain_event;

use super::RecurrentPaymentState;

/// The stored token was charged successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrentPaymentCharged {
    pub event_id: EventId,
    pub recurrent_payment_id: RecurrentPaymentId,
    pub user_id: UserId,
    pub payment_id: PaymentId,
    pub amount: Decimal,
    pub gateway_code: String,
    pub next_recurrent_payment_id: RecurrentPaymentId,
    pub next_charge_at: Timestamp,
    pub occurred_at: Timestamp,
}

domain_event!(
    RecurrentPaymentCharged,
    event_type = "recurrent_payment.charged.v1",
    schema_version = 1,
    aggregate_id = recurrent_payment_id,
    aggregate_type = "RecurrentPayment",
    occurred_at = occurred_at,
    event_id = event_id
);

/// The gateway accepted the charge for asynchronous confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrentPaymentPending {
    pub event_id: EventId,
    pub recurrent_payment_id: RecurrentPaymentId,
    pub user_id: UserId,
    pub payment_id: PaymentId,
    pub result_code: String,
    pub occurred_at: Timestamp,
}

domain_event!(
    RecurrentPaymentPending,
    event_type = "recurrent_payment.pending.v1",
    schema_version = 1,
    aggregate_id = recurrent_payment_id,
    aggregate_type = "RecurrentPayment",
    occurred_at = occurred_at,
    event_id = event_id
);

/// A retryable decline or transport error; a retry row was scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrentPaymentChargeFailed {
    pub event_id: EventId,
    pub recurrent_payment_id: RecurrentPaymentId,
    pub user_id: UserId,
    pub payment_id: PaymentId,
    pub result_code: String,
    pub result_message: String,
    /// True when the failure was a transport error, not a decline.
    pub transport_error: bool,
    pub retries_remaining: i32,
    pub retry_recurrent_payment_id: RecurrentPaymentId,
    pub retry_at: Timestamp,
    pub occurred_at: Timestamp,
}

domain_event!(
    RecurrentPaymentChargeFailed,
    event_type = "recurrent_payment.charge_failed.v1",
    schema_version = 1,
    aggregate_id = recurrent_payment_id,
    aggregate_type = "RecurrentPayment",
    occurred_at = occurred_at,
    event_id = event_id
);

/// The row entered a stop state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrentPaymentStopped {
    pub event_id: EventId,
    pub recurrent_payment_id: RecurrentPaymentId,
    pub user_id: UserId,
    pub state: RecurrentPaymentState,
    pub result_code: Option<String>,
    pub reason: String,
    pub occurred_at: Timestamp,
}

domain_event!(
    RecurrentPaymentStopped,
    event_type = "recurrent_payment.stopped.v1",
    schema_version = 1,
    aggregate_id = recurrent_payment_id,
    aggregate_type = "RecurrentPayment",
    occurred_at = occurred_at,
    event_id = event_id
);

/// A follow-up row (next cycle or retry) was scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrentPaymentScheduled {
    pub event_id: EventId,
    pub recurrent_payment_id: RecurrentPaymentId,
    pub previous_recurrent_payment_id: RecurrentPaymentId,
    pub user_id: UserId,
    pub charge_at: Timestamp,
    pub retries: i32,
    pub occurred_at: Timestamp,
}

domain_event!(
    RecurrentPaymentScheduled,
    event_type = "recurrent_payment.scheduled.v1",
    schema_version = 1,
    aggregate_id = recurrent_payment_id,
    aggregate_type = "RecurrentPayment",
    occurred_at = occurred_at,
    event_id = event_id
);

/// A stopped row was returned to `active`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrentPaymentReactivated {
    pub event_id: EventId,
    pub recurrent_payment_id: RecurrentPaymentId,
    pub user_id: UserId,
    pub previous_state: RecurrentPaymentState,
    pub charge_at: Timestamp,
    pub occurred_at: Timestamp,
}

domain_event!(
    RecurrentPaymentReactivated,
    event_type = "recurrent_payment.reactivated.v1",
    schema_version = 1,
    aggregate_id = recurrent_payment_id,
    aggregate_type = "RecurrentPayment",
    occurred_at = occurred_at,
    event_id = event_id
);

/// The gateway reported a new expiration date for the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrentPaymentExpirationUpdated {
    pub event_id: EventId,
    pub recurrent_payment_id: RecurrentPaymentId,
    pub user_id: UserId,
    pub expires_at: Timestamp,
    pub occurred_at: Timestamp,
}

domain_event!(
    RecurrentPaymentExpirationUpdated,
    event_type = "recurrent_payment.expiration_updated.v1",
    schema_version = 1,
    aggregate_id = recurrent_payment_id,
    aggregate_type = "RecurrentPayment",
    occurred_at = occurred_at,
    event_id = event_id
);

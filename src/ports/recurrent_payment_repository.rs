//! Recurrent payment repository port.
//!
//! `commit_transition` is the only path that changes the state of a
//! recurrent payment during a charge run: it stores the payment, the
//! current row and the optional follow-up row in one atomic unit.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, PaymentToken, RecurrentPaymentId, Timestamp};
use crate::domain::payment::Payment;
use crate::domain::recurrent::RecurrentPayment;

/// One atomic change of a recurrent payment chain.
#[derive(Debug, Clone)]
pub struct RecurrentTransition {
    /// Payment to insert or update.
    pub payment: Option<Payment>,
    /// Row being processed; must already exist.
    pub current: RecurrentPayment,
    /// New row to insert (retry or next cycle).
    pub follow_up: Option<RecurrentPayment>,
}

impl RecurrentTransition {
    pub fn new(current: RecurrentPayment) -> Self {
        Self {
            payment: None,
            current,
            follow_up: None,
        }
    }

    pub fn with_payment(mut self, payment: Payment) -> Self {
        self.payment = Some(payment);
        self
    }

    pub fn with_follow_up(mut self, follow_up: RecurrentPayment) -> Self {
        self.follow_up = Some(follow_up);
        self
    }
}

#[async_trait]
pub trait RecurrentPaymentRepository: Send + Sync {
    /// Insert a new row.
    async fn save(&self, recurrent_payment: &RecurrentPayment) -> Result<(), DomainError>;

    /// Update an existing row outside a charge (operator actions, expiration).
    ///
    /// # Errors
    ///
    /// - `RecurrentPaymentNotFound` if the row doesn't exist
    async fn update(&self, recurrent_payment: &RecurrentPayment) -> Result<(), DomainError>;

    async fn find_by_id(
        &self,
        id: &RecurrentPaymentId,
    ) -> Result<Option<RecurrentPayment>, DomainError>;

    /// Rows due up to `window_end`, in random order.
    ///
    /// Due means `status IS NULL AND retries >= 0 AND state = 'active'
    /// AND charge_at <= window_end`.
    async fn find_due(&self, window_end: Timestamp) -> Result<Vec<RecurrentPayment>, DomainError>;

    /// Most recent `charged` row for the token.
    async fn find_last_charged_by_token(
        &self,
        token: &PaymentToken,
    ) -> Result<Option<RecurrentPayment>, DomainError>;

    /// Active rows whose token was issued by the gateway.
    async fn find_active_by_gateway(
        &self,
        gateway_code: &str,
    ) -> Result<Vec<RecurrentPayment>, DomainError>;

    /// Persist a transition atomically.
    ///
    /// # Errors
    ///
    /// - `RecurrentPaymentNotFound` if `current` doesn't exist
    /// - `DatabaseError` on persistence failure; nothing is written
    async fn commit_transition(&self, transition: RecurrentTransition) -> Result<(), DomainError>;
}

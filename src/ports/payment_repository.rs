//! Payment repository port.
//!
//! Payments created by the charge run are persisted together with their
//! recurrent payment through `RecurrentPaymentRepository::commit_transition`;
//! this port covers standalone reads and writes.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, PaymentId};
use crate::domain::payment::Payment;

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Save a new payment with its items.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the variable symbol is already used
    /// - `DatabaseError` on persistence failure
    async fn save(&self, payment: &Payment) -> Result<(), DomainError>;

    /// Update status, result and timestamps of an existing payment.
    ///
    /// Items are immutable and not rewritten.
    ///
    /// # Errors
    ///
    /// - `PaymentNotFound` if the payment doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update(&self, payment: &Payment) -> Result<(), DomainError>;

    /// Find a payment (with items) by ID.
    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError>;
}

//! In-memory payment log.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, PaymentId};
use crate::ports::{PaymentLogEntry, PaymentLogRepository};

/// Append-only log kept in memory.
///
/// # Panics
///
/// Methods panic if the internal lock is poisoned.
#[derive(Default, Clone)]
pub struct InMemoryPaymentLog {
    entries: Arc<Mutex<Vec<PaymentLogEntry>>>,
}

impl InMemoryPaymentLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<PaymentLogEntry> {
        self.entries
            .lock()
            .expect("InMemoryPaymentLog: lock poisoned")
            .clone()
    }
}

#[async_trait]
impl PaymentLogRepository for InMemoryPaymentLog {
    async fn append(&self, entry: &PaymentLogEntry) -> Result<(), DomainError> {
        self.entries
            .lock()
            .expect("InMemoryPaymentLog: lock poisoned")
            .push(entry.clone());
        Ok(())
    }

    async fn find_by_payment(
        &self,
        payment_id: &PaymentId,
    ) -> Result<Vec<PaymentLogEntry>, DomainError> {
        Ok(self
            .entries()
            .into_iter()
            .filter(|e| &e.payment_id == payment_id)
            .collect())
    }
}

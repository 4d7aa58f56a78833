//! In-memory payment and recurrent payment storage.
//!
//! One store backs both repository ports so a `RecurrentTransition` can
//! write the payment and the recurrent rows under a single lock, the same
//! atomic unit the Postgres adapter gets from a transaction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rand::seq::SliceRandom;

use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentId, PaymentToken, RecurrentPaymentId, Timestamp,
};
use crate::domain::payment::Payment;
use crate::domain::recurrent::{RecurrentPayment, RecurrentPaymentState};
use crate::ports::{PaymentRepository, RecurrentPaymentRepository, RecurrentTransition};

#[derive(Default)]
struct StoreState {
    payments: HashMap<PaymentId, Payment>,
    recurrent: HashMap<RecurrentPaymentId, RecurrentPayment>,
    /// Insertion order of recurrent rows, used for "latest" lookups.
    recurrent_order: Vec<RecurrentPaymentId>,
    fail_commits: bool,
}

/// Shared in-memory storage for payments and recurrent payments.
///
/// Cloning yields a handle to the same storage.
///
/// # Panics
///
/// Methods panic if the internal lock is poisoned.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    inner: Arc<Mutex<StoreState>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `commit_transition` fail with a database error.
    pub fn set_fail_commits(&self, fail: bool) {
        self.state().fail_commits = fail;
    }

    pub fn payments(&self) -> Vec<Payment> {
        self.state().payments.values().cloned().collect()
    }

    /// Recurrent rows in insertion order.
    pub fn recurrent_payments(&self) -> Vec<RecurrentPayment> {
        let state = self.state();
        state
            .recurrent_order
            .iter()
            .filter_map(|id| state.recurrent.get(id).cloned())
            .collect()
    }

    /// Recurrent rows of one token in insertion order.
    pub fn chain_of(&self, token: &PaymentToken) -> Vec<RecurrentPayment> {
        self.recurrent_payments()
            .into_iter()
            .filter(|rp| &rp.token == token)
            .collect()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.inner
            .lock()
            .expect("InMemoryPaymentStore: state lock poisoned")
    }
}

fn recurrent_not_found(id: &RecurrentPaymentId) -> DomainError {
    DomainError::new(
        ErrorCode::RecurrentPaymentNotFound,
        format!("Recurrent payment not found: {}", id),
    )
}

impl StoreState {
    fn insert_recurrent(&mut self, recurrent_payment: RecurrentPayment) {
        if !self.recurrent.contains_key(&recurrent_payment.id) {
            self.recurrent_order.push(recurrent_payment.id);
        }
        self.recurrent.insert(recurrent_payment.id, recurrent_payment);
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentStore {
    async fn save(&self, payment: &Payment) -> Result<(), DomainError> {
        self.state().payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn update(&self, payment: &Payment) -> Result<(), DomainError> {
        let mut state = self.state();
        match state.payments.get_mut(&payment.id) {
            Some(existing) => {
                *existing = payment.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::PaymentNotFound,
                format!("Payment not found: {}", payment.id),
            )),
        }
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        Ok(self.state().payments.get(id).cloned())
    }
}

#[async_trait]
impl RecurrentPaymentRepository for InMemoryPaymentStore {
    async fn save(&self, recurrent_payment: &RecurrentPayment) -> Result<(), DomainError> {
        self.state().insert_recurrent(recurrent_payment.clone());
        Ok(())
    }

    async fn update(&self, recurrent_payment: &RecurrentPayment) -> Result<(), DomainError> {
        let mut state = self.state();
        match state.recurrent.get_mut(&recurrent_payment.id) {
            Some(existing) => {
                *existing = recurrent_payment.clone();
                Ok(())
            }
            None => Err(recurrent_not_found(&recurrent_payment.id)),
        }
    }

    async fn find_by_id(
        &self,
        id: &RecurrentPaymentId,
    ) -> Result<Option<RecurrentPayment>, DomainError> {
        Ok(self.state().recurrent.get(id).cloned())
    }

    async fn find_due(&self, window_end: Timestamp) -> Result<Vec<RecurrentPayment>, DomainError> {
        let mut due: Vec<RecurrentPayment> = self
            .state()
            .recurrent
            .values()
            .filter(|rp| rp.is_due(&window_end))
            .cloned()
            .collect();
        due.shuffle(&mut rand::thread_rng());
        Ok(due)
    }

    async fn find_last_charged_by_token(
        &self,
        token: &PaymentToken,
    ) -> Result<Option<RecurrentPayment>, DomainError> {
        Ok(self
            .chain_of(token)
            .into_iter()
            .filter(|rp| rp.state == RecurrentPaymentState::Charged)
            .max_by_key(|rp| rp.charged_at.unwrap_or(rp.updated_at)))
    }

    async fn find_active_by_gateway(
        &self,
        gateway_code: &str,
    ) -> Result<Vec<RecurrentPayment>, DomainError> {
        Ok(self
            .recurrent_payments()
            .into_iter()
            .filter(|rp| {
                rp.gateway_code == gateway_code && rp.state == RecurrentPaymentState::Active
            })
            .collect())
    }

    async fn commit_transition(&self, transition: RecurrentTransition) -> Result<(), DomainError> {
        let mut state = self.state();
        if state.fail_commits {
            return Err(DomainError::database("commit rejected by test store"));
        }
        if !state.recurrent.contains_key(&transition.current.id) {
            return Err(recurrent_not_found(&transition.current.id));
        }

        if let Some(payment) = transition.payment {
            state.payments.insert(payment.id, payment);
        }
        state.insert_recurrent(transition.current);
        if let Some(follow_up) = transition.follow_up {
            state.insert_recurrent(follow_up);
        }
        Ok(())
    }
}

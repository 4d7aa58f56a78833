//! RecurrentPayment aggregate.
//!
//! One row is one scheduled charge attempt for a stored token. Retries and
//! renewals never reuse a row: they append a successor row referencing the
//! same token, so the chain of rows is the billing history of the token.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentId, PaymentToken, RecurrentPaymentId, StateMachine,
    SubscriptionTypeId, Timestamp, UserId,
};

use super::RecurrentPaymentState;

/// Retries value meaning "never charge automatically".
pub const NO_CHARGE_RETRIES: i32 = -1;

/// Input for [`RecurrentPayment::create`].
#[derive(Debug, Clone)]
pub struct NewRecurrentPayment {
    pub token: PaymentToken,
    pub user_id: UserId,
    pub gateway_code: String,
    pub subscription_type_id: SubscriptionTypeId,
    pub next_subscription_type_id: Option<SubscriptionTypeId>,
    pub parent_payment_id: Option<PaymentId>,
    pub charge_at: Timestamp,
    pub expires_at: Option<Timestamp>,
    pub retries: i32,
    pub custom_amount: Option<Decimal>,
}

/// One scheduled recurring charge attempt.
///
/// # Invariants
///
/// - `status == None` means the row was never attempted
/// - automatic charging requires `retries >= 0`
/// - state changes follow [`RecurrentPaymentState`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrentPayment {
    pub id: RecurrentPaymentId,
    /// Gateway token (`cid`) of the stored payment method.
    pub token: PaymentToken,
    pub user_id: UserId,
    pub gateway_code: String,
    pub subscription_type_id: SubscriptionTypeId,
    /// Scheduled upgrade applied on the next charge.
    pub next_subscription_type_id: Option<SubscriptionTypeId>,
    /// Payment that established the token or the previous cycle.
    pub parent_payment_id: Option<PaymentId>,
    /// Payment created for this attempt.
    pub payment_id: Option<PaymentId>,
    pub charge_at: Timestamp,
    pub expires_at: Option<Timestamp>,
    pub retries: i32,
    pub state: RecurrentPaymentState,
    /// Raw gateway result code of the attempt.
    pub status: Option<String>,
    pub custom_amount: Option<Decimal>,
    /// Audit trail of automatic and operator actions.
    pub note: Option<String>,
    pub charged_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl RecurrentPayment {
    /// Creates a new active row.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `retries` is below the no-charge sentinel
    /// or the custom amount is not positive.
    pub fn create(new: NewRecurrentPayment, now: Timestamp) -> Result<Self, DomainError> {
        if new.retries < NO_CHARGE_RETRIES {
            return Err(DomainError::validation(
                "retries",
                format!("retries must be >= {}", NO_CHARGE_RETRIES),
            ));
        }
        if let Some(amount) = new.custom_amount {
            crate::domain::foundation::money::validate_amount("custom_amount", amount)?;
        }
        if new.gateway_code.trim().is_empty() {
            return Err(DomainError::validation(
                "gateway_code",
                "gateway code cannot be empty",
            ));
        }

        Ok(Self {
            id: RecurrentPaymentId::new(),
            token: new.token,
            user_id: new.user_id,
            gateway_code: new.gateway_code,
            subscription_type_id: new.subscription_type_id,
            next_subscription_type_id: new.next_subscription_type_id,
            parent_payment_id: new.parent_payment_id,
            payment_id: None,
            charge_at: new.charge_at,
            expires_at: new.expires_at,
            retries: new.retries,
            state: RecurrentPaymentState::Active,
            status: None,
            custom_amount: new.custom_amount,
            note: None,
            charged_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns true if the row should be charged by a run whose window ends
    /// at `window_end`.
    pub fn is_due(&self, window_end: &Timestamp) -> bool {
        self.status.is_none()
            && self.retries >= 0
            && self.state == RecurrentPaymentState::Active
            && !self.charge_at.is_after(window_end)
    }

    /// Links the payment created for this attempt.
    pub fn attach_payment(&mut self, payment_id: PaymentId, now: Timestamp) {
        self.payment_id = Some(payment_id);
        self.updated_at = now;
    }

    /// Records a successful charge.
    pub fn mark_charged(&mut self, result_code: impl Into<String>, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(RecurrentPaymentState::Charged, now)?;
        self.status = Some(result_code.into());
        self.charged_at = Some(now);
        Ok(())
    }

    /// Records an asynchronous (pending) gateway answer.
    ///
    /// The state stays `active`; storing the code removes the row from due
    /// selection until the confirmation arrives.
    pub fn mark_pending(&mut self, result_code: impl Into<String>, now: Timestamp) -> Result<(), DomainError> {
        if self.state != RecurrentPaymentState::Active {
            return Err(self.invalid_transition(RecurrentPaymentState::Active));
        }
        self.status = Some(result_code.into());
        self.updated_at = now;
        Ok(())
    }

    /// Records a retryable decline.
    pub fn mark_charge_failed(
        &mut self,
        result_code: impl Into<String>,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        self.transition_to(RecurrentPaymentState::ChargeFailed, now)?;
        self.status = Some(result_code.into());
        Ok(())
    }

    /// Stops the row automatically.
    pub fn stop_by_system(
        &mut self,
        result_code: Option<String>,
        note: impl AsRef<str>,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        self.transition_to(RecurrentPaymentState::SystemStop, now)?;
        if result_code.is_some() {
            self.status = result_code;
        }
        self.append_note(note);
        Ok(())
    }

    /// Stops the row on the customer's request.
    pub fn stop_by_user(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(RecurrentPaymentState::UserStop, now)?;
        self.append_note(format!("Stopped by user at {}", now.as_datetime().to_rfc3339()));
        Ok(())
    }

    /// Stops the row by an administrator.
    pub fn stop_by_admin(&mut self, admin: &str, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(RecurrentPaymentState::AdminStop, now)?;
        self.append_note(format!(
            "Stopped by admin {} at {}",
            admin,
            now.as_datetime().to_rfc3339()
        ));
        Ok(())
    }

    /// Returns a stopped row to `active` so it is selected again.
    ///
    /// Clears the stored result code and grants `retries` attempts.
    pub fn reactivate(
        &mut self,
        retries: i32,
        charge_at: Timestamp,
        now: Timestamp,
    ) -> Result<RecurrentPaymentState, DomainError> {
        let previous = self.state;
        self.transition_to(RecurrentPaymentState::Active, now)?;
        self.status = None;
        self.retries = retries.max(0);
        self.charge_at = charge_at;
        self.append_note(format!(
            "Reactivated from {} at {}",
            previous,
            now.as_datetime().to_rfc3339()
        ));
        Ok(previous)
    }

    /// Stores the expiration date reported by the gateway.
    pub fn update_expiration(&mut self, expires_at: Timestamp, now: Timestamp) {
        self.expires_at = Some(expires_at);
        self.updated_at = now;
    }

    /// Appends one line to the audit note.
    pub fn append_note(&mut self, line: impl AsRef<str>) {
        let line = line.as_ref();
        self.note = Some(match self.note.take() {
            Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, line),
            _ => line.to_string(),
        });
    }

    /// Builds the row that retries this attempt.
    ///
    /// Token, product, parent payment and custom amount are carried over;
    /// the new row has its own id and no payment.
    pub fn retry_successor(&self, retries: i32, charge_at: Timestamp, now: Timestamp) -> Self {
        Self {
            id: RecurrentPaymentId::new(),
            payment_id: None,
            charge_at,
            retries,
            state: RecurrentPaymentState::Active,
            status: None,
            note: None,
            charged_at: None,
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }

    /// Builds the row for the next billing cycle after a successful charge.
    pub fn next_cycle(
        &self,
        charged_payment_id: PaymentId,
        subscription_type_id: SubscriptionTypeId,
        custom_amount: Option<Decimal>,
        retries: i32,
        charge_at: Timestamp,
        now: Timestamp,
    ) -> Self {
        Self {
            id: RecurrentPaymentId::new(),
            subscription_type_id,
            next_subscription_type_id: None,
            parent_payment_id: Some(charged_payment_id),
            payment_id: None,
            charge_at,
            retries,
            state: RecurrentPaymentState::Active,
            status: None,
            custom_amount,
            note: None,
            charged_at: None,
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }

    fn transition_to(&mut self, target: RecurrentPaymentState, now: Timestamp) -> Result<(), DomainError> {
        self.state = self
            .state
            .transition_to(target)
            .map_err(|_| self.invalid_transition(target))?;
        self.updated_at = now;
        Ok(())
    }

    fn invalid_transition(&self, target: RecurrentPaymentState) -> DomainError {
        DomainError::new(
            ErrorCode::InvalidStateTransition,
            format!(
                "Cannot transition recurrent payment {} from {} to {}",
                self.id, self.state, target
            ),
        )
    }
}

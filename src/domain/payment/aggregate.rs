//! Payment aggregate entity.
//!
//! A payment is created in `Form` status, carries its priced line items and
//! moves through `PaymentStatus` as gateways confirm or reject it. Payments
//! are never deleted.

use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{
    money, PaymentId, StateMachine, SubscriptionId, SubscriptionTypeId, Timestamp, UserId,
    ValidationError,
};

use super::{PaymentError, PaymentItemContainer, PaymentStatus};

/// How a donation add-on was attached to a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdditionalType {
    /// Donated once, not repeated on renewals.
    Single,
    /// Donated on every recurring charge.
    Recurrent,
}

impl AdditionalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdditionalType::Single => "single",
            AdditionalType::Recurrent => "recurrent",
        }
    }
}

impl FromStr for AdditionalType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(AdditionalType::Single),
            "recurrent" => Ok(AdditionalType::Recurrent),
            other => Err(ValidationError::invalid_format(
                "additional_type",
                format!("unknown additional type '{}'", other),
            )),
        }
    }
}

impl fmt::Display for AdditionalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generates a ten digit variable symbol.
///
/// Uniqueness is enforced by the payment store.
pub fn generate_variable_symbol() -> String {
    let mut rng = rand::thread_rng();
    rng.gen_range(1_000_000_000u64..10_000_000_000u64).to_string()
}

/// Input for [`Payment::create`].
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub id: PaymentId,
    pub variable_symbol: String,
    pub user_id: UserId,
    pub gateway_code: String,
    pub subscription_type_id: Option<SubscriptionTypeId>,
    pub subscription_id: Option<SubscriptionId>,
    pub items: PaymentItemContainer,
    /// Explicit amount; when `None` the item total is used.
    pub amount: Option<Decimal>,
    pub additional_amount: Option<Decimal>,
    pub additional_type: Option<AdditionalType>,
    pub recurrent_charge: bool,
    pub note: Option<String>,
}

/// Payment aggregate.
///
/// # Invariants
///
/// - `amount > 0` and has minor-unit precision
/// - without an explicit override `amount == items.total_price()`
/// - `paid_at` is set on the first transition to `Paid` and never again
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub variable_symbol: String,
    pub user_id: UserId,
    pub gateway_code: String,
    pub subscription_type_id: Option<SubscriptionTypeId>,
    pub subscription_id: Option<SubscriptionId>,
    pub amount: Decimal,
    pub additional_amount: Option<Decimal>,
    pub additional_type: Option<AdditionalType>,
    pub status: PaymentStatus,
    pub paid_at: Option<Timestamp>,
    /// Whether this payment was produced by a recurring charge.
    pub recurrent_charge: bool,
    pub items: PaymentItemContainer,
    pub note: Option<String>,
    /// Raw result code of the last gateway operation.
    pub result_code: Option<String>,
    pub result_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Payment {
    /// Creates a new payment in `Form` status.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if the resulting amount is not positive
    /// - `ValidationFailed` if the variable symbol or gateway code is blank
    pub fn create(new: NewPayment, now: Timestamp) -> Result<Self, PaymentError> {
        if new.variable_symbol.trim().is_empty() {
            return Err(PaymentError::validation(
                "variable_symbol",
                "variable symbol cannot be empty",
            ));
        }
        if new.gateway_code.trim().is_empty() {
            return Err(PaymentError::validation(
                "gateway_code",
                "gateway code cannot be empty",
            ));
        }

        let amount = new.amount.unwrap_or_else(|| new.items.total_price());
        money::validate_amount("amount", amount)
            .map_err(|e| PaymentError::invalid_amount(amount, e.to_string()))?;

        Ok(Self {
            id: new.id,
            variable_symbol: new.variable_symbol,
            user_id: new.user_id,
            gateway_code: new.gateway_code,
            subscription_type_id: new.subscription_type_id,
            subscription_id: new.subscription_id,
            amount,
            additional_amount: new.additional_amount,
            additional_type: new.additional_type,
            status: PaymentStatus::Form,
            paid_at: None,
            recurrent_charge: new.recurrent_charge,
            items: new.items,
            note: new.note,
            result_code: None,
            result_message: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_paid(&self) -> bool {
        self.status == PaymentStatus::Paid
    }

    /// Donation repeated on each recurring charge, if any.
    pub fn recurrent_donation(&self) -> Option<Decimal> {
        match self.additional_type {
            Some(AdditionalType::Recurrent) => {
                self.additional_amount.filter(|amount| *amount > Decimal::ZERO)
            }
            _ => None,
        }
    }

    /// Confirms the payment.
    ///
    /// Confirming an already paid payment is a no-op and keeps the original
    /// `paid_at`.
    pub fn mark_paid(&mut self, now: Timestamp) -> Result<(), PaymentError> {
        if self.status == PaymentStatus::Paid {
            return Ok(());
        }
        self.transition_to(PaymentStatus::Paid, now)?;
        if self.paid_at.is_none() {
            self.paid_at = Some(now);
        }
        Ok(())
    }

    /// Marks the payment failed.
    ///
    /// A forbidden transition (e.g. from `Paid`) is logged and ignored; the
    /// original status is retained. Returns whether the status changed.
    pub fn mark_failed(&mut self, now: Timestamp) -> bool {
        if self.status == PaymentStatus::Fail {
            return false;
        }
        match self.transition_to(PaymentStatus::Fail, now) {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    payment_id = %self.id,
                    status = %self.status,
                    "Rejected transition to fail, keeping current status"
                );
                false
            }
        }
    }

    /// Marks the payment as reserved through pre-authorization.
    pub fn mark_authorized(&mut self, now: Timestamp) -> Result<(), PaymentError> {
        self.transition_to(PaymentStatus::Authorized, now)
    }

    /// Marks a settled payment as refunded.
    pub fn mark_refunded(&mut self, now: Timestamp) -> Result<(), PaymentError> {
        self.transition_to(PaymentStatus::Refund, now)
    }

    /// Stores the raw gateway result of the last operation.
    pub fn record_gateway_result(&mut self, code: impl Into<String>, message: Option<String>) {
        self.result_code = Some(code.into());
        self.result_message = message;
    }

    fn transition_to(&mut self, target: PaymentStatus, now: Timestamp) -> Result<(), PaymentError> {
        self.status = self
            .status
            .transition_to(target)
            .map_err(|_| PaymentError::invalid_transition(self.status, target))?;
        self.updated_at = now;
        Ok(())
    }
}

//! Errors of the recurring charge pipeline.
//!
//! Gateway declines are not errors: they travel as `ChargeOutcome`
//! variants. These are the non-business conditions that abort the
//! processing of a single recurrent payment.

use rust_decimal::Decimal;

use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentId, RecurrentPaymentId, SubscriptionTypeId,
};
use crate::domain::payment::PaymentError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeError {
    /// Split items do not add up to the requested amount.
    ArithmeticConsistency { expected: Decimal, actual: Decimal },

    /// A required configuration key is absent.
    ConfigurationMissing(String),

    /// Amount cannot be charged.
    InvalidAmount { amount: Decimal, reason: String },

    RecurrentPaymentNotFound(RecurrentPaymentId),

    PaymentNotFound(PaymentId),

    SubscriptionTypeNotFound(SubscriptionTypeId),

    /// No gateway client is registered for the code.
    GatewayNotRegistered(String),

    /// Operation not allowed in the current state.
    InvalidState(String),

    /// Payment construction or transition failed.
    Payment(PaymentError),

    Infrastructure(String),
}

impl ChargeError {
    pub fn arithmetic_consistency(expected: Decimal, actual: Decimal) -> Self {
        ChargeError::ArithmeticConsistency { expected, actual }
    }

    pub fn configuration_missing(key: impl Into<String>) -> Self {
        ChargeError::ConfigurationMissing(key.into())
    }

    pub fn invalid_amount(amount: Decimal, reason: impl Into<String>) -> Self {
        ChargeError::InvalidAmount {
            amount,
            reason: reason.into(),
        }
    }

    pub fn recurrent_payment_not_found(id: RecurrentPaymentId) -> Self {
        ChargeError::RecurrentPaymentNotFound(id)
    }

    pub fn payment_not_found(id: PaymentId) -> Self {
        ChargeError::PaymentNotFound(id)
    }

    pub fn subscription_type_not_found(id: SubscriptionTypeId) -> Self {
        ChargeError::SubscriptionTypeNotFound(id)
    }

    pub fn gateway_not_registered(code: impl Into<String>) -> Self {
        ChargeError::GatewayNotRegistered(code.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        ChargeError::InvalidState(message.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        ChargeError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ChargeError::ArithmeticConsistency { .. } => ErrorCode::ArithmeticConsistency,
            ChargeError::ConfigurationMissing(_) => ErrorCode::ConfigurationMissing,
            ChargeError::InvalidAmount { .. } => ErrorCode::InvalidAmount,
            ChargeError::RecurrentPaymentNotFound(_) => ErrorCode::RecurrentPaymentNotFound,
            ChargeError::PaymentNotFound(_) => ErrorCode::PaymentNotFound,
            ChargeError::SubscriptionTypeNotFound(_) => ErrorCode::SubscriptionTypeNotFound,
            ChargeError::GatewayNotRegistered(_) => ErrorCode::GatewayNotFound,
            ChargeError::InvalidState(_) => ErrorCode::InvalidStateTransition,
            ChargeError::Payment(err) => err.code(),
            ChargeError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ChargeError::ArithmeticConsistency { expected, actual } => format!(
                "Split items total {} does not match charge amount {}",
                actual, expected
            ),
            ChargeError::ConfigurationMissing(key) => {
                format!("Required configuration '{}' is not set", key)
            }
            ChargeError::InvalidAmount { amount, reason } => {
                format!("Cannot charge {}: {}", amount, reason)
            }
            ChargeError::RecurrentPaymentNotFound(id) => {
                format!("Recurrent payment not found: {}", id)
            }
            ChargeError::PaymentNotFound(id) => format!("Payment not found: {}", id),
            ChargeError::SubscriptionTypeNotFound(id) => {
                format!("Subscription type not found: {}", id)
            }
            ChargeError::GatewayNotRegistered(code) => {
                format!("No gateway registered for code '{}'", code)
            }
            ChargeError::InvalidState(msg) => msg.clone(),
            ChargeError::Payment(err) => err.message(),
            ChargeError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true for failures a later run may not hit again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChargeError::Infrastructure(_))
    }
}

impl std::fmt::Display for ChargeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ChargeError {}

impl From<DomainError> for ChargeError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::InvalidStateTransition => ChargeError::InvalidState(err.message),
            _ => ChargeError::Infrastructure(err.to_string()),
        }
    }
}

impl From<PaymentError> for ChargeError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::InvalidAmount { amount, reason } => {
                ChargeError::InvalidAmount { amount, reason }
            }
            PaymentError::Infrastructure(msg) => ChargeError::Infrastructure(msg),
            other => ChargeError::Payment(other),
        }
    }
}

impl From<ChargeError> for DomainError {
    fn from(err: ChargeError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn arithmetic_consistency_is_not_retryable() {
        let err = ChargeError::arithmetic_consistency(dec!(6.00), dec!(5.99));
        assert_eq!(err.code(), ErrorCode::ArithmeticConsistency);
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("5.99"));
    }

    #[test]
    fn configuration_missing_names_key() {
        let err = ChargeError::configuration_missing("charging.donation_vat_rate");
        assert_eq!(
            err.to_string(),
            "Required configuration 'charging.donation_vat_rate' is not set"
        );
    }

    #[test]
    fn state_transition_domain_error_maps_to_invalid_state() {
        let err: ChargeError =
            DomainError::new(ErrorCode::InvalidStateTransition, "Cannot transition").into();
        assert!(matches!(err, ChargeError::InvalidState(_)));

        let db: ChargeError = DomainError::database("timeout").into();
        assert!(db.is_retryable());
    }

    #[test]
    fn payment_amount_error_keeps_amount() {
        let err: ChargeError = PaymentError::invalid_amount(dec!(0), "must be positive").into();
        assert_eq!(
            err,
            ChargeError::invalid_amount(dec!(0), "must be positive")
        );
    }
}

//! Payment-specific error types.

use rust_decimal::Decimal;

use crate::domain::foundation::{DomainError, ErrorCode, PaymentId};

use super::PaymentStatus;

/// Errors raised by payment operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// Payment was not found.
    NotFound(PaymentId),

    /// Amount is zero, negative or below minor-unit precision.
    InvalidAmount { amount: Decimal, reason: String },

    /// Status change not permitted by the payment state machine.
    InvalidTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// Gateway does not offer the requested capability.
    CapabilityNotSupported { gateway: String, capability: String },

    /// Gateway refused or failed the operation.
    Gateway { code: String, message: String },

    /// Validation failed.
    ValidationFailed { field: String, message: String },

    /// Infrastructure error.
    Infrastructure(String),
}

impl PaymentError {
    pub fn not_found(id: PaymentId) -> Self {
        PaymentError::NotFound(id)
    }

    pub fn invalid_amount(amount: Decimal, reason: impl Into<String>) -> Self {
        PaymentError::InvalidAmount {
            amount,
            reason: reason.into(),
        }
    }

    pub fn invalid_transition(from: PaymentStatus, to: PaymentStatus) -> Self {
        PaymentError::InvalidTransition { from, to }
    }

    pub fn capability_not_supported(
        gateway: impl Into<String>,
        capability: impl Into<String>,
    ) -> Self {
        PaymentError::CapabilityNotSupported {
            gateway: gateway.into(),
            capability: capability.into(),
        }
    }

    pub fn gateway(code: impl Into<String>, message: impl Into<String>) -> Self {
        PaymentError::Gateway {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        PaymentError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        PaymentError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            PaymentError::NotFound(_) => ErrorCode::PaymentNotFound,
            PaymentError::InvalidAmount { .. } => ErrorCode::InvalidAmount,
            PaymentError::InvalidTransition { .. } => ErrorCode::InvalidStateTransition,
            PaymentError::CapabilityNotSupported { .. } => ErrorCode::CapabilityNotSupported,
            PaymentError::Gateway { .. } => ErrorCode::GatewayError,
            PaymentError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            PaymentError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    pub fn message(&self) -> String {
        match self {
            PaymentError::NotFound(id) => format!("Payment not found: {}", id),
            PaymentError::InvalidAmount { amount, reason } => {
                format!("Invalid payment amount {}: {}", amount, reason)
            }
            PaymentError::InvalidTransition { from, to } => {
                format!("Cannot move payment from {} to {}", from, to)
            }
            PaymentError::CapabilityNotSupported {
                gateway,
                capability,
            } => format!("Gateway '{}' does not support {}", gateway, capability),
            PaymentError::Gateway { code, message } => {
                format!("Gateway returned {}: {}", code, message)
            }
            PaymentError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            PaymentError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for PaymentError {}

impl From<DomainError> for PaymentError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => PaymentError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            _ => PaymentError::Infrastructure(err.to_string()),
        }
    }
}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}

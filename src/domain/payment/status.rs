//! Payment status state machine.

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Created, not yet confirmed by a gateway.
    Form,
    Paid,
    Fail,
    /// Gateway never answered within its confirmation window.
    Timeout,
    Refund,
    /// Created by bank statement import.
    Imported,
    Prepaid,
    /// Funds reserved through pre-authorization, not yet captured.
    Authorized,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Form => "form",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Fail => "fail",
            PaymentStatus::Timeout => "timeout",
            PaymentStatus::Refund => "refund",
            PaymentStatus::Imported => "imported",
            PaymentStatus::Prepaid => "prepaid",
            PaymentStatus::Authorized => "authorized",
        }
    }

    /// Returns true for statuses where money reached the merchant.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Paid | PaymentStatus::Prepaid | PaymentStatus::Imported
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "form" => Ok(PaymentStatus::Form),
            "paid" => Ok(PaymentStatus::Paid),
            "fail" => Ok(PaymentStatus::Fail),
            "timeout" => Ok(PaymentStatus::Timeout),
            "refund" => Ok(PaymentStatus::Refund),
            "imported" => Ok(PaymentStatus::Imported),
            "prepaid" => Ok(PaymentStatus::Prepaid),
            "authorized" => Ok(PaymentStatus::Authorized),
            other => Err(ValidationError::invalid_format(
                "payment_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl StateMachine for PaymentStatus {
    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Form => vec![Paid, Fail, Timeout, Authorized, Prepaid, Imported],
            Authorized => vec![Paid, Fail],
            // late gateway confirmation
            Fail | Timeout => vec![Paid],
            Paid | Prepaid | Imported => vec![Refund],
            Refund => vec![],
        }
    }
}

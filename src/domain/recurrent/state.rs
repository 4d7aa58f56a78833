//! Recurrent payment state machine.
//!
//! ```text
//!            ┌──────────► charged
//!            ├──────────► charge_failed
//!   active ──┼──────────► tb_failed
//!     ▲      ├──────────► system_stop ──┐
//!     │      ├──────────► user_stop ────┤──► admin_stop
//!     │      └──────────► admin_stop    │
//!     └─────────────────────────────────┘ (reactivation)
//! ```

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// State of one scheduled recurring charge attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrentPaymentState {
    /// Scheduled, waiting for its charge time.
    Active,
    /// Charged successfully. Terminal.
    Charged,
    /// Declined; a retry row may follow. Terminal for this row.
    ChargeFailed,
    /// Stopped automatically.
    SystemStop,
    /// Stopped by the customer.
    UserStop,
    /// Stopped by an administrator.
    AdminStop,
    /// Hard failure reported by the bank. Terminal.
    ///
    /// Set by bank reconciliation outside the charge run; a permanent
    /// decline seen by the run stops the row as `SystemStop` instead.
    TbFailed,
}

impl RecurrentPaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrentPaymentState::Active => "active",
            RecurrentPaymentState::Charged => "charged",
            RecurrentPaymentState::ChargeFailed => "charge_failed",
            RecurrentPaymentState::SystemStop => "system_stop",
            RecurrentPaymentState::UserStop => "user_stop",
            RecurrentPaymentState::AdminStop => "admin_stop",
            RecurrentPaymentState::TbFailed => "tb_failed",
        }
    }

    pub fn is_stopped(&self) -> bool {
        matches!(
            self,
            RecurrentPaymentState::SystemStop
                | RecurrentPaymentState::UserStop
                | RecurrentPaymentState::AdminStop
        )
    }
}

impl fmt::Display for RecurrentPaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecurrentPaymentState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(RecurrentPaymentState::Active),
            "charged" => Ok(RecurrentPaymentState::Charged),
            "charge_failed" => Ok(RecurrentPaymentState::ChargeFailed),
            "system_stop" => Ok(RecurrentPaymentState::SystemStop),
            "user_stop" => Ok(RecurrentPaymentState::UserStop),
            "admin_stop" => Ok(RecurrentPaymentState::AdminStop),
            "tb_failed" => Ok(RecurrentPaymentState::TbFailed),
            other => Err(ValidationError::invalid_format(
                "recurrent_payment_state",
                format!("unknown state '{}'", other),
            )),
        }
    }
}

impl StateMachine for RecurrentPaymentState {
    fn valid_transitions(&self) -> Vec<Self> {
        use RecurrentPaymentState::*;
        match self {
            Active => vec![Charged, ChargeFailed, SystemStop, UserStop, AdminStop, TbFailed],
            UserStop => vec![Active, AdminStop],
            SystemStop | AdminStop => vec![Active],
            Charged | ChargeFailed | TbFailed => vec![],
        }
    }
}

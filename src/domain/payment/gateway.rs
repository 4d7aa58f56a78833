//! Payment gateway reference data.

use serde::{Deserialize, Serialize};

/// Configured payment gateway.
///
/// The `code` resolves to a concrete gateway client at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentGateway {
    pub code: String,
    pub name: String,
    pub active: bool,
    pub visible: bool,
    /// Whether the gateway issues reusable tokens for recurring charges.
    pub is_recurrent: bool,
    pub sorting: i32,
}

impl PaymentGateway {
    /// Returns true when recurring charges may be sent through this gateway.
    pub fn can_charge_recurrently(&self) -> bool {
        self.active && self.is_recurrent
    }
}

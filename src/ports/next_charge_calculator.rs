//! Next charge date port.

use crate::domain::foundation::Timestamp;
use crate::domain::subscription::SubscriptionType;

/// Computes when the next billing cycle of a subscription type is charged.
pub trait NextChargeCalculator: Send + Sync {
    fn next_charge_at(&self, subscription_type: &SubscriptionType, anchor: Timestamp) -> Timestamp;
}

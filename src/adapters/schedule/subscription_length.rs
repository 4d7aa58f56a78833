//! Next charge date from the subscription length.

use chrono::Duration;

use crate::domain::foundation::Timestamp;
use crate::domain::subscription::SubscriptionType;
use crate::ports::NextChargeCalculator;

/// Charges the next cycle when the current one ends, optionally
/// `lead_time` earlier so the charge settles before access lapses.
#[derive(Debug, Clone, Copy)]
pub struct SubscriptionLengthCalculator {
    lead_time: Duration,
}

impl SubscriptionLengthCalculator {
    pub fn new(lead_time: Duration) -> Self {
        Self { lead_time }
    }
}

impl Default for SubscriptionLengthCalculator {
    fn default() -> Self {
        Self::new(Duration::zero())
    }
}

impl NextChargeCalculator for SubscriptionLengthCalculator {
    fn next_charge_at(&self, subscription_type: &SubscriptionType, anchor: Timestamp) -> Timestamp {
        let end = anchor.add_days(i64::from(subscription_type.length_days));
        let charge_at = end.add_duration(-self.lead_time);
        // Never before the charge that produced it.
        if charge_at.is_before(&anchor) {
            anchor
        } else {
            charge_at
        }
    }
}

//! Resolved charging settings for one batch run.

use chrono::Duration;
use rust_decimal::Decimal;

use crate::domain::foundation::Timestamp;

use super::ChargeError;

/// Delay used when no retry schedule is configured.
const FALLBACK_RETRY_DELAY_HOURS: i64 = 24;

/// Immutable settings snapshot read once at the start of a charge run.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargingSettings {
    /// Retry budget given to each new billing cycle.
    pub default_retries: i32,
    /// Delay before the n-th retry, in hours.
    pub retry_delays_hours: Vec<i64>,
    /// Rows due up to this far in the future are charged now.
    pub due_window: Duration,
    /// Subtracted from the subscription end when scheduling the next cycle.
    pub charge_lead_time: Duration,
    /// VAT rate of donation lines.
    pub donation_vat_rate: Option<Decimal>,
    pub currency: String,
}

impl ChargingSettings {
    /// End of the due window for a run started at `now`.
    pub fn due_window_end(&self, now: Timestamp) -> Timestamp {
        now.add_duration(self.due_window)
    }

    /// Delay before the retry that leaves `remaining` retries.
    ///
    /// The position in the schedule follows the remaining budget measured
    /// against `default_retries`: the first retry of a full-budget cycle uses
    /// the first delay, later retries walk the list and stay on its last
    /// entry. A chain started with a smaller budget (e.g. a reactivation with
    /// `retries = 2`) joins the schedule at its tail, so it gets the longer
    /// delays meant for the last attempts.
    pub fn retry_delay(&self, remaining: i32) -> Duration {
        let attempt = (self.default_retries - remaining - 1).max(0) as usize;
        let hours = self
            .retry_delays_hours
            .get(attempt)
            .or_else(|| self.retry_delays_hours.last())
            .copied()
            .unwrap_or(FALLBACK_RETRY_DELAY_HOURS);
        Duration::hours(hours)
    }

    /// Donation VAT rate; records that need it fail without it.
    pub fn require_donation_vat_rate(&self) -> Result<Decimal, ChargeError> {
        self.donation_vat_rate
            .ok_or_else(|| ChargeError::configuration_missing("charging.donation_vat_rate"))
    }
}

impl Default for ChargingSettings {
    fn default() -> Self {
        Self {
            default_retries: 4,
            retry_delays_hours: vec![2, 24, 48, 72],
            due_window: Duration::minutes(15),
            charge_lead_time: Duration::zero(),
            donation_vat_rate: None,
            currency: "EUR".to_string(),
        }
    }
}

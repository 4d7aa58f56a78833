//! Charging configuration
//!
//! Raw keys as read from the environment. A charge run calls
//! [`ChargingConfig::snapshot`] once and passes the resulting
//! [`ChargingSettings`] down; nothing reads configuration mid-run.

use chrono::Duration;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::charging::ChargingSettings;

use super::error::ValidationError;

/// Upper bound of the retry budget.
const MAX_RETRIES: i32 = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct ChargingConfig {
    /// Retry budget of each new billing cycle
    #[serde(default = "default_retries")]
    pub default_retries: i32,

    /// Delay before the n-th retry, in hours
    #[serde(default = "default_retry_delays_hours")]
    pub retry_delays_hours: Vec<i64>,

    /// Rows due within this many minutes are charged by the current run
    #[serde(default = "default_due_window_minutes")]
    pub due_window_minutes: i64,

    /// Hours subtracted from the subscription end when scheduling the next cycle
    #[serde(default)]
    pub charge_lead_time_hours: i64,

    /// VAT rate of donation lines, in percent
    #[serde(default)]
    pub donation_vat_rate: Option<Decimal>,

    #[serde(default = "default_currency")]
    pub currency: String,

    /// Lets gateways run on the always-approving mock driver (dry runs only)
    #[serde(default)]
    pub allow_mock_gateways: bool,
}

impl ChargingConfig {
    /// Resolves the raw keys into the settings of one run.
    pub fn snapshot(&self) -> ChargingSettings {
        ChargingSettings {
            default_retries: self.default_retries,
            retry_delays_hours: self.retry_delays_hours.clone(),
            due_window: Duration::minutes(self.due_window_minutes),
            charge_lead_time: Duration::hours(self.charge_lead_time_hours),
            donation_vat_rate: self.donation_vat_rate,
            currency: self.currency.to_uppercase(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0..=MAX_RETRIES).contains(&self.default_retries) {
            return Err(ValidationError::InvalidRetries {
                value: self.default_retries,
                max: MAX_RETRIES,
            });
        }
        if self.retry_delays_hours.iter().any(|hours| *hours <= 0) {
            return Err(ValidationError::InvalidRetryDelay);
        }
        if self.due_window_minutes < 0 {
            return Err(ValidationError::InvalidDueWindow);
        }
        if self.charge_lead_time_hours < 0 {
            return Err(ValidationError::InvalidLeadTime);
        }
        if let Some(rate) = self.donation_vat_rate {
            if rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
                return Err(ValidationError::InvalidVatRate(rate.to_string()));
            }
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidCurrency(self.currency.clone()));
        }
        Ok(())
    }
}

impl Default for ChargingConfig {
    fn default() -> Self {
        Self {
            default_retries: default_retries(),
            retry_delays_hours: default_retry_delays_hours(),
            due_window_minutes: default_due_window_minutes(),
            charge_lead_time_hours: 0,
            donation_vat_rate: None,
            currency: default_currency(),
            allow_mock_gateways: false,
        }
    }
}

fn default_retries() -> i32 {
    4
}

fn default_retry_delays_hours() -> Vec<i64> {
    vec![2, 24, 48, 72]
}

fn default_due_window_minutes() -> i64 {
    15
}

fn default_currency() -> String {
    "EUR".to_string()
}

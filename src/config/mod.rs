//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables with the
//! `config` and `dotenvy` crates. Variables use the `CRM_PAYMENTS` prefix
//! and `__` between nested keys.
//!
//! # Example
//!
//! ```no_run
//! use crm_payments::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! let settings = config.charging.snapshot();
//! println!("Retry budget per cycle: {}", settings.default_retries);
//! ```

mod charging;
mod database;
mod error;
mod gateways;
mod logging;

pub use charging::ChargingConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use gateways::{GatewayConfig, GatewayDriver, GatewaysConfig};
pub use logging::{LogFormat, LoggingConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,

    #[serde(default)]
    pub charging: ChargingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub gateways: GatewaysConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `CRM_PAYMENTS` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Splits `CHARGING__RETRY_DELAYS_HOURS` on commas
    ///
    /// # Environment Variable Format
    ///
    /// - `CRM_PAYMENTS__DATABASE__URL=...` -> `database.url = ...`
    /// - `CRM_PAYMENTS__CHARGING__RETRY_DELAYS_HOURS=2,24,48` -> `charging.retry_delays_hours = [2, 24, 48]`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CRM_PAYMENTS")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("charging.retry_delays_hours")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid value.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        self.charging.validate()?;
        self.gateways.validate(self.charging.allow_mock_gateways)?;
        Ok(())
    }
}

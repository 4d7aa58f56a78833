//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Default retries must be between 0 and {max}, got {value}")]
    InvalidRetries { value: i32, max: i32 },

    #[error("Retry delays must be positive hours")]
    InvalidRetryDelay,

    #[error("Due window must not be negative")]
    InvalidDueWindow,

    #[error("Charge lead time must not be negative")]
    InvalidLeadTime,

    #[error("Donation VAT rate must be between 0 and 100, got {0}")]
    InvalidVatRate(String),

    #[error("Currency must be a three-letter ISO code, got '{0}'")]
    InvalidCurrency(String),

    #[error("Gateway code cannot be empty")]
    EmptyGatewayCode,

    #[error("Gateway '{0}' has an empty secret")]
    EmptyGatewaySecret(String),

    #[error("Gateway '{0}' uses the mock driver but charging.allow_mock_gateways is off")]
    MockGatewayNotAllowed(String),
}

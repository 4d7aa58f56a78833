//! Gateway configuration
//!
//! One entry per gateway code:
//!
//! ```text
//! CRM_PAYMENTS__GATEWAYS__COMFORTPAY__DRIVER=mock
//! CRM_PAYMENTS__GATEWAYS__COMFORTPAY__SECRET=...
//! ```
//!
//! The mock driver approves every charge without moving money, so it is
//! rejected unless `CRM_PAYMENTS__CHARGING__ALLOW_MOCK_GATEWAYS=true`.

use std::collections::HashMap;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Client implementation backing a gateway code
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayDriver {
    /// In-process gateway that approves every charge
    #[default]
    Mock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub driver: GatewayDriver,

    /// Merchant credential sent to the provider
    pub secret: SecretString,
}

/// Gateways keyed by code
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct GatewaysConfig(pub HashMap<String, GatewayConfig>);

impl GatewaysConfig {
    /// Entries sorted by code.
    pub fn entries(&self) -> Vec<(&str, &GatewayConfig)> {
        let mut entries: Vec<_> = self.0.iter().map(|(code, c)| (code.as_str(), c)).collect();
        entries.sort_by_key(|(code, _)| *code);
        entries
    }

    pub fn validate(&self, allow_mock: bool) -> Result<(), ValidationError> {
        for (code, gateway) in self.entries() {
            if code.trim().is_empty() {
                return Err(ValidationError::EmptyGatewayCode);
            }
            if gateway.secret.expose_secret().trim().is_empty() {
                return Err(ValidationError::EmptyGatewaySecret(code.to_string()));
            }
            if gateway.driver == GatewayDriver::Mock && !allow_mock {
                return Err(ValidationError::MockGatewayNotAllowed(code.to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(secret: &str) -> GatewayConfig {
        GatewayConfig {
            driver: GatewayDriver::Mock,
            secret: SecretString::new(secret.to_string()),
        }
    }

    #[test]
    fn entries_are_sorted() {
        let config = GatewaysConfig(HashMap::from([
            ("tatrapay".to_string(), gateway("b")),
            ("comfortpay".to_string(), gateway("a")),
        ]));

        let codes: Vec<&str> = config.entries().into_iter().map(|(code, _)| code).collect();

        assert_eq!(codes, vec!["comfortpay", "tatrapay"]);
    }

    #[test]
    fn empty_secret_is_rejected() {
        let config = GatewaysConfig(HashMap::from([("comfortpay".to_string(), gateway("  "))]));
        assert_eq!(
            config.validate(true),
            Err(ValidationError::EmptyGatewaySecret("comfortpay".to_string()))
        );
    }

    #[test]
    fn empty_code_is_rejected() {
        let config = GatewaysConfig(HashMap::from([(String::new(), gateway("s3cret"))]));
        assert_eq!(config.validate(true), Err(ValidationError::EmptyGatewayCode));
    }

    #[test]
    fn mock_driver_is_refused_unless_allowed() {
        let config = GatewaysConfig(HashMap::from([("comfortpay".to_string(), gateway("s3cret"))]));

        assert_eq!(
            config.validate(false),
            Err(ValidationError::MockGatewayNotAllowed("comfortpay".to_string()))
        );
        assert_eq!(config.validate(true), Ok(()));
    }

    #[test]
    fn no_gateways_needs_no_permission() {
        assert_eq!(GatewaysConfig::default().validate(false), Ok(()));
    }

    #[test]
    fn secret_is_redacted_in_debug_output() {
        let rendered = format!("{:?}", gateway("s3cret"));
        assert!(!rendered.contains("s3cret"));
    }
}

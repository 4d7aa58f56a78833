//! Gateway client port for payment provider integrations.
//!
//! Every provider (card-on-file, bank wallet, ...) implements `charge`;
//! further capabilities are optional and discovered through the accessor
//! methods, which return `None` unless the provider overrides them.
//!
//! # Result discipline
//!
//! `charge` never returns an error. Declines and transport failures are
//! `ChargeOutcome` variants carrying the raw gateway result code and
//! message, so the caller can apply the retry policy without inspecting
//! provider-specific exceptions.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;

use crate::domain::foundation::{PaymentToken, Timestamp};
use crate::domain::payment::Payment;

/// Port for a concrete payment gateway.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Gateway code this client serves (matches `PaymentGateway::code`).
    fn code(&self) -> &str;

    /// Charges `payment.amount` against the stored token.
    async fn charge(&self, payment: &Payment, token: &PaymentToken) -> ChargeOutcome;

    /// Token validity checks, if supported.
    fn token_validation(&self) -> Option<&dyn TokenValidation> {
        None
    }

    /// Token expiration lookups, if supported.
    fn token_expiration(&self) -> Option<&dyn TokenExpiration> {
        None
    }

    /// Pre-authorization flows, if supported.
    fn pre_authorization(&self) -> Option<&dyn PreAuthorization> {
        None
    }

    /// Refunds, if supported.
    fn refunds(&self) -> Option<&dyn Refunds> {
        None
    }
}

/// Checks whether a stored token can still be charged.
#[async_trait]
pub trait TokenValidation: Send + Sync {
    async fn check_token_valid(&self, token: &PaymentToken) -> Result<bool, GatewayError>;
}

/// Reads expiration dates of stored tokens.
#[async_trait]
pub trait TokenExpiration: Send + Sync {
    /// Returns the expiration of each known token; unknown tokens are omitted.
    async fn check_expiration(
        &self,
        tokens: &[PaymentToken],
    ) -> Result<HashMap<PaymentToken, Timestamp>, GatewayError>;
}

/// Reserve-then-capture flows.
#[async_trait]
pub trait PreAuthorization: Send + Sync {
    async fn authorize(
        &self,
        payment: &Payment,
        token: &PaymentToken,
    ) -> Result<GatewayResponse, GatewayError>;

    async fn cancel_authorization(&self, payment: &Payment) -> Result<GatewayResponse, GatewayError>;
}

/// Returns money of a settled payment.
#[async_trait]
pub trait Refunds: Send + Sync {
    async fn refund(&self, payment: &Payment, amount: Decimal) -> RefundOutcome;
}

/// Raw diagnostic data of the last gateway operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse {
    /// Provider result code (e.g. "00", "51", "PENDING").
    pub code: String,
    pub message: String,
    /// Full provider response, stored in the audit log.
    #[serde(default)]
    pub payload: JsonValue,
}

impl GatewayResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            payload: JsonValue::Null,
        }
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload = payload;
        self
    }
}

/// Result of a recurring token charge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "response", rename_all = "snake_case")]
pub enum ChargeOutcome {
    /// Charged synchronously.
    Ok(GatewayResponse),
    /// Accepted; confirmation arrives asynchronously.
    Pending(GatewayResponse),
    /// Declined, may succeed on a later attempt.
    TransientFailure(GatewayResponse),
    /// Declined, retrying cannot help.
    PermanentFailure(GatewayResponse),
    /// Network failure or malformed gateway answer.
    TransportError(GatewayResponse),
}

impl ChargeOutcome {
    pub fn response(&self) -> &GatewayResponse {
        match self {
            ChargeOutcome::Ok(r)
            | ChargeOutcome::Pending(r)
            | ChargeOutcome::TransientFailure(r)
            | ChargeOutcome::PermanentFailure(r)
            | ChargeOutcome::TransportError(r) => r,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChargeOutcome::Ok(_) => "ok",
            ChargeOutcome::Pending(_) => "pending",
            ChargeOutcome::TransientFailure(_) => "transient_failure",
            ChargeOutcome::PermanentFailure(_) => "permanent_failure",
            ChargeOutcome::TransportError(_) => "transport_error",
        }
    }

    /// True only for a synchronous successful charge.
    pub fn is_success(&self) -> bool {
        matches!(self, ChargeOutcome::Ok(_))
    }
}

impl fmt::Display for ChargeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind(), self.response().code)
    }
}

/// Result of a refund request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RefundOutcome {
    Success(GatewayResponse),
    Failure(GatewayResponse),
}

/// Category of a failed capability call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorKind {
    /// Gateway answered and refused.
    Declined,
    /// Gateway could not be reached or answered garbage.
    Transport,
}

/// Error of an optional gateway capability call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub code: Option<String>,
    pub message: String,
}

impl GatewayError {
    pub fn declined(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: GatewayErrorKind::Declined,
            code: Some(code.into()),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: GatewayErrorKind::Transport,
            code: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{:?} [{}]: {}", self.kind, code, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for GatewayError {}

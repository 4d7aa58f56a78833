//! Mock gateway client for testing and local dry runs.
//!
//! Supports:
//! - Queued charge outcomes (then a default outcome)
//! - Optional capabilities switched on per instance
//! - Error injection per capability method
//! - Call tracking

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::foundation::{PaymentToken, Timestamp};
use crate::domain::payment::Payment;
use crate::ports::{
    ChargeOutcome, GatewayClient, GatewayError, GatewayResponse, PreAuthorization, RefundOutcome,
    Refunds, TokenExpiration, TokenValidation,
};

/// Recorded gateway call for assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayCall {
    pub method: String,
    pub args: Vec<String>,
}

/// Mock gateway client.
///
/// # Example
///
/// ```ignore
/// let gateway = MockGatewayClient::new("comfortpay").with_token_validation();
/// gateway.queue_outcome(ChargeOutcome::TransientFailure(GatewayResponse::new("51", "funds")));
/// ```
///
/// # Panics
///
/// Methods panic if the internal lock is poisoned; the mock is not meant
/// for production traffic.
pub struct MockGatewayClient {
    code: String,
    capabilities: Capabilities,
    inner: Arc<Mutex<MockState>>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Capabilities {
    token_validation: bool,
    token_expiration: bool,
    pre_authorization: bool,
    refunds: bool,
}

struct MockState {
    queued_outcomes: VecDeque<ChargeOutcome>,
    default_outcome: ChargeOutcome,
    /// Tokens reported invalid; every other token is valid.
    invalid_tokens: Vec<PaymentToken>,
    expirations: HashMap<PaymentToken, Timestamp>,
    refund_outcome: RefundOutcome,
    method_errors: HashMap<String, GatewayError>,
    call_log: Vec<GatewayCall>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            queued_outcomes: VecDeque::new(),
            default_outcome: ChargeOutcome::Ok(GatewayResponse::new("00", "Approved")),
            invalid_tokens: Vec::new(),
            expirations: HashMap::new(),
            refund_outcome: RefundOutcome::Success(GatewayResponse::new("00", "Refunded")),
            method_errors: HashMap::new(),
            call_log: Vec::new(),
        }
    }
}

impl MockGatewayClient {
    /// Charge-only gateway approving every charge.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            capabilities: Capabilities::default(),
            inner: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Gateway offering every optional capability.
    pub fn full(code: impl Into<String>) -> Self {
        Self::new(code)
            .with_token_validation()
            .with_token_expiration()
            .with_pre_authorization()
            .with_refunds()
    }

    pub fn with_token_validation(mut self) -> Self {
        self.capabilities.token_validation = true;
        self
    }

    pub fn with_token_expiration(mut self) -> Self {
        self.capabilities.token_expiration = true;
        self
    }

    pub fn with_pre_authorization(mut self) -> Self {
        self.capabilities.pre_authorization = true;
        self
    }

    pub fn with_refunds(mut self) -> Self {
        self.capabilities.refunds = true;
        self
    }

    // === Configuration ===

    /// Queue the outcome of the next `charge` call.
    pub fn queue_outcome(&self, outcome: ChargeOutcome) {
        self.state().queued_outcomes.push_back(outcome);
    }

    /// Outcome returned once the queue is empty.
    pub fn set_default_outcome(&self, outcome: ChargeOutcome) {
        self.state().default_outcome = outcome;
    }

    pub fn set_token_invalid(&self, token: PaymentToken) {
        self.state().invalid_tokens.push(token);
    }

    pub fn set_expiration(&self, token: PaymentToken, expires_at: Timestamp) {
        self.state().expirations.insert(token, expires_at);
    }

    pub fn set_refund_outcome(&self, outcome: RefundOutcome) {
        self.state().refund_outcome = outcome;
    }

    /// Fail every call of a capability method.
    pub fn set_method_error(&self, method: &str, error: GatewayError) {
        self.state().method_errors.insert(method.to_string(), error);
    }

    // === Assertions ===

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.state().call_log.clone()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.state().call_log.iter().any(|c| c.method == method)
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    // === Internal ===

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.inner.lock().expect("MockGatewayClient: state lock poisoned")
    }

    fn record_call(&self, method: &str, args: Vec<String>) {
        self.state().call_log.push(GatewayCall {
            method: method.to_string(),
            args,
        });
    }

    fn check_error(&self, method: &str) -> Result<(), GatewayError> {
        match self.state().method_errors.get(method) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl GatewayClient for MockGatewayClient {
    fn code(&self) -> &str {
        &self.code
    }

    async fn charge(&self, payment: &Payment, token: &PaymentToken) -> ChargeOutcome {
        self.record_call(
            "charge",
            vec![
                payment.id.to_string(),
                token.to_string(),
                payment.amount.to_string(),
            ],
        );
        let mut state = self.state();
        match state.queued_outcomes.pop_front() {
            Some(outcome) => outcome,
            None => state.default_outcome.clone(),
        }
    }

    fn token_validation(&self) -> Option<&dyn TokenValidation> {
        self.capabilities
            .token_validation
            .then_some(self as &dyn TokenValidation)
    }

    fn token_expiration(&self) -> Option<&dyn TokenExpiration> {
        self.capabilities
            .token_expiration
            .then_some(self as &dyn TokenExpiration)
    }

    fn pre_authorization(&self) -> Option<&dyn PreAuthorization> {
        self.capabilities
            .pre_authorization
            .then_some(self as &dyn PreAuthorization)
    }

    fn refunds(&self) -> Option<&dyn Refunds> {
        self.capabilities.refunds.then_some(self as &dyn Refunds)
    }
}

#[async_trait]
impl TokenValidation for MockGatewayClient {
    async fn check_token_valid(&self, token: &PaymentToken) -> Result<bool, GatewayError> {
        self.record_call("check_token_valid", vec![token.to_string()]);
        self.check_error("check_token_valid")?;
        Ok(!self.state().invalid_tokens.contains(token))
    }
}

#[async_trait]
impl TokenExpiration for MockGatewayClient {
    async fn check_expiration(
        &self,
        tokens: &[PaymentToken],
    ) -> Result<HashMap<PaymentToken, Timestamp>, GatewayError> {
        self.record_call(
            "check_expiration",
            tokens.iter().map(ToString::to_string).collect(),
        );
        self.check_error("check_expiration")?;
        let state = self.state();
        Ok(tokens
            .iter()
            .filter_map(|t| state.expirations.get(t).map(|e| (t.clone(), *e)))
            .collect())
    }
}

#[async_trait]
impl PreAuthorization for MockGatewayClient {
    async fn authorize(
        &self,
        payment: &Payment,
        token: &PaymentToken,
    ) -> Result<GatewayResponse, GatewayError> {
        self.record_call("authorize", vec![payment.id.to_string(), token.to_string()]);
        self.check_error("authorize")?;
        Ok(GatewayResponse::new("00", "Authorized"))
    }

    async fn cancel_authorization(&self, payment: &Payment) -> Result<GatewayResponse, GatewayError> {
        self.record_call("cancel_authorization", vec![payment.id.to_string()]);
        self.check_error("cancel_authorization")?;
        Ok(GatewayResponse::new("00", "Authorization cancelled"))
    }
}

#[async_trait]
impl Refunds for MockGatewayClient {
    async fn refund(&self, payment: &Payment, amount: Decimal) -> RefundOutcome {
        self.record_call("refund", vec![payment.id.to_string(), amount.to_string()]);
        self.state().refund_outcome.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{PaymentId, UserId};
    use crate::domain::payment::{generate_variable_symbol, NewPayment, PaymentItemContainer};
    use rust_decimal_macros::dec;

    fn payment() -> Payment {
        Payment::create(
            NewPayment {
                id: PaymentId::new(),
                variable_symbol: generate_variable_symbol(),
                user_id: UserId::new("user-1").unwrap(),
                gateway_code: "mock".to_string(),
                subscription_type_id: None,
                subscription_id: None,
                items: PaymentItemContainer::new(),
                amount: Some(dec!(5.00)),
                additional_amount: None,
                additional_type: None,
                recurrent_charge: true,
                note: None,
            },
            Timestamp::now(),
        )
        .unwrap()
    }

    fn token() -> PaymentToken {
        PaymentToken::new("cid-1").unwrap()
    }

    #[tokio::test]
    async fn charge_returns_queued_outcomes_then_default() {
        let gateway = MockGatewayClient::new("mock");
        gateway.queue_outcome(ChargeOutcome::Pending(GatewayResponse::new("P", "pending")));

        let first = gateway.charge(&payment(), &token()).await;
        let second = gateway.charge(&payment(), &token()).await;

        assert_eq!(first.kind(), "pending");
        assert!(second.is_success());
        assert_eq!(gateway.call_count("charge"), 2);
    }

    #[tokio::test]
    async fn capabilities_are_off_by_default() {
        let gateway = MockGatewayClient::new("mock");
        assert!(gateway.token_validation().is_none());
        assert!(gateway.refunds().is_none());

        let full = MockGatewayClient::full("mock");
        assert!(full.token_validation().is_some());
        assert!(full.token_expiration().is_some());
        assert!(full.pre_authorization().is_some());
        assert!(full.refunds().is_some());
    }

    #[tokio::test]
    async fn token_validation_reports_configured_invalid_tokens() {
        let gateway = MockGatewayClient::new("mock").with_token_validation();
        gateway.set_token_invalid(token());

        let validation = gateway.token_validation().unwrap();

        assert!(!validation.check_token_valid(&token()).await.unwrap());
        assert!(validation
            .check_token_valid(&PaymentToken::new("cid-2").unwrap())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn check_expiration_omits_unknown_tokens() {
        let gateway = MockGatewayClient::new("mock").with_token_expiration();
        let expires = Timestamp::now().add_days(400);
        gateway.set_expiration(token(), expires);

        let result = gateway
            .check_expiration(&[token(), PaymentToken::new("cid-unknown").unwrap()])
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.get(&token()), Some(&expires));
    }

    #[tokio::test]
    async fn method_error_is_returned() {
        let gateway = MockGatewayClient::full("mock");
        gateway.set_method_error("authorize", GatewayError::transport("timeout"));

        let result = gateway.authorize(&payment(), &token()).await;

        assert_eq!(result, Err(GatewayError::transport("timeout")));
        assert!(gateway.was_called("authorize"));
        assert!(gateway.cancel_authorization(&payment()).await.is_ok());
    }
}

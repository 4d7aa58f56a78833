//! RefundPaymentHandler - refunds a settled payment through its gateway.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::foundation::{EventId, PaymentId, PaymentLogId, SerializableDomainEvent, Timestamp};
use crate::domain::payment::{Payment, PaymentError, PaymentRefunded, PaymentStatus};
use crate::ports::{
    EventPublisher, GatewayRegistry, PaymentLogEntry, PaymentLogRepository, PaymentRepository,
    RefundOutcome,
};

/// Source tag of refund entries in the payment log.
pub const REFUND_LOG_SOURCE: &str = "payment_refund";

/// Command to refund a payment.
#[derive(Debug, Clone)]
pub struct RefundPaymentCommand {
    pub payment_id: PaymentId,
    /// Partial amount; the full payment amount when absent.
    pub amount: Option<Decimal>,
    pub now: Timestamp,
}

#[derive(Debug, Clone)]
pub struct RefundPaymentResult {
    pub payment: Payment,
    pub refunded_amount: Decimal,
}

/// Handler for payment refunds.
pub struct RefundPaymentHandler {
    payments: Arc<dyn PaymentRepository>,
    gateways: Arc<dyn GatewayRegistry>,
    payment_log: Arc<dyn PaymentLogRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl RefundPaymentHandler {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        gateways: Arc<dyn GatewayRegistry>,
        payment_log: Arc<dyn PaymentLogRepository>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            payments,
            gateways,
            payment_log,
            event_publisher,
        }
    }

    pub async fn handle(&self, cmd: RefundPaymentCommand) -> Result<RefundPaymentResult, PaymentError> {
        // 1. Load and validate
        let mut payment = self
            .payments
            .find_by_id(&cmd.payment_id)
            .await?
            .ok_or(PaymentError::NotFound(cmd.payment_id))?;

        if payment.status != PaymentStatus::Paid {
            return Err(PaymentError::invalid_transition(payment.status, PaymentStatus::Refund));
        }

        let amount = cmd.amount.unwrap_or(payment.amount);
        if amount <= Decimal::ZERO {
            return Err(PaymentError::invalid_amount(amount, "refund amount must be positive"));
        }
        if amount > payment.amount {
            return Err(PaymentError::invalid_amount(
                amount,
                format!("refund exceeds payment amount {}", payment.amount),
            ));
        }

        // 2. Resolve refund capability
        let gateway = self
            .gateways
            .get(&payment.gateway_code)
            .ok_or_else(|| PaymentError::capability_not_supported(&payment.gateway_code, "refund"))?;
        let refunds = gateway
            .refunds()
            .ok_or_else(|| PaymentError::capability_not_supported(&payment.gateway_code, "refund"))?;

        // 3. Refund
        let outcome = refunds.refund(&payment, amount).await;
        self.audit(&payment, &outcome, cmd.now).await;

        match outcome {
            RefundOutcome::Failure(response) => {
                payment.record_gateway_result(&response.code, Some(response.message.clone()));
                self.payments.update(&payment).await?;
                tracing::warn!(
                    payment_id = %payment.id,
                    gateway = %payment.gateway_code,
                    result_code = %response.code,
                    "Refund declined by gateway"
                );
                Err(PaymentError::gateway(response.code, response.message))
            }
            RefundOutcome::Success(response) => {
                // 4. Persist
                payment.record_gateway_result(response.code, Some(response.message));
                payment.mark_refunded(cmd.now)?;
                self.payments.update(&payment).await?;

                tracing::info!(
                    payment_id = %payment.id,
                    gateway = %payment.gateway_code,
                    amount = %amount,
                    "Payment refunded"
                );

                // 5. Publish
                let event = PaymentRefunded {
                    event_id: EventId::new(),
                    payment_id: payment.id,
                    user_id: payment.user_id.clone(),
                    gateway_code: payment.gateway_code.clone(),
                    amount,
                    occurred_at: cmd.now,
                };
                if let Err(err) = self.event_publisher.publish(event.to_envelope()).await {
                    tracing::warn!(error = %err, "Failed to publish refund event");
                }

                Ok(RefundPaymentResult {
                    payment,
                    refunded_amount: amount,
                })
            }
        }
    }

    async fn audit(&self, payment: &Payment, outcome: &RefundOutcome, now: Timestamp) {
        let entry = PaymentLogEntry {
            id: PaymentLogId::new(),
            payment_id: payment.id,
            recurrent_payment_id: None,
            success: matches!(outcome, RefundOutcome::Success(_)),
            source: REFUND_LOG_SOURCE.to_string(),
            payload: serde_json::to_value(outcome).unwrap_or_default(),
            created_at: now,
        };
        if let Err(err) = self.payment_log.append(&entry).await {
            tracing::error!(payment_id = %payment.id, error = %err, "Failed to write payment log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::gateways::{MockGatewayClient, StaticGatewayRegistry};
    use crate::adapters::memory::{InMemoryPaymentLog, InMemoryPaymentStore};
    use crate::domain::foundation::{ErrorCode, UserId};
    use crate::domain::payment::{generate_variable_symbol, NewPayment, PaymentItemContainer};
    use crate::ports::GatewayResponse;
    use rust_decimal_macros::dec;

    struct Setup {
        store: InMemoryPaymentStore,
        log: InMemoryPaymentLog,
        bus: Arc<InMemoryEventBus>,
        gateway: Arc<MockGatewayClient>,
        handler: RefundPaymentHandler,
    }

    fn setup(gateway: MockGatewayClient) -> Setup {
        let store = InMemoryPaymentStore::new();
        let log = InMemoryPaymentLog::new();
        let bus = Arc::new(InMemoryEventBus::new());
        let gateway = Arc::new(gateway);
        let handler = RefundPaymentHandler::new(
            Arc::new(store.clone()),
            Arc::new(StaticGatewayRegistry::new().with(gateway.clone())),
            Arc::new(log.clone()),
            bus.clone(),
        );
        Setup {
            store,
            log,
            bus,
            gateway,
            handler,
        }
    }

    async fn stored_payment(store: &InMemoryPaymentStore, paid: bool) -> Payment {
        let mut payment = Payment::create(
            NewPayment {
                id: PaymentId::new(),
                variable_symbol: generate_variable_symbol(),
                user_id: UserId::new("user-1").unwrap(),
                gateway_code: "comfortpay".to_string(),
                subscription_type_id: None,
                subscription_id: None,
                items: PaymentItemContainer::new(),
                amount: Some(dec!(10.00)),
                additional_amount: None,
                additional_type: None,
                recurrent_charge: false,
                note: None,
            },
            Timestamp::now(),
        )
        .unwrap();
        if paid {
            payment.mark_paid(Timestamp::now()).unwrap();
        }
        PaymentRepository::save(store, &payment).await.unwrap();
        payment
    }

    fn command(payment_id: PaymentId, amount: Option<Decimal>) -> RefundPaymentCommand {
        RefundPaymentCommand {
            payment_id,
            amount,
            now: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn full_refund_marks_payment_refunded() {
        let s = setup(MockGatewayClient::new("comfortpay").with_refunds());
        let payment = stored_payment(&s.store, true).await;

        let result = s.handler.handle(command(payment.id, None)).await.unwrap();

        assert_eq!(result.refunded_amount, dec!(10.00));
        let stored = PaymentRepository::find_by_id(&s.store, &payment.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Refund);
        let events: Vec<PaymentRefunded> = s.bus.payloads_of("payment.refunded.v1");
        assert_eq!(events[0].amount, dec!(10.00));
        assert_eq!(s.log.entries()[0].source, REFUND_LOG_SOURCE);
        assert!(s.log.entries()[0].success);
    }

    #[tokio::test]
    async fn declined_refund_keeps_payment_paid() {
        let s = setup(MockGatewayClient::new("comfortpay").with_refunds());
        s.gateway
            .set_refund_outcome(RefundOutcome::Failure(GatewayResponse::new("R5", "Too late")));
        let payment = stored_payment(&s.store, true).await;

        let err = s.handler.handle(command(payment.id, Some(dec!(4.00)))).await.unwrap_err();

        assert_eq!(err, PaymentError::gateway("R5", "Too late"));
        let stored = PaymentRepository::find_by_id(&s.store, &payment.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Paid);
        assert_eq!(stored.result_code.as_deref(), Some("R5"));
        assert!(!s.log.entries()[0].success);
        assert_eq!(s.bus.event_count(), 0);
    }

    #[tokio::test]
    async fn unpaid_payment_cannot_be_refunded() {
        let s = setup(MockGatewayClient::new("comfortpay").with_refunds());
        let payment = stored_payment(&s.store, false).await;

        let err = s.handler.handle(command(payment.id, None)).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::InvalidStateTransition);
        assert!(!s.gateway.was_called("refund"));
    }

    #[tokio::test]
    async fn amount_above_payment_is_rejected() {
        let s = setup(MockGatewayClient::new("comfortpay").with_refunds());
        let payment = stored_payment(&s.store, true).await;

        let err = s.handler.handle(command(payment.id, Some(dec!(10.01)))).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::InvalidAmount);
    }

    #[tokio::test]
    async fn gateway_without_refunds_is_rejected() {
        let s = setup(MockGatewayClient::new("comfortpay"));
        let payment = stored_payment(&s.store, true).await;

        let err = s.handler.handle(command(payment.id, None)).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::CapabilityNotSupported);
    }

    #[tokio::test]
    async fn missing_payment_is_not_found() {
        let s = setup(MockGatewayClient::new("comfortpay").with_refunds());
        let id = PaymentId::new();

        let err = s.handler.handle(command(id, None)).await.unwrap_err();

        assert_eq!(err, PaymentError::NotFound(id));
    }
}

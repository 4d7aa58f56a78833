//! ChargeRecurrentPaymentsHandler - the scheduled recurring charge run.
//!
//! Selects due records, then for each one, in order:
//! 1. stops it if its token was already charged today or for the same `charge_at`
//! 2. resolves the billed subscription type and amount
//! 3. reuses the linked payment or builds and links a new one
//! 4. skips it if that payment is already paid
//! 5. stops it if the gateway reports the token invalid
//! 6. charges the token, audits the response and applies the outcome
//!
//! A failing record is logged and counted; the run continues.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value as JsonValue};

use crate::domain::charging::{ChargeError, ChargingSettings};
use crate::domain::foundation::{PaymentLogId, Timestamp};
use crate::domain::payment::Payment;
use crate::domain::recurrent::RecurrentPayment;
use crate::ports::{
    EventPublisher, GatewayClient, GatewayRegistry, NextChargeCalculator,
    PaymentLogEntry, PaymentLogRepository, PaymentRepository, RecurrentPaymentRepository,
    RecurrentTransition, SubscriptionTypeReader, RECURRENT_CHARGE_LOG_SOURCE,
};

use super::process_charge_outcome::stopped_event;
use super::{
    ChargeDisposition, ChargePaymentBuilder, ProcessChargeOutcomeCommand,
    RecurrentPaymentsProcessor, RecurrentPaymentsResolver,
};

/// Result code stored when the gateway rejects the token before charging.
pub const INVALID_TOKEN_RESULT_CODE: &str = "invalid_token";

/// Command to run one charge batch.
#[derive(Debug, Clone)]
pub struct ChargeRecurrentPaymentsCommand {
    pub now: Timestamp,
    /// Snapshot resolved once for the whole run.
    pub settings: ChargingSettings,
}

/// Counters of one charge run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChargeRunSummary {
    pub selected: usize,
    pub charged: usize,
    pub pending: usize,
    /// Declined with a retry scheduled.
    pub failed: usize,
    pub stopped: usize,
    pub skipped: usize,
    /// Records aborted by an error.
    pub errors: usize,
}

impl ChargeRunSummary {
    fn record(&mut self, disposition: ChargeDisposition) {
        match disposition {
            ChargeDisposition::Charged => self.charged += 1,
            ChargeDisposition::Pending => self.pending += 1,
            ChargeDisposition::RetryScheduled => self.failed += 1,
            ChargeDisposition::Stopped => self.stopped += 1,
            ChargeDisposition::Skipped => self.skipped += 1,
        }
    }

    /// Every selected record is accounted for exactly once.
    pub fn processed(&self) -> usize {
        self.charged + self.pending + self.failed + self.stopped + self.skipped + self.errors
    }
}

/// Handler for the scheduled charge run.
///
/// Assumes at most one run at a time; the fast-charge guard narrows the
/// double-charge window but does not replace an external run lock.
pub struct ChargeRecurrentPaymentsHandler {
    recurrent_payments: Arc<dyn RecurrentPaymentRepository>,
    payments: Arc<dyn PaymentRepository>,
    gateways: Arc<dyn GatewayRegistry>,
    payment_log: Arc<dyn PaymentLogRepository>,
    event_publisher: Arc<dyn EventPublisher>,
    resolver: RecurrentPaymentsResolver,
    builder: ChargePaymentBuilder,
    processor: RecurrentPaymentsProcessor,
}

impl ChargeRecurrentPaymentsHandler {
    pub fn new(
        recurrent_payments: Arc<dyn RecurrentPaymentRepository>,
        payments: Arc<dyn PaymentRepository>,
        subscription_types: Arc<dyn SubscriptionTypeReader>,
        gateways: Arc<dyn GatewayRegistry>,
        payment_log: Arc<dyn PaymentLogRepository>,
        next_charge: Arc<dyn NextChargeCalculator>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            resolver: RecurrentPaymentsResolver::new(subscription_types),
            builder: ChargePaymentBuilder::new(payments.clone()),
            processor: RecurrentPaymentsProcessor::new(
                recurrent_payments.clone(),
                next_charge,
                event_publisher.clone(),
            ),
            recurrent_payments,
            payments,
            gateways,
            payment_log,
            event_publisher,
        }
    }

    /// Charges every due record.
    ///
    /// # Errors
    ///
    /// Only a failure to select the batch is returned; per-record failures
    /// are counted in `errors`.
    pub async fn handle(
        &self,
        cmd: ChargeRecurrentPaymentsCommand,
    ) -> Result<ChargeRunSummary, ChargeError> {
        let window_end = cmd.settings.due_window_end(cmd.now);
        let due = self.recurrent_payments.find_due(window_end).await?;

        let mut summary = ChargeRunSummary {
            selected: due.len(),
            ..ChargeRunSummary::default()
        };
        tracing::info!(selected = due.len(), window_end = %window_end.as_datetime(), "Starting recurring charge run");

        for recurrent_payment in due {
            let id = recurrent_payment.id;
            match self.charge_one(recurrent_payment, &cmd.settings, cmd.now).await {
                Ok(disposition) => summary.record(disposition),
                Err(err) => {
                    summary.errors += 1;
                    tracing::error!(
                        recurrent_payment_id = %id,
                        error_code = %err.code(),
                        error = %err,
                        "Recurring charge failed"
                    );
                }
            }
        }

        tracing::info!(
            selected = summary.selected,
            charged = summary.charged,
            pending = summary.pending,
            failed = summary.failed,
            stopped = summary.stopped,
            skipped = summary.skipped,
            errors = summary.errors,
            "Recurring charge run finished"
        );

        Ok(summary)
    }

    async fn charge_one(
        &self,
        mut recurrent_payment: RecurrentPayment,
        settings: &ChargingSettings,
        now: Timestamp,
    ) -> Result<ChargeDisposition, ChargeError> {
        if let Some(reason) = self.fast_charge_reason(&recurrent_payment, now).await? {
            recurrent_payment.stop_by_system(None, &reason, now)?;
            self.commit_stop(RecurrentTransition::new(recurrent_payment), reason, now)
                .await?;
            return Ok(ChargeDisposition::Stopped);
        }

        let gateway = self
            .gateways
            .get(&recurrent_payment.gateway_code)
            .ok_or_else(|| ChargeError::gateway_not_registered(&recurrent_payment.gateway_code))?;

        let resolved = self.resolver.resolve(&recurrent_payment).await?;

        let mut payment = match recurrent_payment.payment_id {
            Some(payment_id) => self
                .payments
                .find_by_id(&payment_id)
                .await?
                .ok_or(ChargeError::PaymentNotFound(payment_id))?,
            None => {
                let payment = self
                    .builder
                    .build(&recurrent_payment, &resolved, settings, now)
                    .await?;
                recurrent_payment.attach_payment(payment.id, now);
                self.recurrent_payments
                    .commit_transition(
                        RecurrentTransition::new(recurrent_payment.clone()).with_payment(payment.clone()),
                    )
                    .await?;
                payment
            }
        };

        if payment.is_paid() {
            tracing::info!(
                recurrent_payment_id = %recurrent_payment.id,
                payment_id = %payment.id,
                "Linked payment already paid, skipping charge"
            );
            return Ok(ChargeDisposition::Skipped);
        }

        if !self.token_is_valid(gateway.as_ref(), &recurrent_payment).await? {
            let reason = format!(
                "Token rejected by gateway {} before charging",
                recurrent_payment.gateway_code
            );
            payment.record_gateway_result(INVALID_TOKEN_RESULT_CODE, Some(reason.clone()));
            payment.mark_failed(now);
            let payload = json!({
                "outcome": INVALID_TOKEN_RESULT_CODE,
                "response": { "code": INVALID_TOKEN_RESULT_CODE, "message": reason },
            });
            self.audit(&recurrent_payment, &payment, false, payload, settings, now)
                .await;
            recurrent_payment.stop_by_system(Some(INVALID_TOKEN_RESULT_CODE.to_string()), &reason, now)?;
            self.commit_stop(
                RecurrentTransition::new(recurrent_payment).with_payment(payment),
                reason,
                now,
            )
            .await?;
            return Ok(ChargeDisposition::Stopped);
        }

        let outcome = gateway.charge(&payment, &recurrent_payment.token).await;
        tracing::info!(
            recurrent_payment_id = %recurrent_payment.id,
            payment_id = %payment.id,
            gateway = %recurrent_payment.gateway_code,
            outcome = outcome.kind(),
            result_code = %outcome.response().code,
            "Gateway charge returned"
        );
        let payload = serde_json::to_value(&outcome).unwrap_or_default();
        self.audit(
            &recurrent_payment,
            &payment,
            outcome.is_success(),
            payload,
            settings,
            now,
        )
        .await;

        let result = self
            .processor
            .handle(
                ProcessChargeOutcomeCommand {
                    recurrent_payment,
                    payment,
                    resolved,
                    outcome,
                    now,
                },
                settings,
            )
            .await?;

        Ok(result.disposition)
    }

    /// Reason to stop the record as a duplicate charge, if any.
    async fn fast_charge_reason(
        &self,
        recurrent_payment: &RecurrentPayment,
        now: Timestamp,
    ) -> Result<Option<String>, ChargeError> {
        let Some(last) = self
            .recurrent_payments
            .find_last_charged_by_token(&recurrent_payment.token)
            .await?
        else {
            return Ok(None);
        };
        if last.id == recurrent_payment.id {
            return Ok(None);
        }

        let charged_at = last.charged_at.unwrap_or(last.updated_at);
        let reason = if charged_at.is_same_day(&now) {
            format!(
                "Fast charge stopped: token already charged today by {} at {}",
                last.id,
                charged_at.as_datetime().to_rfc3339()
            )
        } else if last.charge_at == recurrent_payment.charge_at {
            format!(
                "Fast charge stopped: {} was already charged for charge_at {}",
                last.id,
                last.charge_at.as_datetime().to_rfc3339()
            )
        } else {
            return Ok(None);
        };

        tracing::warn!(
            recurrent_payment_id = %recurrent_payment.id,
            last_charged_id = %last.id,
            "Fast charge loop detected"
        );
        Ok(Some(reason))
    }

    async fn token_is_valid(
        &self,
        gateway: &dyn GatewayClient,
        recurrent_payment: &RecurrentPayment,
    ) -> Result<bool, ChargeError> {
        let Some(validation) = gateway.token_validation() else {
            return Ok(true);
        };
        validation
            .check_token_valid(&recurrent_payment.token)
            .await
            .map_err(|e| ChargeError::infrastructure(format!("Token check failed: {}", e)))
    }

    async fn commit_stop(
        &self,
        transition: RecurrentTransition,
        reason: String,
        now: Timestamp,
    ) -> Result<(), ChargeError> {
        let event = stopped_event(&transition.current, reason, now);
        tracing::warn!(
            recurrent_payment_id = %transition.current.id,
            note = transition.current.note.as_deref().unwrap_or_default(),
            "Recurrent payment stopped before charging"
        );
        self.recurrent_payments.commit_transition(transition).await?;
        if let Err(err) = self.event_publisher.publish(event).await {
            tracing::warn!(error = %err, "Failed to publish stop event");
        }
        Ok(())
    }

    /// Appends a gateway answer, tagged with the run currency, to the audit log.
    ///
    /// The gateway call already happened, so a log failure is reported but
    /// does not fail the record.
    async fn audit(
        &self,
        recurrent_payment: &RecurrentPayment,
        payment: &Payment,
        success: bool,
        mut payload: JsonValue,
        settings: &ChargingSettings,
        now: Timestamp,
    ) {
        if let Some(fields) = payload.as_object_mut() {
            fields.insert("currency".to_string(), json!(settings.currency));
        }
        let entry = PaymentLogEntry {
            id: PaymentLogId::new(),
            payment_id: payment.id,
            recurrent_payment_id: Some(recurrent_payment.id),
            success,
            source: RECURRENT_CHARGE_LOG_SOURCE.to_string(),
            payload,
            created_at: now,
        };
        if let Err(err) = self.payment_log.append(&entry).await {
            tracing::error!(
                payment_id = %payment.id,
                error = %err,
                "Failed to write payment log"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::gateways::{MockGatewayClient, StaticGatewayRegistry};
    use crate::adapters::memory::{InMemoryPaymentLog, InMemoryPaymentStore, InMemorySubscriptionTypeReader};
    use crate::adapters::schedule::SubscriptionLengthCalculator;
    use crate::domain::foundation::{PaymentToken, SubscriptionTypeId, UserId};
    use crate::domain::payment::PaymentStatus;
    use crate::domain::recurrent::{NewRecurrentPayment, RecurrentPaymentState};
    use crate::domain::subscription::{SubscriptionType, SubscriptionTypeItem};
    use crate::ports::{ChargeOutcome, GatewayResponse};
    use rust_decimal_macros::dec;

    struct Fixture {
        store: InMemoryPaymentStore,
        log: InMemoryPaymentLog,
        gateway: Arc<MockGatewayClient>,
        bus: Arc<InMemoryEventBus>,
        handler: ChargeRecurrentPaymentsHandler,
        subscription_type: SubscriptionType,
    }

    fn fixture_with(gateway: MockGatewayClient) -> Fixture {
        let subscription_type = SubscriptionType {
            id: SubscriptionTypeId::new(),
            code: "monthly".to_string(),
            name: "Monthly".to_string(),
            price: dec!(5.00),
            length_days: 30,
            items: vec![SubscriptionTypeItem {
                name: "Web".to_string(),
                amount: dec!(5.00),
                vat: dec!(20),
            }],
            next_subscription_type_id: None,
            active: true,
        };
        let store = InMemoryPaymentStore::new();
        let log = InMemoryPaymentLog::new();
        let gateway = Arc::new(gateway);
        let bus = Arc::new(InMemoryEventBus::new());
        let handler = ChargeRecurrentPaymentsHandler::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(InMemorySubscriptionTypeReader::new().with(subscription_type.clone())),
            Arc::new(StaticGatewayRegistry::new().with(gateway.clone())),
            Arc::new(log.clone()),
            Arc::new(SubscriptionLengthCalculator::default()),
            bus.clone(),
        );
        Fixture {
            store,
            log,
            gateway,
            bus,
            handler,
            subscription_type,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(MockGatewayClient::new("comfortpay"))
    }

    impl Fixture {
        async fn due(&self, token: &str, gateway_code: &str) -> RecurrentPayment {
            let now = Timestamp::now();
            let rp = RecurrentPayment::create(
                NewRecurrentPayment {
                    token: PaymentToken::new(token).unwrap(),
                    user_id: UserId::new("user-1").unwrap(),
                    gateway_code: gateway_code.to_string(),
                    subscription_type_id: self.subscription_type.id,
                    next_subscription_type_id: None,
                    parent_payment_id: None,
                    charge_at: now.add_minutes(-1),
                    expires_at: None,
                    retries: 3,
                    custom_amount: None,
                },
                now,
            )
            .unwrap();
            RecurrentPaymentRepository::save(&self.store, &rp).await.unwrap();
            rp
        }

        async fn run(&self) -> ChargeRunSummary {
            self.handler
                .handle(ChargeRecurrentPaymentsCommand {
                    now: Timestamp::now(),
                    settings: ChargingSettings::default(),
                })
                .await
                .unwrap()
        }

        async fn stored(&self, id: &crate::domain::foundation::RecurrentPaymentId) -> RecurrentPayment {
            RecurrentPaymentRepository::find_by_id(&self.store, id)
                .await
                .unwrap()
                .unwrap()
        }
    }

    #[tokio::test]
    async fn charges_due_record_and_logs_response() {
        let f = fixture();
        let rp = f.due("cid-1", "comfortpay").await;

        let summary = f.run().await;

        assert_eq!(summary.selected, 1);
        assert_eq!(summary.charged, 1);
        assert_eq!(summary.processed(), 1);
        let stored = f.stored(&rp.id).await;
        assert_eq!(stored.state, RecurrentPaymentState::Charged);
        let payment_id = stored.payment_id.unwrap();
        let payment = PaymentRepository::find_by_id(&f.store, &payment_id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Paid);
        assert_eq!(payment.amount, dec!(5.00));
        let entries = f.log.entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].success);
        assert_eq!(entries[0].source, RECURRENT_CHARGE_LOG_SOURCE);
        assert_eq!(entries[0].payment_id, payment_id);
        assert_eq!(entries[0].payload["outcome"], "ok");
        assert_eq!(entries[0].payload["currency"], "EUR");
    }

    #[tokio::test]
    async fn failed_charge_is_logged_as_unsuccessful() {
        let f = fixture();
        f.gateway
            .queue_outcome(ChargeOutcome::TransientFailure(GatewayResponse::new("51", "funds")));
        f.due("cid-1", "comfortpay").await;

        let summary = f.run().await;

        assert_eq!(summary.failed, 1);
        assert!(!f.log.entries()[0].success);
    }

    #[tokio::test]
    async fn unknown_gateway_is_isolated_per_record() {
        let f = fixture();
        let orphan = f.due("cid-1", "paypal").await;
        f.due("cid-2", "comfortpay").await;

        let summary = f.run().await;

        assert_eq!(summary.selected, 2);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.charged, 1);
        assert_eq!(f.stored(&orphan.id).await.state, RecurrentPaymentState::Active);
    }

    #[tokio::test]
    async fn fast_charge_guard_stops_without_gateway_call() {
        let f = fixture();
        let now = Timestamp::now();
        let mut earlier = f.due("cid-1", "comfortpay").await;
        earlier.mark_charged("00", now).unwrap();
        RecurrentPaymentRepository::update(&f.store, &earlier).await.unwrap();
        let duplicate = f.due("cid-1", "comfortpay").await;

        let summary = f.run().await;

        assert_eq!(summary.stopped, 1);
        assert!(!f.gateway.was_called("charge"));
        let stored = f.stored(&duplicate.id).await;
        assert_eq!(stored.state, RecurrentPaymentState::SystemStop);
        assert!(stored.note.unwrap().contains("Fast charge"));
        assert!(stored.payment_id.is_none());
        assert!(f.bus.has_event("recurrent_payment.stopped.v1"));
    }

    #[tokio::test]
    async fn invalid_token_stops_without_charge() {
        let f = fixture_with(MockGatewayClient::new("comfortpay").with_token_validation());
        f.gateway.set_token_invalid(PaymentToken::new("cid-1").unwrap());
        let rp = f.due("cid-1", "comfortpay").await;

        let summary = f.run().await;

        assert_eq!(summary.stopped, 1);
        assert!(f.gateway.was_called("check_token_valid"));
        assert!(!f.gateway.was_called("charge"));
        let stored = f.stored(&rp.id).await;
        assert_eq!(stored.state, RecurrentPaymentState::SystemStop);
        assert_eq!(stored.status.as_deref(), Some(INVALID_TOKEN_RESULT_CODE));
        let payment = PaymentRepository::find_by_id(&f.store, &stored.payment_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Fail);
        let entries = f.log.entries();
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].success);
        assert_eq!(entries[0].payment_id, payment.id);
        assert_eq!(entries[0].recurrent_payment_id, Some(rp.id));
        assert_eq!(entries[0].source, RECURRENT_CHARGE_LOG_SOURCE);
        assert_eq!(entries[0].payload["response"]["code"], INVALID_TOKEN_RESULT_CODE);
    }

    #[tokio::test]
    async fn linked_paid_payment_is_skipped() {
        let f = fixture();
        let rp = f.due("cid-1", "comfortpay").await;
        f.gateway
            .queue_outcome(ChargeOutcome::Pending(GatewayResponse::new("P", "pending")));
        f.run().await;

        // Async confirmation settles the payment but the record is reset for selection.
        let mut stored = f.stored(&rp.id).await;
        let mut payment = PaymentRepository::find_by_id(&f.store, &stored.payment_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        payment.mark_paid(Timestamp::now()).unwrap();
        PaymentRepository::update(&f.store, &payment).await.unwrap();
        stored.status = None;
        RecurrentPaymentRepository::update(&f.store, &stored).await.unwrap();

        let summary = f.run().await;

        assert_eq!(summary.skipped, 1);
        assert_eq!(f.gateway.call_count("charge"), 1);
        assert_eq!(f.stored(&rp.id).await, stored);
    }

    #[tokio::test]
    async fn run_without_due_records_is_empty() {
        let f = fixture();

        let summary = f.run().await;

        assert_eq!(summary, ChargeRunSummary::default());
        assert!(f.gateway.calls().is_empty());
    }
}

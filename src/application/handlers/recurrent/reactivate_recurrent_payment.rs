//! ReactivateRecurrentPaymentHandler - returns a stopped recurrent payment to `active`.

use std::sync::Arc;

use crate::domain::charging::ChargeError;
use crate::domain::foundation::{EventId, RecurrentPaymentId, SerializableDomainEvent, Timestamp};
use crate::domain::recurrent::{RecurrentPayment, RecurrentPaymentReactivated};
use crate::ports::{EventPublisher, RecurrentPaymentRepository};

/// Command to reactivate a stopped recurrent payment.
#[derive(Debug, Clone)]
pub struct ReactivateRecurrentPaymentCommand {
    pub recurrent_payment_id: RecurrentPaymentId,
    /// Retry budget to grant; defaults to the configured budget.
    pub retries: Option<i32>,
    /// New charge date; defaults to keeping the stored one if it is still
    /// in the future, otherwise `now`.
    pub charge_at: Option<Timestamp>,
    pub now: Timestamp,
}

/// Handler for reactivating recurrent payments.
pub struct ReactivateRecurrentPaymentHandler {
    recurrent_payments: Arc<dyn RecurrentPaymentRepository>,
    event_publisher: Arc<dyn EventPublisher>,
    default_retries: i32,
}

impl ReactivateRecurrentPaymentHandler {
    pub fn new(
        recurrent_payments: Arc<dyn RecurrentPaymentRepository>,
        event_publisher: Arc<dyn EventPublisher>,
        default_retries: i32,
    ) -> Self {
        Self {
            recurrent_payments,
            event_publisher,
            default_retries,
        }
    }

    pub async fn handle(
        &self,
        cmd: ReactivateRecurrentPaymentCommand,
    ) -> Result<RecurrentPayment, ChargeError> {
        // 1. Load
        let mut recurrent_payment = self
            .recurrent_payments
            .find_by_id(&cmd.recurrent_payment_id)
            .await?
            .ok_or(ChargeError::RecurrentPaymentNotFound(cmd.recurrent_payment_id))?;

        // 2. Reactivate through the state machine
        let charge_at = cmd.charge_at.unwrap_or_else(|| {
            if recurrent_payment.charge_at.is_after(&cmd.now) {
                recurrent_payment.charge_at
            } else {
                cmd.now
            }
        });
        let retries = cmd.retries.unwrap_or(self.default_retries);
        let previous_state = recurrent_payment.reactivate(retries, charge_at, cmd.now)?;

        // 3. Persist
        self.recurrent_payments.update(&recurrent_payment).await?;

        tracing::info!(
            recurrent_payment_id = %recurrent_payment.id,
            previous_state = %previous_state,
            retries = recurrent_payment.retries,
            "Recurrent payment reactivated"
        );

        // 4. Publish
        let event = RecurrentPaymentReactivated {
            event_id: EventId::new(),
            recurrent_payment_id: recurrent_payment.id,
            user_id: recurrent_payment.user_id.clone(),
            previous_state,
            charge_at: recurrent_payment.charge_at,
            occurred_at: cmd.now,
        };
        if let Err(err) = self.event_publisher.publish(event.to_envelope()).await {
            tracing::warn!(error = %err, "Failed to publish reactivation event");
        }

        Ok(recurrent_payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::memory::InMemoryPaymentStore;
    use crate::domain::foundation::{PaymentToken, SubscriptionTypeId, UserId};
    use crate::domain::recurrent::{NewRecurrentPayment, RecurrentPaymentState};

    struct Setup {
        store: InMemoryPaymentStore,
        bus: Arc<InMemoryEventBus>,
        handler: ReactivateRecurrentPaymentHandler,
    }

    fn setup() -> Setup {
        let store = InMemoryPaymentStore::new();
        let bus = Arc::new(InMemoryEventBus::new());
        let handler = ReactivateRecurrentPaymentHandler::new(Arc::new(store.clone()), bus.clone(), 4);
        Setup { store, bus, handler }
    }

    async fn stored_row(store: &InMemoryPaymentStore, charge_at: Timestamp) -> RecurrentPayment {
        let rp = RecurrentPayment::create(
            NewRecurrentPayment {
                token: PaymentToken::new("cid-1").unwrap(),
                user_id: UserId::new("user-1").unwrap(),
                gateway_code: "comfortpay".to_string(),
                subscription_type_id: SubscriptionTypeId::new(),
                next_subscription_type_id: None,
                parent_payment_id: None,
                charge_at,
                expires_at: None,
                retries: 0,
                custom_amount: None,
            },
            Timestamp::now(),
        )
        .unwrap();
        RecurrentPaymentRepository::save(store, &rp).await.unwrap();
        rp
    }

    fn command(id: RecurrentPaymentId) -> ReactivateRecurrentPaymentCommand {
        ReactivateRecurrentPaymentCommand {
            recurrent_payment_id: id,
            retries: None,
            charge_at: None,
            now: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn system_stop_is_reactivated_with_default_retries() {
        let s = setup();
        let now = Timestamp::now();
        let mut rp = stored_row(&s.store, now.add_days(-2)).await;
        rp.stop_by_system(Some("51".to_string()), "No retries left after 51", now)
            .unwrap();
        RecurrentPaymentRepository::update(&s.store, &rp).await.unwrap();

        let reactivated = s.handler.handle(command(rp.id)).await.unwrap();

        assert_eq!(reactivated.state, RecurrentPaymentState::Active);
        assert_eq!(reactivated.retries, 4);
        assert!(reactivated.status.is_none());
        assert!(!reactivated.charge_at.is_before(&now));
        assert!(reactivated.is_due(&Timestamp::now().add_minutes(1)));
        let note = reactivated.note.unwrap();
        assert!(note.contains("No retries left"));
        assert!(note.contains("Reactivated from system_stop"));
        let events: Vec<RecurrentPaymentReactivated> =
            s.bus.payloads_of("recurrent_payment.reactivated.v1");
        assert_eq!(events[0].previous_state, RecurrentPaymentState::SystemStop);
    }

    #[tokio::test]
    async fn future_charge_date_is_kept_and_overrides_apply() {
        let s = setup();
        let future = Timestamp::now().add_days(10);
        let mut rp = stored_row(&s.store, future).await;
        rp.stop_by_user(Timestamp::now()).unwrap();
        RecurrentPaymentRepository::update(&s.store, &rp).await.unwrap();

        let reactivated = s
            .handler
            .handle(ReactivateRecurrentPaymentCommand {
                retries: Some(1),
                ..command(rp.id)
            })
            .await
            .unwrap();

        assert_eq!(reactivated.charge_at, future);
        assert_eq!(reactivated.retries, 1);
    }

    #[tokio::test]
    async fn charged_row_cannot_be_reactivated() {
        let s = setup();
        let mut rp = stored_row(&s.store, Timestamp::now()).await;
        rp.mark_charged("00", Timestamp::now()).unwrap();
        RecurrentPaymentRepository::update(&s.store, &rp).await.unwrap();

        let err = s.handler.handle(command(rp.id)).await.unwrap_err();

        assert!(matches!(err, ChargeError::InvalidState(_)));
        assert!(s.bus.published_events().is_empty());
    }
}

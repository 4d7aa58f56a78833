//! RecurrentPaymentsProcessor - applies a gateway outcome to a charge attempt.
//!
//! | Outcome                       | Payment | Recurrent payment | Follow-up          |
//! |-------------------------------|---------|-------------------|--------------------|
//! | ok                            | paid    | charged           | next cycle row     |
//! | pending                       | form    | active (status)   | none               |
//! | transient / transport, left>0 | fail    | charge_failed     | retry row, left    |
//! | transient / transport, left=0 | fail    | system_stop       | none               |
//! | permanent                     | fail    | system_stop       | none               |
//!
//! `left` is the record's retries minus the attempt just made.

use std::sync::Arc;

use crate::domain::charging::{ChargeError, ChargingSettings};
use crate::domain::foundation::{EventEnvelope, EventId, SerializableDomainEvent, Timestamp};
use crate::domain::payment::Payment;
use crate::domain::recurrent::{
    RecurrentPayment, RecurrentPaymentChargeFailed, RecurrentPaymentCharged,
    RecurrentPaymentPending, RecurrentPaymentScheduled, RecurrentPaymentStopped,
};
use crate::ports::{
    ChargeOutcome, EventPublisher, GatewayResponse, NextChargeCalculator,
    RecurrentPaymentRepository, RecurrentTransition,
};

use super::ResolvedCharge;

/// How a record left the charge run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeDisposition {
    Charged,
    Pending,
    RetryScheduled,
    Stopped,
    /// Nothing to do; the payment was already settled.
    Skipped,
}

/// Command to apply one gateway outcome.
#[derive(Debug, Clone)]
pub struct ProcessChargeOutcomeCommand {
    pub recurrent_payment: RecurrentPayment,
    pub payment: Payment,
    pub resolved: ResolvedCharge,
    pub outcome: ChargeOutcome,
    pub now: Timestamp,
}

#[derive(Debug, Clone)]
pub struct ProcessChargeOutcomeResult {
    pub disposition: ChargeDisposition,
    pub recurrent_payment: RecurrentPayment,
    pub payment: Payment,
    /// Next cycle or retry row, when one was scheduled.
    pub follow_up: Option<RecurrentPayment>,
}

/// Applies charge outcomes; the only writer of charge results.
pub struct RecurrentPaymentsProcessor {
    recurrent_payments: Arc<dyn RecurrentPaymentRepository>,
    next_charge: Arc<dyn NextChargeCalculator>,
    event_publisher: Arc<dyn EventPublisher>,
}

struct Applied {
    disposition: ChargeDisposition,
    follow_up: Option<RecurrentPayment>,
    events: Vec<EventEnvelope>,
}

impl RecurrentPaymentsProcessor {
    pub fn new(
        recurrent_payments: Arc<dyn RecurrentPaymentRepository>,
        next_charge: Arc<dyn NextChargeCalculator>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            recurrent_payments,
            next_charge,
            event_publisher,
        }
    }

    /// Applies the outcome, commits the transition, then publishes events.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if the record can't take the transition
    /// - `Infrastructure` if the commit fails; nothing is written
    pub async fn handle(
        &self,
        cmd: ProcessChargeOutcomeCommand,
        settings: &ChargingSettings,
    ) -> Result<ProcessChargeOutcomeResult, ChargeError> {
        let ProcessChargeOutcomeCommand {
            mut recurrent_payment,
            mut payment,
            resolved,
            outcome,
            now,
        } = cmd;

        let response = outcome.response().clone();
        payment.record_gateway_result(&response.code, Some(response.message.clone()));

        let applied = match &outcome {
            ChargeOutcome::Ok(_) => {
                self.apply_charged(&mut recurrent_payment, &mut payment, &resolved, settings, now)?
            }
            ChargeOutcome::Pending(_) => apply_pending(&mut recurrent_payment, &payment, &response, now)?,
            ChargeOutcome::TransientFailure(_) | ChargeOutcome::TransportError(_) => apply_failed(
                &mut recurrent_payment,
                &mut payment,
                &response,
                matches!(outcome, ChargeOutcome::TransportError(_)),
                settings,
                now,
            )?,
            ChargeOutcome::PermanentFailure(_) => {
                payment.mark_failed(now);
                apply_stopped(
                    &mut recurrent_payment,
                    &response,
                    format!("Stopped after permanent decline {}", response.code),
                    now,
                )?
            }
        };

        let mut transition = RecurrentTransition::new(recurrent_payment.clone()).with_payment(payment.clone());
        if let Some(follow_up) = &applied.follow_up {
            transition = transition.with_follow_up(follow_up.clone());
        }
        self.recurrent_payments.commit_transition(transition).await?;

        tracing::info!(
            recurrent_payment_id = %recurrent_payment.id,
            payment_id = %payment.id,
            outcome = outcome.kind(),
            result_code = %response.code,
            state = %recurrent_payment.state,
            follow_up = ?applied.follow_up.as_ref().map(|f| f.id.to_string()),
            "Applied charge outcome"
        );

        if let Err(err) = self.event_publisher.publish_all(applied.events).await {
            tracing::warn!(
                recurrent_payment_id = %recurrent_payment.id,
                error = %err,
                "Failed to publish charge events"
            );
        }

        Ok(ProcessChargeOutcomeResult {
            disposition: applied.disposition,
            recurrent_payment,
            payment,
            follow_up: applied.follow_up,
        })
    }

    fn apply_charged(
        &self,
        recurrent_payment: &mut RecurrentPayment,
        payment: &mut Payment,
        resolved: &ResolvedCharge,
        settings: &ChargingSettings,
        now: Timestamp,
    ) -> Result<Applied, ChargeError> {
        let code = payment.result_code.clone().unwrap_or_default();
        payment.mark_paid(now)?;
        recurrent_payment.mark_charged(code, now)?;

        // An upgrade's custom amount (e.g. proration) applies to one cycle only.
        let custom_amount = if resolved.upgraded {
            None
        } else {
            resolved.custom_amount
        };
        let next_charge_at = self
            .next_charge
            .next_charge_at(&resolved.subscription_type, now);
        let next = recurrent_payment.next_cycle(
            payment.id,
            resolved.subscription_type.id,
            custom_amount,
            settings.default_retries,
            next_charge_at,
            now,
        );

        let events = vec![
            RecurrentPaymentCharged {
                event_id: EventId::new(),
                recurrent_payment_id: recurrent_payment.id,
                user_id: recurrent_payment.user_id.clone(),
                payment_id: payment.id,
                amount: payment.amount,
                gateway_code: payment.gateway_code.clone(),
                next_recurrent_payment_id: next.id,
                next_charge_at,
                occurred_at: now,
            }
            .to_envelope(),
            scheduled_event(recurrent_payment, &next, now),
        ];

        Ok(Applied {
            disposition: ChargeDisposition::Charged,
            follow_up: Some(next),
            events,
        })
    }
}

fn apply_pending(
    recurrent_payment: &mut RecurrentPayment,
    payment: &Payment,
    response: &GatewayResponse,
    now: Timestamp,
) -> Result<Applied, ChargeError> {
    recurrent_payment.mark_pending(&response.code, now)?;

    Ok(Applied {
        disposition: ChargeDisposition::Pending,
        follow_up: None,
        events: vec![RecurrentPaymentPending {
            event_id: EventId::new(),
            recurrent_payment_id: recurrent_payment.id,
            user_id: recurrent_payment.user_id.clone(),
            payment_id: payment.id,
            result_code: response.code.clone(),
            occurred_at: now,
        }
        .to_envelope()],
    })
}

fn apply_failed(
    recurrent_payment: &mut RecurrentPayment,
    payment: &mut Payment,
    response: &GatewayResponse,
    transport_error: bool,
    settings: &ChargingSettings,
    now: Timestamp,
) -> Result<Applied, ChargeError> {
    payment.mark_failed(now);
    let remaining = recurrent_payment.retries - 1;

    if transport_error {
        tracing::warn!(
            recurrent_payment_id = %recurrent_payment.id,
            result_code = %response.code,
            message = %response.message,
            "Gateway transport error"
        );
    }

    if remaining <= 0 {
        return apply_stopped(
            recurrent_payment,
            response,
            format!("No retries left after {}", response.code),
            now,
        );
    }

    recurrent_payment.mark_charge_failed(&response.code, now)?;
    let retry_at = now.add_duration(settings.retry_delay(remaining));
    let retry = recurrent_payment.retry_successor(remaining, retry_at, now);

    let events = vec![
        RecurrentPaymentChargeFailed {
            event_id: EventId::new(),
            recurrent_payment_id: recurrent_payment.id,
            user_id: recurrent_payment.user_id.clone(),
            payment_id: payment.id,
            result_code: response.code.clone(),
            result_message: response.message.clone(),
            transport_error,
            retries_remaining: remaining,
            retry_recurrent_payment_id: retry.id,
            retry_at,
            occurred_at: now,
        }
        .to_envelope(),
        scheduled_event(recurrent_payment, &retry, now),
    ];

    Ok(Applied {
        disposition: ChargeDisposition::RetryScheduled,
        follow_up: Some(retry),
        events,
    })
}

fn apply_stopped(
    recurrent_payment: &mut RecurrentPayment,
    response: &GatewayResponse,
    reason: String,
    now: Timestamp,
) -> Result<Applied, ChargeError> {
    recurrent_payment.stop_by_system(Some(response.code.clone()), &reason, now)?;
    tracing::warn!(
        recurrent_payment_id = %recurrent_payment.id,
        result_code = %response.code,
        reason = %reason,
        "Recurrent payment stopped"
    );

    Ok(Applied {
        disposition: ChargeDisposition::Stopped,
        follow_up: None,
        events: vec![stopped_event(recurrent_payment, reason, now)],
    })
}

pub(super) fn stopped_event(
    recurrent_payment: &RecurrentPayment,
    reason: String,
    now: Timestamp,
) -> EventEnvelope {
    RecurrentPaymentStopped {
        event_id: EventId::new(),
        recurrent_payment_id: recurrent_payment.id,
        user_id: recurrent_payment.user_id.clone(),
        state: recurrent_payment.state,
        result_code: recurrent_payment.status.clone(),
        reason,
        occurred_at: now,
    }
    .to_envelope()
}

fn scheduled_event(
    previous: &RecurrentPayment,
    scheduled: &RecurrentPayment,
    now: Timestamp,
) -> EventEnvelope {
    RecurrentPaymentScheduled {
        event_id: EventId::new(),
        recurrent_payment_id: scheduled.id,
        previous_recurrent_payment_id: previous.id,
        user_id: scheduled.user_id.clone(),
        charge_at: scheduled.charge_at,
        retries: scheduled.retries,
        occurred_at: now,
    }
    .to_envelope()
}

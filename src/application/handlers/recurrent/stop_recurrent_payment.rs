//! StopRecurrentPaymentHandler - operator or customer stops a recurrent payment.

use std::sync::Arc;

use crate::domain::charging::ChargeError;
use crate::domain::foundation::{RecurrentPaymentId, Timestamp};
use crate::domain::recurrent::RecurrentPayment;
use crate::ports::{EventPublisher, RecurrentPaymentRepository};

use super::process_charge_outcome::stopped_event;

/// Who requested the stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopActor {
    User,
    /// Administrator login or name, kept in the audit note.
    Admin(String),
}

/// Command to stop a recurrent payment.
#[derive(Debug, Clone)]
pub struct StopRecurrentPaymentCommand {
    pub recurrent_payment_id: RecurrentPaymentId,
    pub actor: StopActor,
    pub now: Timestamp,
}

/// Handler for stopping recurrent payments.
pub struct StopRecurrentPaymentHandler {
    recurrent_payments: Arc<dyn RecurrentPaymentRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl StopRecurrentPaymentHandler {
    pub fn new(
        recurrent_payments: Arc<dyn RecurrentPaymentRepository>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            recurrent_payments,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: StopRecurrentPaymentCommand,
    ) -> Result<RecurrentPayment, ChargeError> {
        // 1. Load
        let mut recurrent_payment = self
            .recurrent_payments
            .find_by_id(&cmd.recurrent_payment_id)
            .await?
            .ok_or(ChargeError::RecurrentPaymentNotFound(cmd.recurrent_payment_id))?;

        // 2. Stop (fails for rows already stopped or charged)
        let reason = match &cmd.actor {
            StopActor::User => {
                recurrent_payment.stop_by_user(cmd.now)?;
                "Stopped by user".to_string()
            }
            StopActor::Admin(admin) => {
                recurrent_payment.stop_by_admin(admin, cmd.now)?;
                format!("Stopped by admin {}", admin)
            }
        };

        // 3. Persist
        self.recurrent_payments.update(&recurrent_payment).await?;

        tracing::info!(
            recurrent_payment_id = %recurrent_payment.id,
            state = %recurrent_payment.state,
            "Recurrent payment stopped"
        );

        // 4. Publish
        if let Err(err) = self
            .event_publisher
            .publish(stopped_event(&recurrent_payment, reason, cmd.now))
            .await
        {
            tracing::warn!(error = %err, "Failed to publish stop event");
        }

        Ok(recurrent_payment)
    }
}

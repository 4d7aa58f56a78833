//! CheckTokenExpirationHandler - refreshes token expiration dates from gateways.
//!
//! Only gateways exposing the token expiration capability are asked. A
//! gateway failure is logged and counted; the other gateways still run.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::charging::ChargeError;
use crate::domain::foundation::{EventEnvelope, EventId, PaymentToken, SerializableDomainEvent, Timestamp};
use crate::domain::recurrent::RecurrentPaymentExpirationUpdated;
use crate::ports::{EventPublisher, GatewayRegistry, RecurrentPaymentRepository};

/// Command to refresh token expirations.
#[derive(Debug, Clone)]
pub struct CheckTokenExpirationCommand {
    pub now: Timestamp,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckTokenExpirationResult {
    /// Gateways that were asked.
    pub checked_gateways: usize,
    /// Rows whose `expires_at` changed.
    pub updated: usize,
    /// Gateways whose expiration call failed.
    pub failures: usize,
}

/// Handler for the token expiration refresh.
pub struct CheckTokenExpirationHandler {
    recurrent_payments: Arc<dyn RecurrentPaymentRepository>,
    gateways: Arc<dyn GatewayRegistry>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl CheckTokenExpirationHandler {
    pub fn new(
        recurrent_payments: Arc<dyn RecurrentPaymentRepository>,
        gateways: Arc<dyn GatewayRegistry>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            recurrent_payments,
            gateways,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: CheckTokenExpirationCommand,
    ) -> Result<CheckTokenExpirationResult, ChargeError> {
        let mut result = CheckTokenExpirationResult::default();
        let mut events = Vec::new();

        for code in self.gateways.codes() {
            let Some(client) = self.gateways.get(&code) else {
                continue;
            };
            let Some(expiration) = client.token_expiration() else {
                continue;
            };

            let rows = self.recurrent_payments.find_active_by_gateway(&code).await?;
            if rows.is_empty() {
                continue;
            }

            let mut seen = HashSet::new();
            let tokens: Vec<PaymentToken> = rows
                .iter()
                .filter(|rp| seen.insert(rp.token.clone()))
                .map(|rp| rp.token.clone())
                .collect();

            result.checked_gateways += 1;
            let expirations = match expiration.check_expiration(&tokens).await {
                Ok(expirations) => expirations,
                Err(err) => {
                    result.failures += 1;
                    tracing::warn!(gateway = %code, error = %err, "Token expiration check failed");
                    continue;
                }
            };

            for mut recurrent_payment in rows {
                let Some(expires_at) = expirations.get(&recurrent_payment.token).copied() else {
                    continue;
                };
                if recurrent_payment.expires_at == Some(expires_at) {
                    continue;
                }
                recurrent_payment.update_expiration(expires_at, cmd.now);
                self.recurrent_payments.update(&recurrent_payment).await?;
                result.updated += 1;
                events.push(expiration_event(&recurrent_payment, expires_at, cmd.now));
            }

            tracing::info!(
                gateway = %code,
                tokens = tokens.len(),
                reported = expirations.len(),
                "Token expirations refreshed"
            );
        }

        if let Err(err) = self.event_publisher.publish_all(events).await {
            tracing::warn!(error = %err, "Failed to publish expiration events");
        }

        Ok(result)
    }
}

fn expiration_event(
    recurrent_payment: &crate::domain::recurrent::RecurrentPayment,
    expires_at: Timestamp,
    now: Timestamp,
) -> EventEnvelope {
    RecurrentPaymentExpirationUpdated {
        event_id: EventId::new(),
        recurrent_payment_id: recurrent_payment.id,
        user_id: recurrent_payment.user_id.clone(),
        expires_at,
        occurred_at: now,
    }
    .to_envelope()
}

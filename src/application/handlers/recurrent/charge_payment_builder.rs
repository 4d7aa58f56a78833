//! Builds the payment a recurring charge is made for.

use std::sync::Arc;

use crate::domain::charging::{ChargeAmountSplitter, ChargeError, ChargingSettings};
use crate::domain::foundation::{PaymentId, Timestamp};
use crate::domain::payment::{
    generate_variable_symbol, AdditionalType, NewPayment, Payment, PaymentItem,
    PaymentItemContainer,
};
use crate::domain::recurrent::RecurrentPayment;
use crate::ports::PaymentRepository;

use super::ResolvedCharge;

/// Label of the donation line added to recurring charges.
pub const RECURRENT_DONATION_ITEM_NAME: &str = "Recurrent donation";

/// Creates a fresh `Form` payment for a due recurrent payment.
///
/// Line items come from one of three sources:
/// - the parent payment's items, when neither the type nor the price changed
/// - the billed type's standard items, when the type changed
/// - the amount splitter, when a custom amount applies
///
/// A recurring donation on the parent is appended as its own line.
pub struct ChargePaymentBuilder {
    payments: Arc<dyn PaymentRepository>,
    splitter: ChargeAmountSplitter,
}

impl ChargePaymentBuilder {
    pub fn new(payments: Arc<dyn PaymentRepository>) -> Self {
        Self {
            payments,
            splitter: ChargeAmountSplitter::new(),
        }
    }

    /// The returned payment is not persisted.
    pub async fn build(
        &self,
        recurrent_payment: &RecurrentPayment,
        resolved: &ResolvedCharge,
        settings: &ChargingSettings,
        now: Timestamp,
    ) -> Result<Payment, ChargeError> {
        let parent = match recurrent_payment.parent_payment_id {
            Some(parent_id) => Some(self.load_parent(parent_id).await?),
            None => None,
        };

        let mut items = self.subscription_items(parent.as_ref(), resolved)?;

        let donation = parent.as_ref().and_then(Payment::recurrent_donation);
        if let Some(amount) = donation {
            let vat = settings.require_donation_vat_rate()?;
            items.add_item(PaymentItem::donation(RECURRENT_DONATION_ITEM_NAME, amount, vat));
        }

        let payment = Payment::create(
            NewPayment {
                id: PaymentId::new(),
                variable_symbol: generate_variable_symbol(),
                user_id: recurrent_payment.user_id.clone(),
                gateway_code: recurrent_payment.gateway_code.clone(),
                subscription_type_id: Some(resolved.subscription_type.id),
                subscription_id: None,
                items,
                amount: None,
                additional_amount: donation,
                additional_type: donation.map(|_| AdditionalType::Recurrent),
                recurrent_charge: true,
                note: None,
            },
            now,
        )?;

        tracing::debug!(
            recurrent_payment_id = %recurrent_payment.id,
            payment_id = %payment.id,
            amount = %payment.amount,
            items = payment.items.len(),
            "Built recurring charge payment"
        );

        Ok(payment)
    }

    fn subscription_items(
        &self,
        parent: Option<&Payment>,
        resolved: &ResolvedCharge,
    ) -> Result<PaymentItemContainer, ChargeError> {
        let subscription_type = &resolved.subscription_type;

        if let Some(custom_amount) = resolved.custom_amount {
            return self
                .splitter
                .split(subscription_type.payment_items().items(), custom_amount);
        }

        match parent {
            Some(parent) if is_same_offer(parent, resolved) => Ok(parent.items.without_donations()),
            _ => Ok(subscription_type.payment_items()),
        }
    }

    async fn load_parent(&self, parent_id: PaymentId) -> Result<Payment, ChargeError> {
        self.payments
            .find_by_id(&parent_id)
            .await?
            .ok_or(ChargeError::PaymentNotFound(parent_id))
    }
}

/// Parent was for the billed type at its current list price.
fn is_same_offer(parent: &Payment, resolved: &ResolvedCharge) -> bool {
    let parent_items = parent.items.without_donations();
    parent.subscription_type_id == Some(resolved.subscription_type.id)
        && !parent_items.is_empty()
        && parent_items.total_price() == resolved.subscription_type.price
}

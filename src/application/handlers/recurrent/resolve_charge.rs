//! RecurrentPaymentsResolver - decides what the next charge bills.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::charging::ChargeError;
use crate::domain::foundation::SubscriptionTypeId;
use crate::domain::recurrent::RecurrentPayment;
use crate::domain::subscription::SubscriptionType;
use crate::ports::SubscriptionTypeReader;

/// What a recurrent payment should be charged for.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCharge {
    pub subscription_type: SubscriptionType,
    /// Amount replacing the list price, if any.
    pub custom_amount: Option<Decimal>,
    /// True when the billed type differs from the record's own type.
    pub upgraded: bool,
}

impl ResolvedCharge {
    /// Amount the payment will carry, before any donation.
    pub fn charge_amount(&self) -> Decimal {
        self.custom_amount
            .unwrap_or(self.subscription_type.price)
    }
}

/// Resolves the subscription type and custom amount of a due record.
///
/// Resolution order for the billed type:
/// 1. the record's scheduled `next_subscription_type_id` (upgrade)
/// 2. the catalogue successor of the record's type
/// 3. the record's own type
///
/// A custom amount equal to the billed list price is dropped. Reads only;
/// calling it repeatedly for the same record yields the same answer.
pub struct RecurrentPaymentsResolver {
    subscription_types: Arc<dyn SubscriptionTypeReader>,
}

impl RecurrentPaymentsResolver {
    pub fn new(subscription_types: Arc<dyn SubscriptionTypeReader>) -> Self {
        Self { subscription_types }
    }

    pub async fn resolve(&self, recurrent_payment: &RecurrentPayment) -> Result<ResolvedCharge, ChargeError> {
        let subscription_type = match recurrent_payment.next_subscription_type_id {
            Some(next_id) => self.load(next_id).await?,
            None => {
                let current = self.load(recurrent_payment.subscription_type_id).await?;
                match current.next_subscription_type_id {
                    Some(successor_id) => self.load(successor_id).await?,
                    None => current,
                }
            }
        };

        let custom_amount = recurrent_payment
            .custom_amount
            .filter(|amount| *amount != subscription_type.price);
        let upgraded = subscription_type.id != recurrent_payment.subscription_type_id;

        Ok(ResolvedCharge {
            subscription_type,
            custom_amount,
            upgraded,
        })
    }

    async fn load(&self, id: SubscriptionTypeId) -> Result<SubscriptionType, ChargeError> {
        self.subscription_types
            .find_by_id(&id)
            .await?
            .ok_or_else(|| ChargeError::subscription_type_not_found(id))
    }
}

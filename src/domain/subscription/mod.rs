//! Subscription types: the sellable products a recurring payment renews.
//!
//! Subscription types are owned by the subscriptions module; this crate
//! only reads them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::SubscriptionTypeId;
use crate::domain::payment::{PaymentItem, PaymentItemContainer};

/// Standard priced line of a subscription type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionTypeItem {
    pub name: String,
    pub amount: Decimal,
    /// VAT rate in percent.
    pub vat: Decimal,
}

/// A sellable subscription product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionType {
    pub id: SubscriptionTypeId,
    pub code: String,
    pub name: String,
    /// List price.
    pub price: Decimal,
    /// Length of one billing cycle in days.
    pub length_days: u32,
    pub items: Vec<SubscriptionTypeItem>,
    /// Type a renewal should move to, if the product is superseded.
    pub next_subscription_type_id: Option<SubscriptionTypeId>,
    pub active: bool,
}

impl SubscriptionType {
    /// Builds the standard payment lines for one cycle of this type.
    pub fn payment_items(&self) -> PaymentItemContainer {
        PaymentItemContainer::from_items(
            self.items
                .iter()
                .map(|item| PaymentItem::subscription(&item.name, item.amount, item.vat, 1, self.id))
                .collect(),
        )
    }

    /// Sum of the standard item amounts.
    pub fn items_total(&self) -> Decimal {
        self.items.iter().map(|item| item.amount).sum()
    }
}

//! Payment line items and the ordered container attached to a payment.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{SubscriptionTypeId, ValidationError};

/// Discriminator of a payment line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentItemType {
    #[serde(rename = "subscription_type")]
    Subscription,
    Donation,
    Authorization,
}

impl PaymentItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentItemType::Subscription => "subscription_type",
            PaymentItemType::Donation => "donation",
            PaymentItemType::Authorization => "authorization",
        }
    }
}

impl fmt::Display for PaymentItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentItemType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subscription_type" => Ok(PaymentItemType::Subscription),
            "donation" => Ok(PaymentItemType::Donation),
            "authorization" => Ok(PaymentItemType::Authorization),
            other => Err(ValidationError::invalid_format(
                "payment_item_type",
                format!("unknown item type '{}'", other),
            )),
        }
    }
}

/// One priced line of a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentItem {
    pub name: String,
    pub unit_price: Decimal,
    /// VAT rate in percent (e.g. `20` for 20 %).
    pub vat: Decimal,
    pub count: u32,
    pub item_type: PaymentItemType,
    /// Subscription type the line was priced from, if any.
    pub subscription_type_id: Option<SubscriptionTypeId>,
}

impl PaymentItem {
    /// Creates a subscription line item.
    pub fn subscription(
        name: impl Into<String>,
        unit_price: Decimal,
        vat: Decimal,
        count: u32,
        subscription_type_id: SubscriptionTypeId,
    ) -> Self {
        Self {
            name: name.into(),
            unit_price,
            vat,
            count,
            item_type: PaymentItemType::Subscription,
            subscription_type_id: Some(subscription_type_id),
        }
    }

    /// Creates a single donation line item.
    pub fn donation(name: impl Into<String>, amount: Decimal, vat: Decimal) -> Self {
        Self {
            name: name.into(),
            unit_price: amount,
            vat,
            count: 1,
            item_type: PaymentItemType::Donation,
            subscription_type_id: None,
        }
    }

    /// Line total: unit price times count.
    pub fn total_price(&self) -> Decimal {
        self.unit_price * Decimal::from(self.count)
    }

    /// Forces the line total to `price`.
    ///
    /// The line collapses to a single unit so the forced value is the total.
    pub fn force_price(&mut self, price: Decimal) {
        self.unit_price = price;
        self.count = 1;
    }

    pub fn is_donation(&self) -> bool {
        self.item_type == PaymentItemType::Donation
    }
}

/// Ordered collection of line items owned by one payment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentItemContainer {
    items: Vec<PaymentItem>,
}

impl PaymentItemContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<PaymentItem>) -> Self {
        Self { items }
    }

    pub fn add_item(&mut self, item: PaymentItem) {
        self.items.push(item);
    }

    pub fn add_items(&mut self, items: impl IntoIterator<Item = PaymentItem>) {
        self.items.extend(items);
    }

    pub fn items(&self) -> &[PaymentItem] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [PaymentItem] {
        &mut self.items
    }

    pub fn into_items(self) -> Vec<PaymentItem> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of every line total.
    pub fn total_price(&self) -> Decimal {
        self.items.iter().map(PaymentItem::total_price).sum()
    }

    /// Forces the total of the item at `index`; returns false if out of range.
    pub fn force_price(&mut self, index: usize, price: Decimal) -> bool {
        match self.items.get_mut(index) {
            Some(item) => {
                item.force_price(price);
                true
            }
            None => false,
        }
    }

    /// Returns the donation line, if the container carries one.
    pub fn donation(&self) -> Option<&PaymentItem> {
        self.items.iter().find(|item| item.is_donation())
    }

    /// Copy of this container without donation lines.
    pub fn without_donations(&self) -> Self {
        Self {
            items: self
                .items
                .iter()
                .filter(|item| !item.is_donation())
                .cloned()
                .collect(),
        }
    }
}

//! VAT-proportional splitting of a custom charge amount.
//!
//! When a recurring charge uses an amount different from the list price,
//! the amount is spread over the standard items so that each item keeps
//! its share of the standard total. Rounding remainders always land on the
//! first item after sorting by VAT rate (highest first).

use rust_decimal::Decimal;

use crate::domain::foundation::money::{self, floor2, round2};
use crate::domain::payment::{PaymentItem, PaymentItemContainer};

use super::ChargeError;

/// Splits custom charge amounts across standard line items.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChargeAmountSplitter;

impl ChargeAmountSplitter {
    pub fn new() -> Self {
        Self
    }

    /// Returns items whose totals sum exactly to `custom_amount`.
    ///
    /// Items are ordered by VAT rate descending (stable for equal rates) and
    /// every line is forced to a single unit carrying its share.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `custom_amount` is not a positive minor-unit
    ///   value or the standard items total is not positive
    /// - `ArithmeticConsistency` if the split does not add up
    pub fn split(
        &self,
        standard_items: &[PaymentItem],
        custom_amount: Decimal,
    ) -> Result<PaymentItemContainer, ChargeError> {
        money::validate_amount("custom_amount", custom_amount)
            .map_err(|e| ChargeError::invalid_amount(custom_amount, e.to_string()))?;

        let standard_total: Decimal = standard_items.iter().map(PaymentItem::total_price).sum();
        if standard_total <= Decimal::ZERO {
            return Err(ChargeError::invalid_amount(
                standard_total,
                "standard items total must be positive",
            ));
        }

        let mut items = standard_items.to_vec();
        items.sort_by(|a, b| b.vat.cmp(&a.vat));

        let mut ratios: Vec<Decimal> = items
            .iter()
            .map(|item| floor2(item.total_price() / standard_total))
            .collect();
        let ratio_sum: Decimal = ratios.iter().sum();
        ratios[0] += Decimal::ONE - ratio_sum;

        let mut prices: Vec<Decimal> = ratios
            .iter()
            .map(|ratio| floor2(custom_amount * ratio))
            .collect();
        let price_sum: Decimal = prices.iter().sum();
        prices[0] += round2(custom_amount - price_sum);

        for (item, price) in items.iter_mut().zip(prices) {
            item.force_price(price);
        }
        let container = PaymentItemContainer::from_items(items);

        let total = container.total_price();
        if total != custom_amount {
            tracing::error!(
                expected = %custom_amount,
                actual = %total,
                "Charge amount split does not add up"
            );
            return Err(ChargeError::arithmetic_consistency(custom_amount, total));
        }

        Ok(container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::SubscriptionTypeId;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn item(name: &str, price: Decimal, vat: Decimal) -> PaymentItem {
        PaymentItem::subscription(name, price, vat, 1, SubscriptionTypeId::new())
    }

    #[test]
    fn splits_six_over_seventy_thirty() {
        let items = vec![item("web", dec!(7.00), dec!(20)), item("print", dec!(3.00), dec!(10))];

        let split = ChargeAmountSplitter::new().split(&items, dec!(6.00)).unwrap();

        assert_eq!(split.items()[0].name, "web");
        assert_eq!(split.items()[0].total_price(), dec!(4.20));
        assert_eq!(split.items()[1].total_price(), dec!(1.80));
        assert_eq!(split.total_price(), dec!(6.00));
    }

    #[test]
    fn highest_vat_item_comes_first_even_if_listed_last() {
        let items = vec![item("print", dec!(3.00), dec!(10)), item("web", dec!(7.00), dec!(20))];

        let split = ChargeAmountSplitter::new().split(&items, dec!(6.00)).unwrap();

        assert_eq!(split.items()[0].name, "web");
        assert_eq!(split.items()[0].vat, dec!(20));
    }

    #[test]
    fn remainder_goes_to_first_item() {
        let items = vec![
            item("a", dec!(1.00), dec!(20)),
            item("b", dec!(1.00), dec!(10)),
            item("c", dec!(1.00), dec!(10)),
        ];

        let split = ChargeAmountSplitter::new().split(&items, dec!(10.00)).unwrap();
        let prices: Vec<Decimal> = split.items().iter().map(PaymentItem::total_price).collect();

        assert_eq!(prices, vec![dec!(3.40), dec!(3.30), dec!(3.30)]);
    }

    #[test]
    fn equal_vat_rates_keep_original_order() {
        let items = vec![
            item("first", dec!(2.00), dec!(0)),
            item("second", dec!(2.00), dec!(0)),
        ];

        let split = ChargeAmountSplitter::new().split(&items, dec!(3.01)).unwrap();

        assert_eq!(split.items()[0].name, "first");
        assert_eq!(split.items()[0].total_price(), dec!(1.51));
        assert_eq!(split.items()[1].total_price(), dec!(1.50));
    }

    #[test]
    fn multi_unit_lines_use_line_totals() {
        let items = vec![
            PaymentItem::subscription("issue", dec!(1.50), dec!(10), 4, SubscriptionTypeId::new()),
            item("web", dec!(4.00), dec!(20)),
        ];

        let split = ChargeAmountSplitter::new().split(&items, dec!(5.00)).unwrap();

        assert_eq!(split.items()[0].name, "web");
        assert_eq!(split.items()[0].total_price(), dec!(2.00));
        assert_eq!(split.items()[1].count, 1);
        assert_eq!(split.items()[1].total_price(), dec!(3.00));
    }

    #[test]
    fn single_item_takes_whole_amount() {
        let split = ChargeAmountSplitter::new()
            .split(&[item("web", dec!(5.00), dec!(20))], dec!(0.01))
            .unwrap();
        assert_eq!(split.total_price(), dec!(0.01));
    }

    #[test]
    fn rejects_non_positive_or_sub_cent_amount() {
        let items = vec![item("web", dec!(5.00), dec!(20))];
        let splitter = ChargeAmountSplitter::new();

        assert!(matches!(
            splitter.split(&items, dec!(0)),
            Err(ChargeError::InvalidAmount { .. })
        ));
        assert!(matches!(
            splitter.split(&items, dec!(1.005)),
            Err(ChargeError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn rejects_empty_or_free_standard_items() {
        let splitter = ChargeAmountSplitter::new();
        assert!(splitter.split(&[], dec!(5.00)).is_err());
        assert!(splitter
            .split(&[item("free", dec!(0), dec!(20))], dec!(5.00))
            .is_err());
    }

    fn cents(range: std::ops::Range<i64>) -> impl Strategy<Value = Decimal> {
        range.prop_map(|c| Decimal::new(c, 2))
    }

    proptest! {
        #[test]
        fn split_always_sums_to_custom_amount(
            lines in prop::collection::vec(
                (cents(1..50_000), prop::sample::select(vec![0i64, 5, 10, 19, 20, 23]), 1u32..4),
                1..6,
            ),
            custom in cents(1..1_000_000),
        ) {
            let items: Vec<PaymentItem> = lines
                .iter()
                .map(|(price, vat, count)| {
                    PaymentItem::subscription("line", *price, Decimal::from(*vat), *count, SubscriptionTypeId::new())
                })
                .collect();

            let split = ChargeAmountSplitter::new().split(&items, custom).unwrap();

            prop_assert_eq!(split.total_price(), custom);
            prop_assert_eq!(split.len(), items.len());
            for pair in split.items().windows(2) {
                prop_assert!(pair[0].vat >= pair[1].vat);
            }
        }
    }
}

//! Currency-precision helpers over `rust_decimal::Decimal`.
//!
//! All amounts carry two decimal places (minor units).

use rust_decimal::{Decimal, RoundingStrategy};

use super::ValidationError;

/// Number of decimal places of the minor currency unit.
pub const CURRENCY_SCALE: u32 = 2;

/// Truncates toward negative infinity at minor-unit precision.
pub fn floor2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::ToNegativeInfinity)
}

/// Rounds half away from zero at minor-unit precision.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Returns true when the value has no digits below the minor unit.
pub fn has_currency_precision(value: Decimal) -> bool {
    value.normalize().scale() <= CURRENCY_SCALE
}

/// Validates that an amount is strictly positive and expressible in minor units.
pub fn validate_amount(field: &str, value: Decimal) -> Result<Decimal, ValidationError> {
    if value <= Decimal::ZERO {
        return Err(ValidationError::not_positive(field, value));
    }
    if !has_currency_precision(value) {
        return Err(ValidationError::invalid_format(
            field,
            format!("{} has more than {} decimal places", value, CURRENCY_SCALE),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn floor2_truncates_down() {
        assert_eq!(floor2(dec!(0.699)), dec!(0.69));
        assert_eq!(floor2(dec!(4.2)), dec!(4.20));
        assert_eq!(floor2(dec!(-0.001)), dec!(-0.01));
    }

    #[test]
    fn round2_rounds_half_away_from_zero() {
        assert_eq!(round2(dec!(0.005)), dec!(0.01));
        assert_eq!(round2(dec!(-0.005)), dec!(-0.01));
        assert_eq!(round2(dec!(1.234)), dec!(1.23));
    }

    #[test]
    fn currency_precision_ignores_trailing_zeros() {
        assert!(has_currency_precision(dec!(5.000)));
        assert!(!has_currency_precision(dec!(5.001)));
    }

    #[test]
    fn validate_amount_rejects_zero_and_sub_cent_values() {
        assert!(validate_amount("amount", dec!(0)).is_err());
        assert!(validate_amount("amount", dec!(-1)).is_err());
        assert!(validate_amount("amount", dec!(0.001)).is_err());
        assert_eq!(validate_amount("amount", dec!(6.00)), Ok(dec!(6.00)));
    }
}

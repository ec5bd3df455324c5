//! Fixed-point helpers for amounts persisted as hundredths.
//!
//! Currency and hour columns are stored as integer minor units so every
//! backend round-trips them exactly; arithmetic happens on [`Decimal`].

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept for currency and hour amounts.
pub const SCALE: u32 = 2;

/// Rounds half-up (away from zero) to two decimal places.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero)
}

pub fn from_minor(units: i64) -> Decimal {
    Decimal::new(units, SCALE)
}

/// Rounds to two places and returns the value in hundredths.
pub fn to_minor(value: Decimal) -> i64 {
    let mut rounded = round2(value);
    rounded.rescale(SCALE);
    let mantissa = rounded.mantissa();
    i64::try_from(mantissa).unwrap_or(if mantissa < 0 { i64::MIN } else { i64::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(raw: &str) -> Decimal {
        Decimal::from_str(raw).unwrap()
    }

    #[test]
    fn rounds_midpoints_up() {
        assert_eq!(round2(dec("1.005")), dec("1.01"));
        assert_eq!(round2(dec("0.3333")), dec("0.33"));
        assert_eq!(round2(dec("-2.345")), dec("-2.35"));
    }

    #[test]
    fn minor_units_keep_two_places() {
        assert_eq!(to_minor(dec("30")), 3000);
        assert_eq!(to_minor(dec("1.5")), 150);
        assert_eq!(to_minor(dec("0.125")), 13);
        assert_eq!(from_minor(150), dec("1.50"));
        assert_eq!(from_minor(-99), dec("-0.99"));
    }
}

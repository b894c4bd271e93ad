//! Money as integer minor units.
//!
//! Amounts are held as paise (1/100 of a rupee) so that sums, caps and comparisons
//! are exact. On the wire an amount is a 2-decimal major-unit number
//! (`1299.5` ⇄ `Money(129950)`); numeric strings are accepted on input as well.

use core::fmt;
use core::ops::{Add, AddAssign, Mul, Sub};

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A currency amount in minor units (paise).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Convert a major-unit amount, rounding half away from zero to whole paise.
    pub fn from_major(major: f64) -> Self {
        Self((major * 100.0).round() as i64)
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    pub fn to_major(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// `self × percent / 100`, rounded to whole paise.
    pub fn percent(self, percent: f64) -> Money {
        Money((self.0 as f64 * percent / 100.0).round() as i64)
    }

    /// Never below zero.
    pub fn clamp_non_negative(self) -> Money {
        Money(self.0.max(0))
    }

    pub fn saturating_sub(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0))
    }

    /// `None` when the sum does not fit.
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    pub fn checked_mul(self, factor: i64) -> Option<Money> {
        self.0.checked_mul(factor).map(Money)
    }

    /// Sum that reports overflow instead of saturating.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, m| acc.checked_add(m))
    }
}

// The operators saturate at the i64 bounds. Code that must report an unrepresentable
// amount uses the `checked_*` forms.

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl Mul<i64> for Money {
    type Output = Money;

    fn mul(self, rhs: i64) -> Money {
        Money(self.0.saturating_mul(rhs))
    }
}

impl core::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_major())
    }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a currency amount in major units")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        if !v.is_finite() {
            return Err(E::custom("amount must be finite"));
        }
        Ok(Money::from_major(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        v.checked_mul(100)
            .map(Money)
            .ok_or_else(|| E::custom("amount out of range"))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        i64::try_from(v)
            .ok()
            .and_then(|v| v.checked_mul(100))
            .map(Money)
            .ok_or_else(|| E::custom("amount out of range"))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        let cleaned: String = v
            .trim()
            .trim_start_matches('₹')
            .chars()
            .filter(|c| *c != ',')
            .collect();
        let parsed: f64 = cleaned
            .trim()
            .parse()
            .map_err(|_| E::custom(format!("invalid amount: {v}")))?;
        self.visit_f64(parsed)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn major_units_round_to_whole_paise() {
        assert_eq!(Money::from_major(1299.5).minor(), 129_950);
        assert_eq!(Money::from_major(19.994).minor(), 1_999);
    }

    #[test]
    fn wire_form_is_major_units() {
        let m: Money = serde_json::from_str("499.99").unwrap();
        assert_eq!(m, Money::from_minor(49_999));
        assert_eq!(serde_json::to_string(&m).unwrap(), "499.99");

        let whole: Money = serde_json::from_str("1000").unwrap();
        assert_eq!(whole.minor(), 100_000);

        let text: Money = serde_json::from_str("\"₹1,299.50\"").unwrap();
        assert_eq!(text.minor(), 129_950);
    }

    #[test]
    fn percent_rounds_to_paise() {
        assert_eq!(Money::from_minor(100_000).percent(20.0), Money::from_minor(20_000));
        assert_eq!(Money::from_minor(999).percent(12.5), Money::from_minor(125));
    }

    #[test]
    fn display_has_two_decimals() {
        assert_eq!(Money::from_minor(129_950).to_string(), "1299.50");
        assert_eq!(Money::from_minor(-5).to_string(), "-0.05");
    }

    #[test]
    fn checked_arithmetic_reports_overflow() {
        let big = Money::from_minor(i64::MAX / 2 + 1);
        assert_eq!(big.checked_add(big), None);
        assert_eq!(big.checked_mul(2), None);
        assert_eq!(Money::from_minor(-2).checked_sub(Money::from_minor(i64::MAX)), None);
        assert_eq!(
            Money::checked_sum([Money::from_minor(100), Money::from_minor(250)]),
            Some(Money::from_minor(350))
        );
        assert_eq!(Money::checked_sum([big, big]), None);
    }

    #[test]
    fn operators_saturate_instead_of_panicking() {
        let big = Money::from_minor(i64::MAX);
        assert_eq!(big + Money::from_minor(1), big);
        assert_eq!(big * 3, big);
        assert_eq!(Money::from_minor(i64::MIN) - Money::from_minor(1), Money::from_minor(i64::MIN));
    }

    proptest! {
        #[test]
        fn percent_of_an_amount_stays_within_it(minor in 0i64..10_000_000_000, pct in 0.0f64..=100.0) {
            let part = Money::from_minor(minor).percent(pct);
            prop_assert!(part.minor() >= 0);
            prop_assert!(part.minor() <= minor);
        }
    }
}

//! Discount pricing.
//!
//! An ineligible discount prices at zero; it is never an error.

use chrono::{DateTime, Utc};

use storecraft_core::Money;

use crate::discount::{Discount, DiscountType};

/// Why a discount prices at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligible {
    Inactive,
    NotStarted,
    Expired,
    UsageLimitReached,
    BelowMinimum { min_order_value: Money },
}

impl Discount {
    /// Eligibility gates, checked in a fixed order.
    pub fn eligibility(&self, subtotal: Money, now: DateTime<Utc>) -> Result<(), Ineligible> {
        if !self.active {
            return Err(Ineligible::Inactive);
        }
        if now < self.starts_at {
            return Err(Ineligible::NotStarted);
        }
        if matches!(self.ends_at, Some(end) if now > end) {
            return Err(Ineligible::Expired);
        }
        if self.is_exhausted() {
            return Err(Ineligible::UsageLimitReached);
        }
        if let Some(min) = self.min_order_value {
            if subtotal < min {
                return Err(Ineligible::BelowMinimum {
                    min_order_value: min,
                });
            }
        }
        Ok(())
    }

    fn capped(&self, raw: Money, subtotal: Money) -> Money {
        let mut amount = raw.clamp_non_negative();
        if let Some(cap) = self.max_discount {
            amount = amount.min(cap);
        }
        amount.min(subtotal.clamp_non_negative())
    }
}

/// Amount taken off `subtotal`. `bogo` needs line information and yields zero here;
/// see [`calculate_line_discount`].
pub fn calculate_discount(discount: &Discount, subtotal: Money, now: DateTime<Utc>) -> Money {
    if discount.eligibility(subtotal, now).is_err() {
        return Money::ZERO;
    }
    let raw = match discount.discount_type {
        DiscountType::Percentage => subtotal.percent(discount.value),
        DiscountType::Flat => discount.flat_amount(),
        DiscountType::Bogo => Money::ZERO,
    };
    discount.capped(raw, subtotal)
}

/// One priced cart line.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DiscountLine {
    pub unit_price: Money,
    pub quantity: i64,
}

/// Line-aware pricing. For `bogo`, every second unit on a line is free; the other
/// types behave exactly as [`calculate_discount`] on the summed subtotal.
pub fn calculate_line_discount(
    discount: &Discount,
    lines: &[DiscountLine],
    now: DateTime<Utc>,
) -> Money {
    let subtotal: Money = lines.iter().map(|l| l.unit_price * l.quantity.max(0)).sum();
    if discount.discount_type != DiscountType::Bogo {
        return calculate_discount(discount, subtotal, now);
    }
    if discount.eligibility(subtotal, now).is_err() {
        return Money::ZERO;
    }
    let free: Money = lines
        .iter()
        .map(|l| l.unit_price * (l.quantity.max(0) / 2))
        .sum();
    discount.capped(free, subtotal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;
    use storecraft_core::TenantId;

    fn rupees(r: i64) -> Money {
        Money::from_minor(r * 100)
    }

    fn discount(t: DiscountType, value: f64) -> Discount {
        Discount::new(
            TenantId::new(),
            "TEST",
            t,
            value,
            None,
            None,
            None,
            Some(Utc::now() - Duration::days(1)),
            None,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn percentage_respects_max_discount() {
        let mut d = discount(DiscountType::Percentage, 20.0);
        d.max_discount = Some(rupees(100));
        assert_eq!(calculate_discount(&d, rupees(1000), Utc::now()), rupees(100));
        d.max_discount = None;
        assert_eq!(calculate_discount(&d, rupees(1000), Utc::now()), rupees(200));
    }

    #[test]
    fn expired_code_prices_at_zero() {
        let mut d = discount(DiscountType::Flat, 50.0);
        d.ends_at = Some(Utc::now() - Duration::hours(1));
        assert_eq!(calculate_discount(&d, rupees(1000), Utc::now()), Money::ZERO);
        assert_eq!(
            d.eligibility(rupees(1000), Utc::now()),
            Err(Ineligible::Expired)
        );
    }

    #[test]
    fn gates_yield_zero() {
        let now = Utc::now();
        let mut inactive = discount(DiscountType::Flat, 50.0);
        inactive.active = false;
        assert_eq!(calculate_discount(&inactive, rupees(500), now), Money::ZERO);

        let mut future = discount(DiscountType::Flat, 50.0);
        future.starts_at = now + Duration::days(2);
        assert_eq!(calculate_discount(&future, rupees(500), now), Money::ZERO);

        let mut used_up = discount(DiscountType::Flat, 50.0);
        used_up.usage_limit = Some(3);
        used_up.used_count = 3;
        assert_eq!(calculate_discount(&used_up, rupees(500), now), Money::ZERO);

        let mut minimum = discount(DiscountType::Flat, 50.0);
        minimum.min_order_value = Some(rupees(999));
        assert_eq!(calculate_discount(&minimum, rupees(500), now), Money::ZERO);
        assert_eq!(calculate_discount(&minimum, rupees(999), now), rupees(50));
    }

    #[test]
    fn flat_is_capped_at_subtotal() {
        let d = discount(DiscountType::Flat, 500.0);
        assert_eq!(calculate_discount(&d, rupees(120), Utc::now()), rupees(120));
    }

    #[test]
    fn bogo_needs_lines() {
        let d = discount(DiscountType::Bogo, 0.0);
        assert_eq!(calculate_discount(&d, rupees(1000), Utc::now()), Money::ZERO);

        let lines = [
            DiscountLine {
                unit_price: rupees(100),
                quantity: 3,
            },
            DiscountLine {
                unit_price: rupees(40),
                quantity: 4,
            },
            DiscountLine {
                unit_price: rupees(999),
                quantity: 1,
            },
        ];
        assert_eq!(
            calculate_line_discount(&d, &lines, Utc::now()),
            rupees(100 + 80)
        );
    }

    #[test]
    fn line_aware_matches_subtotal_for_percentage() {
        let d = discount(DiscountType::Percentage, 10.0);
        let lines = [DiscountLine {
            unit_price: rupees(250),
            quantity: 2,
        }];
        assert_eq!(
            calculate_line_discount(&d, &lines, Utc::now()),
            calculate_discount(&d, rupees(500), Utc::now())
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: the discount never exceeds the subtotal or the cap.
        #[test]
        fn never_exceeds_subtotal_or_cap(
            pct in 1u32..=100,
            subtotal in 0i64..10_000_000,
            cap in proptest::option::of(1i64..1_000_000),
        ) {
            let mut d = discount(DiscountType::Percentage, pct as f64);
            d.max_discount = cap.map(Money::from_minor);
            let amount = calculate_discount(&d, Money::from_minor(subtotal), Utc::now());
            prop_assert!(amount.minor() >= 0);
            prop_assert!(amount.minor() <= subtotal);
            if let Some(cap) = cap {
                prop_assert!(amount.minor() <= cap);
            }
        }
    }
}

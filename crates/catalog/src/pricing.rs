//! Price sanity rules.
//!
//! These rules reject; they never auto-correct a price.

use serde::{Deserialize, Serialize};

use storecraft_core::{DomainError, DomainResult, Money};

/// Highest accepted selling price: ₹10,00,000.
pub const MAX_PRICE: Money = Money::from_minor(1_000_000 * 100);

pub fn validate_price(price: Money) -> DomainResult<()> {
    if !price.is_positive() {
        return Err(DomainError::validation(format!(
            "price must be greater than 0 (got {price})"
        )));
    }
    if price > MAX_PRICE {
        return Err(DomainError::validation(format!(
            "price {price} exceeds the maximum of {MAX_PRICE}"
        )));
    }
    Ok(())
}

/// Selling price plus optional compare-at ("was") price.
pub fn validate_price_pair(price: Money, compare_at: Option<Money>) -> DomainResult<()> {
    validate_price(price)?;
    if let Some(compare_at) = compare_at {
        if compare_at <= price {
            return Err(DomainError::validation(format!(
                "compare-at price {compare_at} must be greater than the selling price {price}"
            )));
        }
    }
    Ok(())
}

/// A catalog-wide price change.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "adjustmentType", content = "adjustmentValue")]
pub enum BulkAdjustment {
    /// `price × (1 + value / 100)`; `-10` is a 10% markdown.
    Percentage(f64),
    /// `price + value`; negative values are markdowns.
    Flat(Money),
}

impl BulkAdjustment {
    /// Rules that hold regardless of which products are affected.
    pub fn validate(&self) -> DomainResult<()> {
        match *self {
            BulkAdjustment::Percentage(pct) if !pct.is_finite() => {
                Err(DomainError::validation("percentage adjustment must be a number"))
            }
            BulkAdjustment::Percentage(pct) if pct <= -100.0 => Err(DomainError::validation(
                format!("a {pct}% adjustment would make every price zero or negative"),
            )),
            _ => Ok(()),
        }
    }

    /// The adjusted price, or `None` when it cannot be represented.
    pub fn apply(&self, price: Money) -> Option<Money> {
        match *self {
            BulkAdjustment::Percentage(pct) => price.checked_add(price.percent(pct)),
            BulkAdjustment::Flat(delta) => price.checked_add(delta),
        }
    }

    /// Check the adjusted price of every named product; the first offender is reported.
    pub fn validate_against<'a>(
        &self,
        products: impl IntoIterator<Item = (&'a str, Money)>,
    ) -> DomainResult<()> {
        self.validate()?;
        for (name, price) in products {
            let adjusted = self.apply(price).ok_or_else(|| {
                DomainError::validation(format!(
                    "adjustment would raise the price of '{name}' above {MAX_PRICE}"
                ))
            })?;
            if !adjusted.is_positive() {
                return Err(DomainError::validation(format!(
                    "adjustment would set the price of '{name}' to {adjusted}"
                )));
            }
            if adjusted > MAX_PRICE {
                return Err(DomainError::validation(format!(
                    "adjustment would raise the price of '{name}' above {MAX_PRICE}"
                )));
            }
        }
        Ok(())
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storecraft_core::{DiscountId, DomainError, DomainResult, Entity, Money, TenantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// `value` is a percentage of the subtotal.
    Percentage,
    /// `value` is an amount in rupees.
    Flat,
    /// Every second unit on a line is free; `value` is unused.
    Bogo,
}

impl DiscountType {
    pub fn as_str(self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::Flat => "flat",
            DiscountType::Bogo => "bogo",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "percentage" => Some(DiscountType::Percentage),
            "flat" => Some(DiscountType::Flat),
            "bogo" => Some(DiscountType::Bogo),
            _ => None,
        }
    }
}

/// Codes are compared case-insensitively and stored upper-cased.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discount {
    pub id: DiscountId,
    pub tenant_id: TenantId,
    pub code: String,
    #[serde(rename = "type")]
    pub discount_type: DiscountType,
    pub value: f64,
    pub min_order_value: Option<Money>,
    pub max_discount: Option<Money>,
    pub usage_limit: Option<i64>,
    pub used_count: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Discount {
    /// New, active discount. `starts_at` defaults to `now`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenant_id: TenantId,
        code: &str,
        discount_type: DiscountType,
        value: f64,
        min_order_value: Option<Money>,
        max_discount: Option<Money>,
        usage_limit: Option<i64>,
        starts_at: Option<DateTime<Utc>>,
        ends_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let discount = Self {
            id: DiscountId::new(),
            tenant_id,
            code: normalize_code(code),
            discount_type,
            value,
            min_order_value,
            max_discount,
            usage_limit,
            used_count: 0,
            starts_at: starts_at.unwrap_or(now),
            ends_at,
            active: true,
            created_at: now,
            updated_at: now,
        };
        discount.validate()?;
        Ok(discount)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.code.is_empty() || self.code.len() > 32 {
            return Err(DomainError::validation(
                "discount code must be 1 to 32 characters",
            ));
        }
        if !self
            .code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DomainError::validation(format!(
                "discount code '{}' may only contain letters, digits, '-' and '_'",
                self.code
            )));
        }
        if !self.value.is_finite() {
            return Err(DomainError::validation("discount value must be a number"));
        }
        match self.discount_type {
            DiscountType::Percentage if self.value <= 0.0 || self.value > 100.0 => {
                return Err(DomainError::validation(format!(
                    "percentage discount must be in (0, 100] (got {})",
                    self.value
                )));
            }
            DiscountType::Flat if self.value <= 0.0 => {
                return Err(DomainError::validation("flat discount must be greater than 0"));
            }
            _ => {}
        }
        if matches!(self.max_discount, Some(cap) if !cap.is_positive()) {
            return Err(DomainError::validation("max discount must be greater than 0"));
        }
        if matches!(self.min_order_value, Some(min) if min.minor() < 0) {
            return Err(DomainError::validation("min order value cannot be negative"));
        }
        if matches!(self.usage_limit, Some(limit) if limit <= 0) {
            return Err(DomainError::validation("usage limit must be greater than 0"));
        }
        if let Some(limit) = self.usage_limit {
            if self.used_count > limit {
                return Err(DomainError::validation(format!(
                    "usage limit {limit} is below the {} uses already made",
                    self.used_count
                )));
            }
        }
        if matches!(self.ends_at, Some(end) if end <= self.starts_at) {
            return Err(DomainError::validation("discount must end after it starts"));
        }
        Ok(())
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.usage_limit, Some(limit) if self.used_count >= limit)
    }

    /// Flat value as money.
    pub fn flat_amount(&self) -> Money {
        Money::from_major(self.value)
    }
}

impl Entity for Discount {
    type Id = DiscountId;

    fn id(&self) -> DiscountId {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Partial update. `used_count` is deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscountPatch {
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub discount_type: Option<DiscountType>,
    pub value: Option<f64>,
    pub min_order_value: Option<Money>,
    pub max_discount: Option<Money>,
    pub usage_limit: Option<i64>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl DiscountPatch {
    /// Apply onto a copy; the original is untouched if the result is invalid.
    pub fn apply_to(&self, discount: &Discount, now: DateTime<Utc>) -> DomainResult<Discount> {
        let mut next = discount.clone();
        if let Some(code) = &self.code {
            next.code = normalize_code(code);
        }
        if let Some(t) = self.discount_type {
            next.discount_type = t;
        }
        if let Some(v) = self.value {
            next.value = v;
        }
        if self.min_order_value.is_some() {
            next.min_order_value = self.min_order_value;
        }
        if self.max_discount.is_some() {
            next.max_discount = self.max_discount;
        }
        if self.usage_limit.is_some() {
            next.usage_limit = self.usage_limit;
        }
        if let Some(s) = self.starts_at {
            next.starts_at = s;
        }
        if self.ends_at.is_some() {
            next.ends_at = self.ends_at;
        }
        next.validate()?;
        next.updated_at = now;
        Ok(next)
    }
}

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storecraft_core::{DomainError, DomainResult, Entity, Money, ProductId, TenantId, VariantId};

use crate::ledger::StockLevel;

/// A sellable configuration of a product (e.g. size M / colour blue).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: VariantId,
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub sku: Option<String>,
    /// Free-form option map; ordered so that titles and snapshots are stable.
    pub attributes: BTreeMap<String, String>,
    pub price_override: Option<Money>,
    #[serde(flatten)]
    pub level: StockLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Variant {
    pub fn new(
        tenant_id: TenantId,
        product_id: ProductId,
        attributes: BTreeMap<String, String>,
        price_override: Option<Money>,
        stock: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let id = VariantId::new();
        let level = StockLevel::new(stock).map_err(|e| e.into_domain(id))?;
        if attributes.keys().any(|k| k.trim().is_empty()) {
            return Err(DomainError::validation("variant attribute names cannot be empty"));
        }
        Ok(Self {
            id,
            tenant_id,
            product_id,
            sku: None,
            attributes,
            price_override,
            level,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn stock(&self) -> i64 {
        self.level.stock()
    }

    pub fn reserved(&self) -> i64 {
        self.level.reserved()
    }

    pub fn available(&self) -> i64 {
        self.level.available()
    }

    /// Effective unit price: the override if present, else the product's price.
    pub fn unit_price(&self, product_price: Money) -> Money {
        self.price_override.unwrap_or(product_price)
    }

    /// Human-readable option summary, e.g. `"color: blue / size: M"`.
    pub fn title(&self) -> String {
        self.attributes
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

impl Entity for Variant {
    type Id = VariantId;

    fn id(&self) -> VariantId {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

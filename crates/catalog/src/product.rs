use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storecraft_core::{DomainError, DomainResult, Entity, Money, ProductId, TenantId};
use storecraft_events::Event;

use crate::pricing::validate_price_pair;
use crate::slug::slugify;

/// Product status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Draft,
    Active,
    Archived,
}

impl ProductStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Active => "active",
            ProductStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(ProductStatus::Draft),
            "active" => Some(ProductStatus::Active),
            "archived" => Some(ProductStatus::Archived),
            _ => None,
        }
    }
}

/// A media asset linked to a product. The asset itself lives in external storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    pub url: String,
    pub alt: Option<String>,
}

/// Catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub tenant_id: TenantId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Money,
    pub compare_at_price: Option<Money>,
    pub status: ProductStatus,
    pub tags: Vec<String>,
    /// Ordered; the first entry is the primary image.
    pub media: Vec<MediaRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(
        tenant_id: TenantId,
        name: &str,
        price: Money,
        compare_at_price: Option<Money>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = validate_name(name)?;
        validate_price_pair(price, compare_at_price)?;
        Ok(Self {
            id: ProductId::new(),
            tenant_id,
            slug: slugify(&name),
            name,
            description: None,
            price,
            compare_at_price,
            status: ProductStatus::Draft,
            tags: Vec::new(),
            media: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn rename(&mut self, name: &str) -> DomainResult<()> {
        let name = validate_name(name)?;
        self.slug = slugify(&name);
        self.name = name;
        Ok(())
    }

    /// Reprice. `compare_at_price: None` keeps the current compare-at price.
    pub fn reprice(&mut self, price: Money, compare_at_price: Option<Money>) -> DomainResult<()> {
        let compare_at = compare_at_price.or(self.compare_at_price);
        validate_price_pair(price, compare_at)?;
        self.price = price;
        self.compare_at_price = compare_at;
        Ok(())
    }

    /// Set the compare-at price explicitly (including clearing it).
    pub fn set_compare_at(&mut self, compare_at_price: Option<Money>) -> DomainResult<()> {
        validate_price_pair(self.price, compare_at_price)?;
        self.compare_at_price = compare_at_price;
        Ok(())
    }

    pub fn is_sellable(&self) -> bool {
        self.status == ProductStatus::Active
    }

    /// Copy under a new id, always as a draft.
    pub fn duplicate(&self, now: DateTime<Utc>) -> Product {
        let name = format!("{} (Copy)", self.name);
        Product {
            id: ProductId::new(),
            slug: slugify(&name),
            name,
            status: ProductStatus::Draft,
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }

    pub fn attach_media(&mut self, media: MediaRef, position: Option<usize>) -> DomainResult<()> {
        if media.url.trim().is_empty() {
            return Err(DomainError::validation("media url cannot be empty"));
        }
        self.media.retain(|m| m.url != media.url);
        let at = position.unwrap_or(self.media.len()).min(self.media.len());
        self.media.insert(at, media);
        Ok(())
    }

    /// Returns whether anything was removed.
    pub fn detach_media(&mut self, url: &str) -> bool {
        let before = self.media.len();
        self.media.retain(|m| m.url != url);
        self.media.len() != before
    }
}

fn validate_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    Ok(name.to_string())
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Event payload: a product's status moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStatusChanged {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub from: ProductStatus,
    pub to: ProductStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Serialized without a variant wrapper; the envelope carries the event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ProductEvent {
    Created {
        tenant_id: TenantId,
        product_id: ProductId,
        name: String,
        price: Money,
        occurred_at: DateTime<Utc>,
    },
    StatusChanged(ProductStatusChanged),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::Created { .. } => "catalog.product.created",
            ProductEvent::StatusChanged(_) => "catalog.product.status_changed",
        }
    }

    fn tenant_id(&self) -> TenantId {
        match self {
            ProductEvent::Created { tenant_id, .. } => *tenant_id,
            ProductEvent::StatusChanged(e) => e.tenant_id,
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::Created { occurred_at, .. } => *occurred_at,
            ProductEvent::StatusChanged(e) => e.occurred_at,
        }
    }
}

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use storecraft_core::{
    DomainError, DomainResult, Entity, Money, OrderId, ProductId, TenantId, VariantId,
};
use storecraft_events::Event;

use crate::status::{
    FulfillmentStatus, OrderStatus, PaymentMethod, PaymentStatus, TransitionEffects,
};

/// Buyer contact and delivery address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Customer {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl Customer {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("customer name is required"));
        }
        if self.email.is_none() && self.phone.is_none() {
            return Err(DomainError::validation(
                "customer needs an email or a phone number",
            ));
        }
        Ok(())
    }
}

/// Catalog details frozen at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSnapshot {
    pub product_name: String,
    pub variant_title: Option<String>,
    #[serde(default)]
    pub variant_attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: i64,
    pub unit_price: Money,
    pub snapshot: LineSnapshot,
}

impl LineItem {
    pub fn new(
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: i64,
        unit_price: Money,
        snapshot: LineSnapshot,
    ) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::validation(format!(
                "line quantity must be positive (got {quantity})"
            )));
        }
        if unit_price.minor() < 0 {
            return Err(DomainError::validation("line unit price cannot be negative"));
        }
        if unit_price.checked_mul(quantity).is_none() {
            return Err(DomainError::validation(format!(
                "line total for {quantity} × {unit_price} is out of range"
            )));
        }
        Ok(Self {
            product_id,
            variant_id,
            quantity,
            unit_price,
            snapshot,
        })
    }

    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

/// Pricing inputs that come from configuration rather than the cart.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PricingRules {
    /// Basis points applied to the discounted subtotal; 1800 = 18%.
    pub tax_rate_bps: u32,
    pub shipping_fee: Money,
    /// Shipping is free once the discounted subtotal reaches this amount.
    pub free_shipping_threshold: Option<Money>,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
}

impl OrderTotals {
    /// Computed once, at creation. The discount is capped at the subtotal.
    pub fn compute(items: &[LineItem], discount: Money, rules: PricingRules) -> DomainResult<Self> {
        let subtotal = Self::subtotal_of(items)?;
        let discount = if discount > subtotal {
            subtotal
        } else {
            discount.clamp_non_negative()
        };
        let taxable = subtotal - discount;
        let tax = bps_of(taxable, rules.tax_rate_bps)
            .ok_or_else(|| DomainError::validation("order tax is out of range"))?;
        let shipping = match rules.free_shipping_threshold {
            Some(threshold) if taxable >= threshold => Money::ZERO,
            _ => rules.shipping_fee.clamp_non_negative(),
        };
        let total = taxable
            .checked_add(tax)
            .and_then(|t| t.checked_add(shipping))
            .ok_or_else(|| DomainError::validation("order total is out of range"))?;
        Ok(Self {
            subtotal,
            discount,
            tax,
            shipping,
            total,
        })
    }

    /// Sum of line totals; an unrepresentable sum is a validation error.
    pub fn subtotal_of(items: &[LineItem]) -> DomainResult<Money> {
        Money::checked_sum(items.iter().map(LineItem::line_total))
            .ok_or_else(|| DomainError::validation("order subtotal is out of range"))
    }
}

fn bps_of(amount: Money, bps: u32) -> Option<Money> {
    let scaled = amount.minor() as i128 * bps as i128;
    i64::try_from((scaled + 5_000) / 10_000)
        .ok()
        .map(Money::from_minor)
}

/// `YYYYMM` bucket that order numbers are sequenced in.
pub fn order_period(at: DateTime<Utc>) -> String {
    format!("{:04}{:02}", at.year(), at.month())
}

/// `PREFIX-YYYYMM-#####`, e.g. `ORD-202610-00042`.
pub fn format_order_number(prefix: &str, at: DateTime<Utc>, sequence: u64) -> String {
    format!("{}-{}-{:05}", prefix.trim(), order_period(at), sequence)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tracking {
    pub carrier: Option<String>,
    pub number: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderNote {
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub tenant_id: TenantId,
    pub order_number: String,
    pub customer: Customer,
    pub items: Vec<LineItem>,
    #[serde(flatten)]
    pub totals: OrderTotals,
    pub status: OrderStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub payment_reference: Option<String>,
    pub tracking: Option<Tracking>,
    pub discount_code: Option<String>,
    pub notes: Vec<OrderNote>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything about a new order except the priced lines and totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDetails {
    pub order_number: String,
    pub customer: Customer,
    pub payment_method: PaymentMethod,
    pub payment_reference: Option<String>,
    pub discount_code: Option<String>,
    pub note: Option<String>,
}

impl Order {
    pub fn new(
        tenant_id: TenantId,
        details: OrderDetails,
        items: Vec<LineItem>,
        totals: OrderTotals,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if items.is_empty() {
            return Err(DomainError::validation("an order needs at least one line item"));
        }
        details.customer.validate()?;
        let notes = details
            .note
            .filter(|n| !n.trim().is_empty())
            .map(|text| OrderNote {
                text,
                created_at: now,
            })
            .into_iter()
            .collect();
        Ok(Self {
            id: OrderId::new(),
            tenant_id,
            order_number: details.order_number,
            customer: details.customer,
            items,
            totals,
            status: OrderStatus::Created,
            fulfillment_status: FulfillmentStatus::Unfulfilled,
            payment_method: details.payment_method,
            payment_status: PaymentStatus::Pending,
            payment_reference: details.payment_reference,
            tracking: None,
            discount_code: details.discount_code,
            notes,
            created_at: now,
            updated_at: now,
        })
    }

    /// Move to `target`, applying the derived fields. The caller persists the result
    /// with a compare-and-swap on the previous status and acts on `restock`.
    pub fn transition(
        &mut self,
        target: OrderStatus,
        tracking: Option<Tracking>,
        now: DateTime<Utc>,
    ) -> DomainResult<TransitionEffects> {
        let effects = self.status.transition_to(target)?;
        self.status = target;
        if let Some(f) = effects.fulfillment {
            self.fulfillment_status = f;
        }
        if let Some(p) = effects.payment {
            self.payment_status = p;
        }
        if effects.records_tracking {
            if let Some(t) = tracking {
                self.tracking = Some(t);
            }
        }
        self.updated_at = now;
        Ok(effects)
    }

    pub fn add_note(&mut self, text: &str, now: DateTime<Utc>) -> DomainResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DomainError::validation("note cannot be empty"));
        }
        self.notes.push(OrderNote {
            text: text.to_string(),
            created_at: now,
        });
        self.updated_at = now;
        Ok(())
    }

    /// `(variant, quantity)` for each line that tracks stock.
    pub fn stocked_lines(&self) -> impl Iterator<Item = (VariantId, i64)> + '_ {
        self.items
            .iter()
            .filter_map(|i| i.variant_id.map(|v| (v, i.quantity)))
    }

    pub fn references_product(&self, product_id: ProductId) -> bool {
        self.items.iter().any(|i| i.product_id == product_id)
    }

    pub fn references_variant(&self, variant_id: VariantId) -> bool {
        self.items.iter().any(|i| i.variant_id == Some(variant_id))
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> OrderId {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Aggregate figures over a set of orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub order_count: u64,
    /// Orders not cancelled, refunded or returned.
    pub revenue_order_count: u64,
    pub revenue: Money,
    pub discounts_given: Money,
    pub average_order_value: Money,
    pub by_status: BTreeMap<String, u64>,
}

impl SalesSummary {
    pub fn from_orders<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Self {
        let mut summary = SalesSummary::default();
        for order in orders {
            summary.order_count += 1;
            *summary
                .by_status
                .entry(order.status.as_str().to_string())
                .or_default() += 1;
            if order.status.is_revenue() {
                summary.revenue_order_count += 1;
                summary.revenue += order.totals.total;
                summary.discounts_given += order.totals.discount;
            }
        }
        if summary.revenue_order_count > 0 {
            let avg = summary.revenue.minor() / summary.revenue_order_count as i64;
            summary.average_order_value = Money::from_minor(avg);
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub order_number: String,
    pub total: Money,
    pub item_count: usize,
    pub payment_method: PaymentMethod,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusChanged {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub order_number: String,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Serialized without a variant wrapper; the envelope carries the event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OrderEvent {
    Created(OrderCreated),
    StatusChanged(OrderStatusChanged),
}

impl OrderEvent {
    pub fn created(order: &Order) -> Self {
        OrderEvent::Created(OrderCreated {
            tenant_id: order.tenant_id,
            order_id: order.id,
            order_number: order.order_number.clone(),
            total: order.totals.total,
            item_count: order.items.len(),
            payment_method: order.payment_method,
            occurred_at: order.created_at,
        })
    }

    pub fn status_changed(order: &Order, from: OrderStatus) -> Self {
        OrderEvent::StatusChanged(OrderStatusChanged {
            tenant_id: order.tenant_id,
            order_id: order.id,
            order_number: order.order_number.clone(),
            from,
            to: order.status,
            fulfillment_status: order.fulfillment_status,
            occurred_at: order.updated_at,
        })
    }
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::Created(_) => "sales.order.created",
            OrderEvent::StatusChanged(_) => "sales.order.status_changed",
        }
    }

    fn tenant_id(&self) -> TenantId {
        match self {
            OrderEvent::Created(e) => e.tenant_id,
            OrderEvent::StatusChanged(e) => e.tenant_id,
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::Created(e) => e.occurred_at,
            OrderEvent::StatusChanged(e) => e.occurred_at,
        }
    }
}

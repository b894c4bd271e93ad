//! Order creation and lifecycle, backed by the store and the inventory ledger.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use storecraft_catalog::ProductStatus;
use storecraft_core::{DomainError, DomainResult, Money, OrderId, ProductId, TenantId, VariantId};
use storecraft_discounts::{DiscountLine, calculate_line_discount, normalize_code};
use storecraft_sales::{
    Customer, LineItem, LineSnapshot, Order, OrderDetails, OrderEvent, OrderNote, OrderStatus,
    OrderTotals, PaymentMethod, Tracking, format_order_number, order_period,
};

use crate::config::EngineConfig;
use crate::ledger::InventoryLedger;
use crate::publisher::EventPublisher;
use crate::store::CommerceStore;

/// One requested cart line. Prices are never taken from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub customer: Customer,
    pub items: Vec<OrderLineRequest>,
    #[serde(default = "default_payment_method")]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_reference: Option<String>,
    #[serde(default)]
    pub discount_code: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

fn default_payment_method() -> PaymentMethod {
    PaymentMethod::Prepaid
}

pub struct OrderService<S: ?Sized> {
    store: Arc<S>,
    ledger: InventoryLedger<S>,
    publisher: EventPublisher,
    config: EngineConfig,
}

impl<S> OrderService<S>
where
    S: CommerceStore + ?Sized,
{
    pub fn new(
        store: Arc<S>,
        ledger: InventoryLedger<S>,
        publisher: EventPublisher,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            publisher,
            config,
        }
    }

    /// Price, number and persist a new order, then consume stock and redeem the code.
    ///
    /// Once the order row exists, per-line stock commits and the discount increment are
    /// best effort: a failure is logged and the order is still returned.
    #[instrument(skip(self, request), fields(tenant_id = %tenant_id, lines = request.items.len()), err)]
    pub async fn create(&self, tenant_id: TenantId, request: NewOrder) -> DomainResult<Order> {
        if request.items.is_empty() {
            return Err(DomainError::validation("an order needs at least one line item"));
        }
        request.customer.validate()?;

        let mut items = Vec::with_capacity(request.items.len());
        for line in &request.items {
            items.push(self.price_line(tenant_id, line).await?);
        }

        let now = Utc::now();
        let (discount, discount_amount) = match request.discount_code.as_deref() {
            Some(code) if !code.trim().is_empty() => {
                let code = normalize_code(code);
                let discount = self
                    .store
                    .find_discount_by_code(tenant_id, &code)
                    .await?
                    .ok_or_else(|| DomainError::validation(format!("unknown discount code {code}")))?;
                let lines: Vec<DiscountLine> = items
                    .iter()
                    .map(|i: &LineItem| DiscountLine {
                        unit_price: i.unit_price,
                        quantity: i.quantity,
                    })
                    .collect();
                let subtotal = OrderTotals::subtotal_of(&items)?;
                match discount.eligibility(subtotal, now) {
                    Ok(()) => {
                        let amount = calculate_line_discount(&discount, &lines, now);
                        (Some(discount), amount)
                    }
                    Err(reason) => {
                        info!(code = %code, ?reason, "discount code not applicable; ignoring");
                        (None, Money::ZERO)
                    }
                }
            }
            _ => (None, Money::ZERO),
        };

        let totals = OrderTotals::compute(&items, discount_amount, self.config.pricing_rules())?;
        let order_number = self.next_order_number(tenant_id, now).await?;
        let details = OrderDetails {
            order_number,
            customer: request.customer,
            payment_method: request.payment_method,
            payment_reference: request.payment_reference,
            discount_code: discount.as_ref().map(|d| d.code.clone()),
            note: request.note,
        };
        let order = Order::new(tenant_id, details, items, totals, now)?;
        self.store.insert_order(&order).await?;

        for (variant_id, qty) in order.stocked_lines() {
            if let Err(err) = self.ledger.commit(tenant_id, variant_id, qty).await {
                warn!(
                    order_number = %order.order_number,
                    variant_id = %variant_id,
                    quantity = qty,
                    error = %err,
                    "failed to commit stock for order line"
                );
            }
        }

        if let Some(discount) = &discount {
            match self.store.increment_discount_usage(tenant_id, discount.id).await {
                Ok(true) => {}
                Ok(false) => warn!(code = %discount.code, "discount usage limit reached during redemption"),
                Err(err) => warn!(code = %discount.code, error = %err, "failed to record discount usage"),
            }
        }

        self.publisher.publish(&OrderEvent::created(&order));
        Ok(order)
    }

    async fn price_line(&self, tenant_id: TenantId, line: &OrderLineRequest) -> DomainResult<LineItem> {
        if line.quantity <= 0 {
            return Err(DomainError::validation(format!(
                "line quantity must be positive (got {})",
                line.quantity
            )));
        }
        let product = self
            .store
            .get_product(tenant_id, line.product_id)
            .await?
            .ok_or_else(|| DomainError::not_found("product", line.product_id))?;
        if product.status != ProductStatus::Active {
            return Err(DomainError::validation(format!(
                "product {} is {} and cannot be ordered",
                product.name,
                product.status.as_str()
            )));
        }

        let Some(variant_id) = line.variant_id else {
            return LineItem::new(
                product.id,
                None,
                line.quantity,
                product.price,
                LineSnapshot {
                    product_name: product.name,
                    variant_title: None,
                    variant_attributes: Default::default(),
                },
            );
        };

        let variant = self
            .store
            .get_variant(tenant_id, variant_id)
            .await?
            .filter(|v| v.product_id == product.id)
            .ok_or_else(|| DomainError::not_found("variant", variant_id))?;
        if variant.stock() < line.quantity {
            return Err(DomainError::insufficient_stock(
                variant_id,
                line.quantity,
                variant.stock(),
            ));
        }
        LineItem::new(
            product.id,
            Some(variant_id),
            line.quantity,
            variant.unit_price(product.price),
            LineSnapshot {
                product_name: product.name,
                variant_title: Some(variant.title()).filter(|t| !t.is_empty()),
                variant_attributes: variant.attributes,
            },
        )
    }

    async fn next_order_number(
        &self,
        tenant_id: TenantId,
        now: chrono::DateTime<Utc>,
    ) -> DomainResult<String> {
        let prefix = self
            .store
            .get_store_config(tenant_id)
            .await?
            .map(|c| c.identity.order_prefix)
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| self.config.default_order_prefix.clone());
        let sequence = self
            .store
            .next_order_sequence(tenant_id, &order_period(now))
            .await?;
        Ok(format_order_number(&prefix, now, sequence))
    }

    /// Move an order through the state machine.
    ///
    /// The status write is a compare-and-swap on the status that was read; losing the
    /// race surfaces as `Conflict`. Restocking on `cancelled`/`rto` is best effort per line.
    #[instrument(skip(self, tracking), fields(tenant_id = %tenant_id, order_id = %order_id, target = %target), err)]
    pub async fn transition(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
        target: OrderStatus,
        tracking: Option<Tracking>,
    ) -> DomainResult<Order> {
        let mut order = self.get(tenant_id, order_id).await?;
        let from = order.status;
        let effects = order.transition(target, tracking, Utc::now())?;

        if !self.store.update_order_status(&order, from).await? {
            return Err(DomainError::Conflict(format!(
                "order {} changed status concurrently",
                order.order_number
            )));
        }

        if effects.restock {
            for (variant_id, qty) in order.stocked_lines() {
                if let Err(err) = self.ledger.adjust(tenant_id, variant_id, qty).await {
                    warn!(
                        order_number = %order.order_number,
                        variant_id = %variant_id,
                        quantity = qty,
                        error = %err,
                        "failed to restock order line"
                    );
                }
            }
        }

        self.publisher.publish(&OrderEvent::status_changed(&order, from));
        Ok(order)
    }

    /// Append-only; the status is untouched.
    pub async fn add_note(&self, tenant_id: TenantId, order_id: OrderId, text: &str) -> DomainResult<Order> {
        let mut order = self.get(tenant_id, order_id).await?;
        let now = Utc::now();
        order.add_note(text, now)?;
        let note = OrderNote {
            text: text.trim().to_string(),
            created_at: now,
        };
        self.store.append_order_note(tenant_id, order_id, &note).await?;
        Ok(order)
    }

    pub async fn get(&self, tenant_id: TenantId, order_id: OrderId) -> DomainResult<Order> {
        self.store
            .get_order(tenant_id, order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("order", order_id))
    }
}

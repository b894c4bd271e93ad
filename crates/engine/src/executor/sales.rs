use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::warn;

use storecraft_core::{DomainError, DomainResult, TenantId};
use storecraft_discounts::{Discount, normalize_code};
use storecraft_sales::OrderStatus;

use super::to_data;
use crate::action::Action;
use crate::engine::Engine;
use crate::payload::{CreateDiscount, DiscountRef, OrderRef, ShipOrder, UpdateDiscount};

impl Engine {
    /// Fixed-target transitions. A `reason` is recorded as a note once the move succeeds.
    pub(crate) async fn move_order(
        &self,
        tenant_id: TenantId,
        action: &Action,
        p: &OrderRef,
    ) -> DomainResult<JsonValue> {
        let Some((order_id, target)) = action.order_transition() else {
            return Err(DomainError::validation(format!(
                "{} does not change an order status",
                action.kind()
            )));
        };
        let mut order = self.orders.transition(tenant_id, order_id, target, None).await?;
        if let Some(reason) = p.reason.as_deref().filter(|r| !r.trim().is_empty()) {
            match self.orders.add_note(tenant_id, order_id, reason).await {
                Ok(noted) => order = noted,
                Err(err) => warn!(
                    order_number = %order.order_number,
                    error = %err,
                    "failed to record transition reason"
                ),
            }
        }
        to_data(&order)
    }

    pub(crate) async fn ship_order(&self, tenant_id: TenantId, p: &ShipOrder) -> DomainResult<JsonValue> {
        let order = self
            .orders
            .transition(tenant_id, p.order_id, OrderStatus::Shipped, p.tracking())
            .await?;
        to_data(&order)
    }

    pub(crate) async fn create_discount(&self, tenant_id: TenantId, p: &CreateDiscount) -> DomainResult<JsonValue> {
        let discount = Discount::new(
            tenant_id,
            &p.code,
            p.discount_type,
            p.value,
            p.min_order_value,
            p.max_discount,
            p.usage_limit,
            p.starts_at,
            p.ends_at,
            Utc::now(),
        )?;
        self.store.insert_discount(&discount).await?;
        to_data(&discount)
    }

    pub(crate) async fn update_discount(&self, tenant_id: TenantId, p: &UpdateDiscount) -> DomainResult<JsonValue> {
        let current = self
            .store
            .get_discount(tenant_id, p.discount_id)
            .await?
            .ok_or_else(|| DomainError::not_found("discount", p.discount_id))?;
        let next = p.patch.apply_to(&current, Utc::now())?;
        self.store.update_discount(&next).await?;
        to_data(&next)
    }

    pub(crate) async fn set_discount_active(
        &self,
        tenant_id: TenantId,
        p: &DiscountRef,
        active: bool,
    ) -> DomainResult<JsonValue> {
        let mut discount = self.resolve_discount(tenant_id, p).await?;
        if discount.active != active {
            discount.active = active;
            discount.updated_at = Utc::now();
            self.store.update_discount(&discount).await?;
        }
        to_data(&discount)
    }

    async fn resolve_discount(&self, tenant_id: TenantId, p: &DiscountRef) -> DomainResult<Discount> {
        match (p.discount_id, p.code.as_deref()) {
            (Some(id), _) => self
                .store
                .get_discount(tenant_id, id)
                .await?
                .ok_or_else(|| DomainError::not_found("discount", id)),
            (None, Some(code)) => {
                let code = normalize_code(code);
                self.store
                    .find_discount_by_code(tenant_id, &code)
                    .await?
                    .ok_or_else(|| DomainError::not_found("discount", code))
            }
            (None, None) => Err(DomainError::validation("give a discountId or a code")),
        }
    }
}

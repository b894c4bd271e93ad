//! Read-only actions. They return data and never mutate.

use serde_json::{Value as JsonValue, json};

use storecraft_core::{DomainError, DomainResult, TenantId};
use storecraft_infra::{OrderFilter, ProductFilter};
use storecraft_sales::SalesSummary;

use super::to_data;
use crate::engine::Engine;
use crate::payload::{ProductRef, QueryLowStock, QueryOrder, QueryOrders, QueryProducts, QuerySalesSummary};

impl Engine {
    pub(crate) async fn query_products(&self, tenant_id: TenantId, p: &QueryProducts) -> DomainResult<JsonValue> {
        let filter = ProductFilter {
            status: p.status,
            category_id: p.category_id,
            collection_id: p.collection_id,
            tag: p.tag.as_deref().map(|t| t.trim().to_lowercase()),
            limit: p.limit,
        };
        to_data(&self.store.list_products(tenant_id, &filter).await?)
    }

    pub(crate) async fn query_product(&self, tenant_id: TenantId, p: &ProductRef) -> DomainResult<JsonValue> {
        let product = self.require_product(tenant_id, p.product_id).await?;
        let variants = self.store.list_variants(tenant_id, product.id).await?;
        Ok(json!({ "product": to_data(&product)?, "variants": to_data(&variants)? }))
    }

    pub(crate) async fn query_orders(&self, tenant_id: TenantId, p: &QueryOrders) -> DomainResult<JsonValue> {
        let filter = OrderFilter {
            status: p.status,
            limit: p.limit,
        };
        to_data(&self.store.list_orders(tenant_id, &filter).await?)
    }

    pub(crate) async fn query_order(&self, tenant_id: TenantId, p: &QueryOrder) -> DomainResult<JsonValue> {
        let order = match (p.order_id, p.order_number.as_deref()) {
            (Some(id), _) => self.orders.get(tenant_id, id).await?,
            (None, Some(number)) => {
                let number = number.trim();
                self.store
                    .find_order_by_number(tenant_id, number)
                    .await?
                    .ok_or_else(|| DomainError::not_found("order", number))?
            }
            (None, None) => return Err(DomainError::validation("give an orderId or an orderNumber")),
        };
        to_data(&order)
    }

    pub(crate) async fn query_low_stock(&self, tenant_id: TenantId, p: &QueryLowStock) -> DomainResult<JsonValue> {
        let (threshold, variants) = match p.threshold {
            None => (
                self.ledger.low_stock_threshold(),
                self.ledger.low_stock(tenant_id).await?,
            ),
            Some(t) if t < 0 => {
                return Err(DomainError::validation("threshold cannot be negative"));
            }
            Some(t) => (t, self.store.list_low_stock(tenant_id, t).await?),
        };
        Ok(json!({ "threshold": threshold, "variants": to_data(&variants)? }))
    }

    /// Summary over orders created in `[since, until)`.
    pub(crate) async fn query_sales_summary(
        &self,
        tenant_id: TenantId,
        p: &QuerySalesSummary,
    ) -> DomainResult<JsonValue> {
        if let (Some(since), Some(until)) = (p.since, p.until) {
            if until <= since {
                return Err(DomainError::validation("until must be after since"));
            }
        }
        let orders = self
            .store
            .list_orders(tenant_id, &OrderFilter::default())
            .await?;
        let summary = SalesSummary::from_orders(orders.iter().filter(|o| {
            p.since.is_none_or(|since| o.created_at >= since)
                && p.until.is_none_or(|until| o.created_at < until)
        }));
        to_data(&summary)
    }
}

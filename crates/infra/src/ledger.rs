//! Store-backed inventory ledger.
//!
//! Every operation is read → pure arithmetic ([`StockOp::apply`]) → compare-and-swap.
//! A lost race re-reads and replays the operation against the fresh level, up to
//! `cas_retries` times.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument};

use storecraft_core::{DomainError, DomainResult, TenantId, VariantId};
use storecraft_inventory::{StockAlert, StockAlertRaised, StockEvent, StockLevel, StockOp, Variant};

use crate::config::EngineConfig;
use crate::publisher::EventPublisher;
use crate::store::VariantStore;

pub struct InventoryLedger<S: ?Sized> {
    store: Arc<S>,
    publisher: EventPublisher,
    low_stock_threshold: i64,
    cas_retries: u32,
}

impl<S: ?Sized> Clone for InventoryLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            publisher: self.publisher.clone(),
            low_stock_threshold: self.low_stock_threshold,
            cas_retries: self.cas_retries,
        }
    }
}

impl<S> InventoryLedger<S>
where
    S: VariantStore + ?Sized,
{
    pub fn new(store: Arc<S>, publisher: EventPublisher, config: &EngineConfig) -> Self {
        Self {
            store,
            publisher,
            low_stock_threshold: config.low_stock_threshold,
            cas_retries: config.cas_retries.max(1),
        }
    }

    pub fn low_stock_threshold(&self) -> i64 {
        self.low_stock_threshold
    }

    /// `stock += delta`. Fails if stock would go negative or below `reserved`.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, variant_id = %variant_id), err)]
    pub async fn adjust(
        &self,
        tenant_id: TenantId,
        variant_id: VariantId,
        delta: i64,
    ) -> DomainResult<Variant> {
        if delta == 0 {
            return Err(DomainError::validation("stock adjustment cannot be zero"));
        }
        self.apply(tenant_id, variant_id, StockOp::Adjust(delta)).await
    }

    /// Absolute set, applied as an adjustment under the same atomic write.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, variant_id = %variant_id), err)]
    pub async fn set(
        &self,
        tenant_id: TenantId,
        variant_id: VariantId,
        quantity: i64,
    ) -> DomainResult<Variant> {
        self.apply(tenant_id, variant_id, StockOp::Set(quantity)).await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, variant_id = %variant_id), err)]
    pub async fn reserve(
        &self,
        tenant_id: TenantId,
        variant_id: VariantId,
        qty: i64,
    ) -> DomainResult<Variant> {
        self.apply(tenant_id, variant_id, StockOp::Reserve(qty)).await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, variant_id = %variant_id), err)]
    pub async fn release(
        &self,
        tenant_id: TenantId,
        variant_id: VariantId,
        qty: i64,
    ) -> DomainResult<Variant> {
        self.apply(tenant_id, variant_id, StockOp::Release(qty)).await
    }

    /// Permanently consume `qty` units, drawing down any reservation first.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, variant_id = %variant_id), err)]
    pub async fn commit(
        &self,
        tenant_id: TenantId,
        variant_id: VariantId,
        qty: i64,
    ) -> DomainResult<Variant> {
        self.apply(tenant_id, variant_id, StockOp::Commit(qty)).await
    }

    /// Variants at or below the configured low-stock threshold.
    pub async fn low_stock(&self, tenant_id: TenantId) -> DomainResult<Vec<Variant>> {
        Ok(self
            .store
            .list_low_stock(tenant_id, self.low_stock_threshold)
            .await?)
    }

    async fn apply(
        &self,
        tenant_id: TenantId,
        variant_id: VariantId,
        op: StockOp,
    ) -> DomainResult<Variant> {
        for attempt in 1..=self.cas_retries {
            let mut variant = self
                .store
                .get_variant(tenant_id, variant_id)
                .await?
                .ok_or_else(|| DomainError::not_found("variant", variant_id))?;
            let before = variant.level;
            let after = op.apply(before).map_err(|e| e.into_domain(variant_id))?;
            if after == before {
                return Ok(variant);
            }
            if self
                .store
                .compare_and_swap_stock(tenant_id, variant_id, before, after)
                .await?
            {
                variant.level = after;
                variant.updated_at = Utc::now();
                self.raise_alert(&variant, before, after);
                return Ok(variant);
            }
            debug!(attempt, op = op.name(), "stock write lost a race; retrying");
        }
        Err(DomainError::Conflict(format!(
            "stock {} on variant {variant_id} kept conflicting after {} attempts",
            op.name(),
            self.cas_retries
        )))
    }

    fn raise_alert(&self, variant: &Variant, before: StockLevel, after: StockLevel) {
        let Some(alert) = StockAlert::detect(before, after, self.low_stock_threshold) else {
            return;
        };
        let raised = StockAlertRaised {
            tenant_id: variant.tenant_id,
            variant_id: variant.id,
            product_id: variant.product_id,
            stock: after.stock(),
            reserved: after.reserved(),
            available: after.available(),
            threshold: self.low_stock_threshold,
            occurred_at: variant.updated_at,
        };
        self.publisher.publish(&StockEvent::from_alert(alert, raised));
    }
}

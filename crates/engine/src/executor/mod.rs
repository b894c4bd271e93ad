//! Action handlers. Every handler takes the tenant id explicitly and re-reads what it
//! mutates from the store.

mod catalog;
mod design;
mod query;
mod sales;

use serde::Serialize;
use serde_json::Value as JsonValue;

use storecraft_catalog::{Product, ProductStatus};
use storecraft_core::{DomainError, DomainResult, ProductId, TenantId, VariantId};
use storecraft_design::StoreConfig;
use storecraft_inventory::Variant;

use crate::action::Action;
use crate::engine::Engine;

pub(crate) fn to_data<T: Serialize + ?Sized>(value: &T) -> DomainResult<JsonValue> {
    serde_json::to_value(value)
        .map_err(|e| DomainError::Persistence(format!("cannot encode result: {e}")))
}

impl Engine {
    /// Dispatch one structurally valid, validated action.
    pub async fn execute(&self, tenant_id: TenantId, action: &Action) -> DomainResult<JsonValue> {
        match action {
            Action::StoreUpdateSettings(p) => self.update_settings(tenant_id, p).await,
            Action::StoreUpdateLogo(p) => self.update_logo(tenant_id, p).await,
            Action::DesignUpdatePalette(p) => self.update_palette(tenant_id, p).await,
            Action::DesignUpdateFonts(p) => self.update_fonts(tenant_id, p).await,
            Action::DesignUpdateHero(p) => self.update_hero(tenant_id, p).await,
            Action::DesignUpdateNav(p) => self.update_nav(tenant_id, p).await,
            Action::DesignUpdateFooter(p) => self.update_footer(tenant_id, p).await,
            Action::DesignReset(_) => self.reset_design(tenant_id).await,

            Action::SectionAdd(p) => self.add_section(tenant_id, p).await,
            Action::SectionUpdate(p) => self.update_section(tenant_id, p).await,
            Action::SectionRemove(p) => self.remove_section(tenant_id, p).await,
            Action::SectionReorder(p) => self.reorder_sections(tenant_id, p).await,
            Action::SectionToggle(p) => self.toggle_section(tenant_id, p).await,

            Action::ProductCreate(p) => self.create_product(tenant_id, p).await,
            Action::ProductUpdate(p) => self.update_product(tenant_id, p).await,
            Action::ProductUpdatePrice(p) => self.update_price(tenant_id, p).await,
            Action::ProductBulkUpdatePrice(p) => self.bulk_update_price(tenant_id, p).await,
            Action::ProductPublish(p) => {
                self.set_product_status(tenant_id, p, ProductStatus::Active).await
            }
            Action::ProductUnpublish(p) => {
                self.set_product_status(tenant_id, p, ProductStatus::Draft).await
            }
            Action::ProductArchive(p) => {
                self.set_product_status(tenant_id, p, ProductStatus::Archived).await
            }
            Action::ProductDelete(p) => self.delete_product(tenant_id, p).await,
            Action::ProductDuplicate(p) => self.duplicate_product(tenant_id, p).await,

            Action::VariantCreate(p) => self.create_variant(tenant_id, p).await,
            Action::VariantUpdate(p) => self.update_variant(tenant_id, p).await,
            Action::VariantDelete(p) => self.delete_variant(tenant_id, p).await,
            Action::StockUpdate(p) => {
                to_data(&self.ledger.set(tenant_id, p.variant_id, p.quantity).await?)
            }
            Action::StockAdjust(p) => {
                to_data(&self.ledger.adjust(tenant_id, p.variant_id, p.delta).await?)
            }
            Action::StockReserve(p) => {
                to_data(&self.ledger.reserve(tenant_id, p.variant_id, p.quantity).await?)
            }
            Action::StockRelease(p) => {
                to_data(&self.ledger.release(tenant_id, p.variant_id, p.quantity).await?)
            }

            Action::CategoryCreate(p) => self.create_category(tenant_id, p).await,
            Action::CategoryUpdate(p) => self.update_category(tenant_id, p).await,
            Action::CategoryDelete(p) => self.delete_category(tenant_id, p).await,
            Action::CategoryAssignProducts(p) => self.assign_category(tenant_id, p, true).await,
            Action::CategoryRemoveProducts(p) => self.assign_category(tenant_id, p, false).await,

            Action::CollectionCreate(p) => self.create_collection(tenant_id, p).await,
            Action::CollectionUpdate(p) => self.update_collection(tenant_id, p).await,
            Action::CollectionDelete(p) => self.delete_collection(tenant_id, p).await,
            Action::CollectionAddProducts(p) => self.assign_collection(tenant_id, p, true).await,
            Action::CollectionRemoveProducts(p) => {
                self.assign_collection(tenant_id, p, false).await
            }

            Action::OrderCreate(p) => to_data(&self.orders.create(tenant_id, p.clone()).await?),
            Action::OrderUpdateStatus(p) => {
                let order = self
                    .orders
                    .transition(tenant_id, p.order_id, p.status, p.tracking.clone())
                    .await?;
                to_data(&order)
            }
            Action::OrderConfirmCod(p)
            | Action::OrderMarkPaid(p)
            | Action::OrderMarkDelivered(p)
            | Action::OrderCancel(p)
            | Action::OrderRefund(p) => self.move_order(tenant_id, action, p).await,
            Action::OrderShip(p) => self.ship_order(tenant_id, p).await,
            Action::OrderAddNote(p) => {
                to_data(&self.orders.add_note(tenant_id, p.order_id, &p.note).await?)
            }

            Action::DiscountCreate(p) => self.create_discount(tenant_id, p).await,
            Action::DiscountUpdate(p) => self.update_discount(tenant_id, p).await,
            Action::DiscountActivate(p) => self.set_discount_active(tenant_id, p, true).await,
            Action::DiscountDeactivate(p) => self.set_discount_active(tenant_id, p, false).await,

            Action::MediaAttach(p) => self.attach_media(tenant_id, p).await,
            Action::MediaDetach(p) => self.detach_media(tenant_id, p).await,
            Action::MediaSetHeroImage(p) => self.set_hero_image(tenant_id, p).await,

            Action::QueryProducts(p) => self.query_products(tenant_id, p).await,
            Action::QueryProduct(p) => self.query_product(tenant_id, p).await,
            Action::QueryOrders(p) => self.query_orders(tenant_id, p).await,
            Action::QueryOrder(p) => self.query_order(tenant_id, p).await,
            Action::QueryLowStock(p) => self.query_low_stock(tenant_id, p).await,
            Action::QueryDiscounts(_) => to_data(&self.store.list_discounts(tenant_id).await?),
            Action::QueryCategories(_) => to_data(&self.store.list_categories(tenant_id).await?),
            Action::QueryCollections(_) => to_data(&self.store.list_collections(tenant_id).await?),
            Action::QuerySalesSummary(p) => self.query_sales_summary(tenant_id, p).await,
            Action::QueryStoreConfig(_) => to_data(&self.load_config(tenant_id).await?),
        }
    }

    /// The tenant's stored config, or defaults for a tenant that never saved one.
    pub(crate) async fn load_config(&self, tenant_id: TenantId) -> DomainResult<StoreConfig> {
        Ok(self
            .store
            .get_store_config(tenant_id)
            .await?
            .unwrap_or_default())
    }

    pub(crate) async fn save_config(&self, tenant_id: TenantId, config: &StoreConfig) -> DomainResult<()> {
        Ok(self.store.put_store_config(tenant_id, config).await?)
    }

    pub(crate) async fn require_product(&self, tenant_id: TenantId, id: ProductId) -> DomainResult<Product> {
        self.store
            .get_product(tenant_id, id)
            .await?
            .ok_or_else(|| DomainError::not_found("product", id))
    }

    pub(crate) async fn require_variant(&self, tenant_id: TenantId, id: VariantId) -> DomainResult<Variant> {
        self.store
            .get_variant(tenant_id, id)
            .await?
            .ok_or_else(|| DomainError::not_found("variant", id))
    }
}

//! Tenant-scoped persistence abstractions.
//!
//! Every operation takes the tenant id explicitly; no implementation may read or
//! write a row belonging to another tenant.

pub mod in_memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use storecraft_catalog::{Category, Collection, Product, ProductStatus};
use storecraft_core::{
    CategoryId, CollectionId, DiscountId, DomainError, OrderId, ProductId, TenantId, VariantId,
};
use storecraft_design::StoreConfig;
use storecraft_discounts::Discount;
use storecraft_inventory::{StockLevel, Variant};
use storecraft_sales::{Order, OrderNote, OrderStatus};

pub use in_memory::InMemoryCommerceStore;
pub use postgres::PostgresCommerceStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A uniqueness rule was violated (e.g. a duplicate discount code).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored document could not be (de)serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("store backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => DomainError::NotFound { entity, id },
            StoreError::Conflict(msg) => DomainError::Conflict(msg),
            other => DomainError::Persistence(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Product listing filter. All conditions are conjunctive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub status: Option<ProductStatus>,
    pub category_id: Option<CategoryId>,
    pub collection_id: Option<CollectionId>,
    pub tag: Option<String>,
    pub limit: Option<usize>,
}

/// Order listing filter; newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub limit: Option<usize>,
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert_product(&self, product: &Product) -> StoreResult<()>;
    async fn get_product(&self, tenant_id: TenantId, id: ProductId) -> StoreResult<Option<Product>>;
    /// Replace an existing product; `NotFound` if absent.
    async fn update_product(&self, product: &Product) -> StoreResult<()>;
    /// Removes the product, its variants and its category/collection memberships.
    async fn delete_product(&self, tenant_id: TenantId, id: ProductId) -> StoreResult<bool>;
    async fn list_products(
        &self,
        tenant_id: TenantId,
        filter: &ProductFilter,
    ) -> StoreResult<Vec<Product>>;
}

#[async_trait]
pub trait VariantStore: Send + Sync {
    async fn insert_variant(&self, variant: &Variant) -> StoreResult<()>;
    async fn get_variant(&self, tenant_id: TenantId, id: VariantId) -> StoreResult<Option<Variant>>;
    /// Write descriptive fields (attributes, sku, price override). Stock is untouched.
    async fn update_variant(&self, variant: &Variant) -> StoreResult<()>;
    async fn delete_variant(&self, tenant_id: TenantId, id: VariantId) -> StoreResult<bool>;
    async fn list_variants(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> StoreResult<Vec<Variant>>;
    /// Variants whose available quantity is at or below `threshold`.
    async fn list_low_stock(&self, tenant_id: TenantId, threshold: i64) -> StoreResult<Vec<Variant>>;
    /// Write `new` only if the stored level still equals `expected`.
    ///
    /// Returns `false` when another writer got there first.
    async fn compare_and_swap_stock(
        &self,
        tenant_id: TenantId,
        id: VariantId,
        expected: StockLevel,
        new: StockLevel,
    ) -> StoreResult<bool>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert_order(&self, order: &Order) -> StoreResult<()>;
    async fn get_order(&self, tenant_id: TenantId, id: OrderId) -> StoreResult<Option<Order>>;
    async fn find_order_by_number(
        &self,
        tenant_id: TenantId,
        order_number: &str,
    ) -> StoreResult<Option<Order>>;
    async fn list_orders(&self, tenant_id: TenantId, filter: &OrderFilter) -> StoreResult<Vec<Order>>;
    /// Persist a transitioned order if its stored status still equals `expected`.
    ///
    /// Writes status, fulfillment status, payment status, tracking and `updated_at`.
    async fn update_order_status(&self, order: &Order, expected: OrderStatus) -> StoreResult<bool>;
    async fn append_order_note(
        &self,
        tenant_id: TenantId,
        id: OrderId,
        note: &OrderNote,
    ) -> StoreResult<()>;
    /// Next value of the tenant's sequence for `period` (`YYYYMM`), starting at 1.
    async fn next_order_sequence(&self, tenant_id: TenantId, period: &str) -> StoreResult<u64>;
    async fn product_has_orders(&self, tenant_id: TenantId, id: ProductId) -> StoreResult<bool>;
    async fn variant_has_orders(&self, tenant_id: TenantId, id: VariantId) -> StoreResult<bool>;
}

#[async_trait]
pub trait DiscountStore: Send + Sync {
    /// `Conflict` if the code is already taken in this tenant.
    async fn insert_discount(&self, discount: &Discount) -> StoreResult<()>;
    async fn get_discount(&self, tenant_id: TenantId, id: DiscountId) -> StoreResult<Option<Discount>>;
    /// `code` must already be normalized.
    async fn find_discount_by_code(
        &self,
        tenant_id: TenantId,
        code: &str,
    ) -> StoreResult<Option<Discount>>;
    /// Replace everything except `used_count`.
    async fn update_discount(&self, discount: &Discount) -> StoreResult<()>;
    async fn list_discounts(&self, tenant_id: TenantId) -> StoreResult<Vec<Discount>>;
    /// Atomically add one use. Returns `false` if the usage limit is already reached.
    async fn increment_discount_usage(&self, tenant_id: TenantId, id: DiscountId) -> StoreResult<bool>;
}

#[async_trait]
pub trait TaxonomyStore: Send + Sync {
    async fn insert_category(&self, category: &Category) -> StoreResult<()>;
    async fn get_category(&self, tenant_id: TenantId, id: CategoryId) -> StoreResult<Option<Category>>;
    async fn update_category(&self, category: &Category) -> StoreResult<()>;
    /// Also drops memberships and detaches child categories.
    async fn delete_category(&self, tenant_id: TenantId, id: CategoryId) -> StoreResult<bool>;
    async fn list_categories(&self, tenant_id: TenantId) -> StoreResult<Vec<Category>>;
    /// Returns how many memberships were newly created.
    async fn assign_products_to_category(
        &self,
        tenant_id: TenantId,
        id: CategoryId,
        products: &[ProductId],
    ) -> StoreResult<usize>;
    async fn remove_products_from_category(
        &self,
        tenant_id: TenantId,
        id: CategoryId,
        products: &[ProductId],
    ) -> StoreResult<usize>;

    async fn insert_collection(&self, collection: &Collection) -> StoreResult<()>;
    async fn get_collection(
        &self,
        tenant_id: TenantId,
        id: CollectionId,
    ) -> StoreResult<Option<Collection>>;
    async fn update_collection(&self, collection: &Collection) -> StoreResult<()>;
    async fn delete_collection(&self, tenant_id: TenantId, id: CollectionId) -> StoreResult<bool>;
    async fn list_collections(&self, tenant_id: TenantId) -> StoreResult<Vec<Collection>>;
    async fn add_products_to_collection(
        &self,
        tenant_id: TenantId,
        id: CollectionId,
        products: &[ProductId],
    ) -> StoreResult<usize>;
    async fn remove_products_from_collection(
        &self,
        tenant_id: TenantId,
        id: CollectionId,
        products: &[ProductId],
    ) -> StoreResult<usize>;
}

#[async_trait]
pub trait StoreConfigStore: Send + Sync {
    async fn get_store_config(&self, tenant_id: TenantId) -> StoreResult<Option<StoreConfig>>;
    async fn put_store_config(&self, tenant_id: TenantId, config: &StoreConfig) -> StoreResult<()>;
}

/// Everything the engine needs from persistence.
pub trait CommerceStore:
    ProductStore + VariantStore + OrderStore + DiscountStore + TaxonomyStore + StoreConfigStore
{
}

impl<T> CommerceStore for T where
    T: ProductStore
        + VariantStore
        + OrderStore
        + DiscountStore
        + TaxonomyStore
        + StoreConfigStore
        + ?Sized
{
}

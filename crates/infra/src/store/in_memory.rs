//! In-memory tenant-isolated commerce store for tests/dev.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use storecraft_catalog::{Category, Collection, Product};
use storecraft_core::{
    CategoryId, CollectionId, DiscountId, Entity, OrderId, ProductId, TenantId, VariantId,
};
use storecraft_design::StoreConfig;
use storecraft_discounts::Discount;
use storecraft_inventory::{StockLevel, Variant};
use storecraft_sales::{Order, OrderNote, OrderStatus};

use super::{
    DiscountStore, OrderFilter, OrderStore, ProductFilter, ProductStore, StoreConfigStore,
    StoreError, StoreResult, TaxonomyStore, VariantStore,
};

#[derive(Debug, Default)]
struct Tables {
    products: HashMap<(TenantId, ProductId), Product>,
    variants: HashMap<(TenantId, VariantId), Variant>,
    orders: HashMap<(TenantId, OrderId), Order>,
    discounts: HashMap<(TenantId, DiscountId), Discount>,
    categories: HashMap<(TenantId, CategoryId), Category>,
    collections: HashMap<(TenantId, CollectionId), Collection>,
    product_categories: HashSet<(TenantId, CategoryId, ProductId)>,
    collection_products: HashSet<(TenantId, CollectionId, ProductId)>,
    store_configs: HashMap<TenantId, StoreConfig>,
    order_sequences: HashMap<(TenantId, String), u64>,
}

/// All tables live behind one lock, so multi-table writes are atomic.
#[derive(Debug, Default)]
pub struct InMemoryCommerceStore {
    inner: RwLock<Tables>,
}

impl InMemoryCommerceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }
}

type Table<E> = HashMap<(TenantId, <E as Entity>::Id), E>;

fn key<E: Entity>(entity: &E) -> (TenantId, E::Id) {
    (entity.tenant_id(), entity.id())
}

/// Overwrite an existing row; a missing row is `NotFound`.
fn replace<E: Entity + Clone>(table: &mut Table<E>, entity: &E, name: &'static str) -> StoreResult<()> {
    match table.get_mut(&key(entity)) {
        Some(slot) => {
            *slot = entity.clone();
            Ok(())
        }
        None => Err(StoreError::not_found(name, entity.id())),
    }
}

fn newest_first<T, K: Ord>(mut rows: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
    rows
}

#[async_trait]
impl ProductStore for InMemoryCommerceStore {
    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        let mut t = self.write()?;
        let row = key(product);
        if t.products.contains_key(&row) {
            return Err(StoreError::Conflict(format!("product {} already exists", product.id)));
        }
        t.products.insert(row, product.clone());
        Ok(())
    }

    async fn get_product(&self, tenant_id: TenantId, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.read()?.products.get(&(tenant_id, id)).cloned())
    }

    async fn update_product(&self, product: &Product) -> StoreResult<()> {
        replace(&mut self.write()?.products, product, "product")
    }

    async fn delete_product(&self, tenant_id: TenantId, id: ProductId) -> StoreResult<bool> {
        let mut t = self.write()?;
        if t.products.remove(&(tenant_id, id)).is_none() {
            return Ok(false);
        }
        t.variants
            .retain(|(tid, _), v| !(*tid == tenant_id && v.product_id == id));
        t.product_categories
            .retain(|(tid, _, pid)| !(*tid == tenant_id && *pid == id));
        t.collection_products
            .retain(|(tid, _, pid)| !(*tid == tenant_id && *pid == id));
        Ok(true)
    }

    async fn list_products(
        &self,
        tenant_id: TenantId,
        filter: &ProductFilter,
    ) -> StoreResult<Vec<Product>> {
        let t = self.read()?;
        let rows: Vec<Product> = t
            .products
            .iter()
            .filter(|((tid, _), _)| *tid == tenant_id)
            .map(|(_, p)| p)
            .filter(|p| filter.status.is_none_or(|s| p.status == s))
            .filter(|p| {
                filter.category_id.is_none_or(|c| {
                    t.product_categories.contains(&(tenant_id, c, p.id))
                })
            })
            .filter(|p| {
                filter.collection_id.is_none_or(|c| {
                    t.collection_products.contains(&(tenant_id, c, p.id))
                })
            })
            .filter(|p| {
                filter
                    .tag
                    .as_ref()
                    .is_none_or(|tag| p.tags.iter().any(|x| x.eq_ignore_ascii_case(tag)))
            })
            .cloned()
            .collect();
        let mut rows = newest_first(rows, |p| (p.created_at, p.id));
        if let Some(limit) = filter.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }
}

#[async_trait]
impl VariantStore for InMemoryCommerceStore {
    async fn insert_variant(&self, variant: &Variant) -> StoreResult<()> {
        let mut t = self.write()?;
        if !t.products.contains_key(&(variant.tenant_id, variant.product_id)) {
            return Err(StoreError::not_found("product", variant.product_id));
        }
        t.variants.insert(key(variant), variant.clone());
        Ok(())
    }

    async fn get_variant(&self, tenant_id: TenantId, id: VariantId) -> StoreResult<Option<Variant>> {
        Ok(self.read()?.variants.get(&(tenant_id, id)).cloned())
    }

    async fn update_variant(&self, variant: &Variant) -> StoreResult<()> {
        let mut t = self.write()?;
        let slot = t
            .variants
            .get_mut(&(variant.tenant_id, variant.id))
            .ok_or_else(|| StoreError::not_found("variant", variant.id))?;
        slot.sku = variant.sku.clone();
        slot.attributes = variant.attributes.clone();
        slot.price_override = variant.price_override;
        slot.updated_at = variant.updated_at;
        Ok(())
    }

    async fn delete_variant(&self, tenant_id: TenantId, id: VariantId) -> StoreResult<bool> {
        Ok(self.write()?.variants.remove(&(tenant_id, id)).is_some())
    }

    async fn list_variants(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> StoreResult<Vec<Variant>> {
        let t = self.read()?;
        let mut rows: Vec<Variant> = t
            .variants
            .iter()
            .filter(|((tid, _), v)| *tid == tenant_id && v.product_id == product_id)
            .map(|(_, v)| v.clone())
            .collect();
        rows.sort_by_key(|v| (v.created_at, v.id));
        Ok(rows)
    }

    async fn list_low_stock(&self, tenant_id: TenantId, threshold: i64) -> StoreResult<Vec<Variant>> {
        let t = self.read()?;
        let mut rows: Vec<Variant> = t
            .variants
            .iter()
            .filter(|((tid, _), v)| *tid == tenant_id && v.available() <= threshold)
            .map(|(_, v)| v.clone())
            .collect();
        rows.sort_by_key(|v| (v.available(), v.id));
        Ok(rows)
    }

    async fn compare_and_swap_stock(
        &self,
        tenant_id: TenantId,
        id: VariantId,
        expected: StockLevel,
        new: StockLevel,
    ) -> StoreResult<bool> {
        let mut t = self.write()?;
        let variant = t
            .variants
            .get_mut(&(tenant_id, id))
            .ok_or_else(|| StoreError::not_found("variant", id))?;
        if variant.level != expected {
            return Ok(false);
        }
        variant.level = new;
        variant.updated_at = chrono::Utc::now();
        Ok(true)
    }
}

#[async_trait]
impl OrderStore for InMemoryCommerceStore {
    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        let mut t = self.write()?;
        let clash = t.orders.iter().any(|((tid, _), o)| {
            *tid == order.tenant_id && o.order_number == order.order_number
        });
        if clash {
            return Err(StoreError::Conflict(format!(
                "order number {} already exists",
                order.order_number
            )));
        }
        t.orders.insert(key(order), order.clone());
        Ok(())
    }

    async fn get_order(&self, tenant_id: TenantId, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.read()?.orders.get(&(tenant_id, id)).cloned())
    }

    async fn find_order_by_number(
        &self,
        tenant_id: TenantId,
        order_number: &str,
    ) -> StoreResult<Option<Order>> {
        let t = self.read()?;
        Ok(t
            .orders
            .iter()
            .find(|((tid, _), o)| *tid == tenant_id && o.order_number == order_number)
            .map(|(_, o)| o.clone()))
    }

    async fn list_orders(&self, tenant_id: TenantId, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        let t = self.read()?;
        let rows: Vec<Order> = t
            .orders
            .iter()
            .filter(|((tid, _), o)| {
                *tid == tenant_id && filter.status.is_none_or(|s| o.status == s)
            })
            .map(|(_, o)| o.clone())
            .collect();
        let mut rows = newest_first(rows, |o| (o.created_at, o.id));
        if let Some(limit) = filter.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn update_order_status(&self, order: &Order, expected: OrderStatus) -> StoreResult<bool> {
        let mut t = self.write()?;
        let stored = t
            .orders
            .get_mut(&(order.tenant_id, order.id))
            .ok_or_else(|| StoreError::not_found("order", order.id))?;
        if stored.status != expected {
            return Ok(false);
        }
        stored.status = order.status;
        stored.fulfillment_status = order.fulfillment_status;
        stored.payment_status = order.payment_status;
        stored.tracking = order.tracking.clone();
        stored.updated_at = order.updated_at;
        Ok(true)
    }

    async fn append_order_note(
        &self,
        tenant_id: TenantId,
        id: OrderId,
        note: &OrderNote,
    ) -> StoreResult<()> {
        let mut t = self.write()?;
        let stored = t
            .orders
            .get_mut(&(tenant_id, id))
            .ok_or_else(|| StoreError::not_found("order", id))?;
        stored.notes.push(note.clone());
        stored.updated_at = note.created_at;
        Ok(())
    }

    async fn next_order_sequence(&self, tenant_id: TenantId, period: &str) -> StoreResult<u64> {
        let mut t = self.write()?;
        let seq = t
            .order_sequences
            .entry((tenant_id, period.to_string()))
            .or_insert(0);
        *seq += 1;
        Ok(*seq)
    }

    async fn product_has_orders(&self, tenant_id: TenantId, id: ProductId) -> StoreResult<bool> {
        let t = self.read()?;
        Ok(t
            .orders
            .iter()
            .any(|((tid, _), o)| *tid == tenant_id && o.references_product(id)))
    }

    async fn variant_has_orders(&self, tenant_id: TenantId, id: VariantId) -> StoreResult<bool> {
        let t = self.read()?;
        Ok(t
            .orders
            .iter()
            .any(|((tid, _), o)| *tid == tenant_id && o.references_variant(id)))
    }
}

fn code_taken(t: &Tables, discount: &Discount) -> bool {
    t.discounts.iter().any(|((tid, id), d)| {
        *tid == discount.tenant_id && *id != discount.id && d.code == discount.code
    })
}

#[async_trait]
impl DiscountStore for InMemoryCommerceStore {
    async fn insert_discount(&self, discount: &Discount) -> StoreResult<()> {
        let mut t = self.write()?;
        if code_taken(&t, discount) {
            return Err(StoreError::Conflict(format!(
                "discount code {} already exists",
                discount.code
            )));
        }
        t.discounts.insert(key(discount), discount.clone());
        Ok(())
    }

    async fn get_discount(&self, tenant_id: TenantId, id: DiscountId) -> StoreResult<Option<Discount>> {
        Ok(self.read()?.discounts.get(&(tenant_id, id)).cloned())
    }

    async fn find_discount_by_code(
        &self,
        tenant_id: TenantId,
        code: &str,
    ) -> StoreResult<Option<Discount>> {
        let t = self.read()?;
        Ok(t
            .discounts
            .iter()
            .find(|((tid, _), d)| *tid == tenant_id && d.code == code)
            .map(|(_, d)| d.clone()))
    }

    async fn update_discount(&self, discount: &Discount) -> StoreResult<()> {
        let mut t = self.write()?;
        if code_taken(&t, discount) {
            return Err(StoreError::Conflict(format!(
                "discount code {} already exists",
                discount.code
            )));
        }
        let slot = t
            .discounts
            .get_mut(&key(discount))
            .ok_or_else(|| StoreError::not_found("discount", discount.id))?;
        let used_count = slot.used_count;
        *slot = Discount {
            used_count,
            ..discount.clone()
        };
        Ok(())
    }

    async fn list_discounts(&self, tenant_id: TenantId) -> StoreResult<Vec<Discount>> {
        let t = self.read()?;
        let rows: Vec<Discount> = t
            .discounts
            .iter()
            .filter(|((tid, _), _)| *tid == tenant_id)
            .map(|(_, d)| d.clone())
            .collect();
        Ok(newest_first(rows, |d| (d.created_at, d.id)))
    }

    async fn increment_discount_usage(&self, tenant_id: TenantId, id: DiscountId) -> StoreResult<bool> {
        let mut t = self.write()?;
        let d = t
            .discounts
            .get_mut(&(tenant_id, id))
            .ok_or_else(|| StoreError::not_found("discount", id))?;
        if d.is_exhausted() {
            return Ok(false);
        }
        d.used_count += 1;
        Ok(true)
    }
}

#[async_trait]
impl TaxonomyStore for InMemoryCommerceStore {
    async fn insert_category(&self, category: &Category) -> StoreResult<()> {
        self.write()?.categories.insert(key(category), category.clone());
        Ok(())
    }

    async fn get_category(&self, tenant_id: TenantId, id: CategoryId) -> StoreResult<Option<Category>> {
        Ok(self.read()?.categories.get(&(tenant_id, id)).cloned())
    }

    async fn update_category(&self, category: &Category) -> StoreResult<()> {
        replace(&mut self.write()?.categories, category, "category")
    }

    async fn delete_category(&self, tenant_id: TenantId, id: CategoryId) -> StoreResult<bool> {
        let mut t = self.write()?;
        if t.categories.remove(&(tenant_id, id)).is_none() {
            return Ok(false);
        }
        t.product_categories
            .retain(|(tid, cid, _)| !(*tid == tenant_id && *cid == id));
        for ((tid, _), c) in t.categories.iter_mut() {
            if *tid == tenant_id && c.parent_id == Some(id) {
                c.parent_id = None;
            }
        }
        Ok(true)
    }

    async fn list_categories(&self, tenant_id: TenantId) -> StoreResult<Vec<Category>> {
        let t = self.read()?;
        let mut rows: Vec<Category> = t
            .categories
            .iter()
            .filter(|((tid, _), _)| *tid == tenant_id)
            .map(|(_, c)| c.clone())
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn assign_products_to_category(
        &self,
        tenant_id: TenantId,
        id: CategoryId,
        products: &[ProductId],
    ) -> StoreResult<usize> {
        let mut t = self.write()?;
        if !t.categories.contains_key(&(tenant_id, id)) {
            return Err(StoreError::not_found("category", id));
        }
        Ok(products
            .iter()
            .filter(|p| t.product_categories.insert((tenant_id, id, **p)))
            .count())
    }

    async fn remove_products_from_category(
        &self,
        tenant_id: TenantId,
        id: CategoryId,
        products: &[ProductId],
    ) -> StoreResult<usize> {
        let mut t = self.write()?;
        if !t.categories.contains_key(&(tenant_id, id)) {
            return Err(StoreError::not_found("category", id));
        }
        Ok(products
            .iter()
            .filter(|p| t.product_categories.remove(&(tenant_id, id, **p)))
            .count())
    }

    async fn insert_collection(&self, collection: &Collection) -> StoreResult<()> {
        self.write()?.collections.insert(key(collection), collection.clone());
        Ok(())
    }

    async fn get_collection(
        &self,
        tenant_id: TenantId,
        id: CollectionId,
    ) -> StoreResult<Option<Collection>> {
        Ok(self.read()?.collections.get(&(tenant_id, id)).cloned())
    }

    async fn update_collection(&self, collection: &Collection) -> StoreResult<()> {
        replace(&mut self.write()?.collections, collection, "collection")
    }

    async fn delete_collection(&self, tenant_id: TenantId, id: CollectionId) -> StoreResult<bool> {
        let mut t = self.write()?;
        if t.collections.remove(&(tenant_id, id)).is_none() {
            return Ok(false);
        }
        t.collection_products
            .retain(|(tid, cid, _)| !(*tid == tenant_id && *cid == id));
        Ok(true)
    }

    async fn list_collections(&self, tenant_id: TenantId) -> StoreResult<Vec<Collection>> {
        let t = self.read()?;
        let mut rows: Vec<Collection> = t
            .collections
            .iter()
            .filter(|((tid, _), _)| *tid == tenant_id)
            .map(|(_, c)| c.clone())
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn add_products_to_collection(
        &self,
        tenant_id: TenantId,
        id: CollectionId,
        products: &[ProductId],
    ) -> StoreResult<usize> {
        let mut t = self.write()?;
        if !t.collections.contains_key(&(tenant_id, id)) {
            return Err(StoreError::not_found("collection", id));
        }
        Ok(products
            .iter()
            .filter(|p| t.collection_products.insert((tenant_id, id, **p)))
            .count())
    }

    async fn remove_products_from_collection(
        &self,
        tenant_id: TenantId,
        id: CollectionId,
        products: &[ProductId],
    ) -> StoreResult<usize> {
        let mut t = self.write()?;
        if !t.collections.contains_key(&(tenant_id, id)) {
            return Err(StoreError::not_found("collection", id));
        }
        Ok(products
            .iter()
            .filter(|p| t.collection_products.remove(&(tenant_id, id, **p)))
            .count())
    }
}

#[async_trait]
impl StoreConfigStore for InMemoryCommerceStore {
    async fn get_store_config(&self, tenant_id: TenantId) -> StoreResult<Option<StoreConfig>> {
        Ok(self.read()?.store_configs.get(&tenant_id).cloned())
    }

    async fn put_store_config(&self, tenant_id: TenantId, config: &StoreConfig) -> StoreResult<()> {
        self.write()?.store_configs.insert(tenant_id, config.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use storecraft_core::Money;

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    fn product(tenant_id: TenantId, name: &str) -> Product {
        Product::new(tenant_id, name, Money::from_minor(10_000), None, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn reads_are_tenant_scoped() {
        let store = InMemoryCommerceStore::new();
        let (a, b) = (test_tenant_id(), test_tenant_id());
        let p = product(a, "Mug");
        store.insert_product(&p).await.unwrap();

        assert!(store.get_product(a, p.id).await.unwrap().is_some());
        assert!(store.get_product(b, p.id).await.unwrap().is_none());
        assert!(
            store
                .list_products(b, &ProductFilter::default())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn stock_cas_rejects_stale_expectation() {
        let store = InMemoryCommerceStore::new();
        let tenant = test_tenant_id();
        let p = product(tenant, "Tee");
        store.insert_product(&p).await.unwrap();
        let v = Variant::new(tenant, p.id, BTreeMap::new(), None, 10, Utc::now()).unwrap();
        store.insert_variant(&v).await.unwrap();

        let before = v.level;
        let after = before.reserve(3).unwrap();
        assert!(store.compare_and_swap_stock(tenant, v.id, before, after).await.unwrap());
        assert!(!store.compare_and_swap_stock(tenant, v.id, before, after).await.unwrap());
        let stored = store.get_variant(tenant, v.id).await.unwrap().unwrap();
        assert_eq!(stored.reserved(), 3);
    }

    #[tokio::test]
    async fn order_sequences_are_per_tenant_and_period() {
        let store = InMemoryCommerceStore::new();
        let (a, b) = (test_tenant_id(), test_tenant_id());
        assert_eq!(store.next_order_sequence(a, "202610").await.unwrap(), 1);
        assert_eq!(store.next_order_sequence(a, "202610").await.unwrap(), 2);
        assert_eq!(store.next_order_sequence(a, "202611").await.unwrap(), 1);
        assert_eq!(store.next_order_sequence(b, "202610").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn discount_codes_unique_and_usage_capped() {
        let store = InMemoryCommerceStore::new();
        let tenant = test_tenant_id();
        let make = || {
            Discount::new(
                tenant,
                "ONCE",
                storecraft_discounts::DiscountType::Flat,
                10.0,
                None,
                None,
                Some(1),
                None,
                None,
                Utc::now(),
            )
            .unwrap()
        };
        let d = make();
        store.insert_discount(&d).await.unwrap();
        assert!(matches!(
            store.insert_discount(&make()).await,
            Err(StoreError::Conflict(_))
        ));
        assert!(store.increment_discount_usage(tenant, d.id).await.unwrap());
        assert!(!store.increment_discount_usage(tenant, d.id).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_a_product_drops_memberships() {
        let store = InMemoryCommerceStore::new();
        let tenant = test_tenant_id();
        let p = product(tenant, "Scarf");
        store.insert_product(&p).await.unwrap();
        let c = Category::new(tenant, "Accessories", None, None, Utc::now()).unwrap();
        store.insert_category(&c).await.unwrap();
        assert_eq!(
            store
                .assign_products_to_category(tenant, c.id, &[p.id, p.id])
                .await
                .unwrap(),
            1
        );
        let filter = ProductFilter {
            category_id: Some(c.id),
            ..ProductFilter::default()
        };
        assert_eq!(store.list_products(tenant, &filter).await.unwrap().len(), 1);

        assert!(store.delete_product(tenant, p.id).await.unwrap());
        assert!(store.list_products(tenant, &filter).await.unwrap().is_empty());
    }
}

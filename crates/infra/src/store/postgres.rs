//! Postgres-backed commerce store.
//!
//! ## Error Mapping
//!
//! | SQLx error | PostgreSQL code | `StoreError` |
//! |---|---|---|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `NotFound` (referenced row is missing) |
//! | Database (other) | any other | `Backend` |
//! | PoolClosed / network / other | n/a | `Backend` |
//!
//! ## Tenant Isolation
//!
//! Every statement includes `tenant_id` in its `WHERE` clause or primary key.
//!
//! ## Atomic updates
//!
//! Stock and order-status writes are conditional `UPDATE`s on the previously read
//! values; zero affected rows means another writer won and the caller re-reads.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row};
use tracing::instrument;
use uuid::Uuid;

use storecraft_catalog::{Category, Collection, Product, ProductStatus};
use storecraft_core::{
    CategoryId, CollectionId, DiscountId, Money, OrderId, ProductId, TenantId, VariantId,
};
use storecraft_design::StoreConfig;
use storecraft_discounts::{Discount, DiscountType};
use storecraft_inventory::{StockLevel, Variant};
use storecraft_sales::{
    FulfillmentStatus, Order, OrderNote, OrderStatus, OrderTotals, PaymentMethod, PaymentStatus,
};

use super::{
    DiscountStore, OrderFilter, OrderStore, ProductFilter, ProductStore, StoreConfigStore,
    StoreError, StoreResult, TaxonomyStore, VariantStore,
};

#[derive(Debug, Clone)]
pub struct PostgresCommerceStore {
    pool: Arc<PgPool>,
}

impl PostgresCommerceStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the bundled schema migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&*self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("migration failed: {e}")))
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") => StoreError::NotFound {
                    entity: "referenced row",
                    id: msg,
                },
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

fn col<'r, T>(row: &'r PgRow, name: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Serialization(format!("column {name}: {e}")))
}

fn parse_col<T>(row: &PgRow, name: &str, parse: impl Fn(&str) -> Option<T>) -> StoreResult<T> {
    let raw: String = col(row, name)?;
    parse(&raw).ok_or_else(|| StoreError::Serialization(format!("column {name}: unknown value {raw:?}")))
}

fn money(row: &PgRow, name: &str) -> StoreResult<Money> {
    Ok(Money::from_minor(col::<i64>(row, name)?))
}

fn money_opt(row: &PgRow, name: &str) -> StoreResult<Option<Money>> {
    Ok(col::<Option<i64>>(row, name)?.map(Money::from_minor))
}

fn product_from_row(row: &PgRow) -> StoreResult<Product> {
    Ok(Product {
        id: ProductId::from_uuid(col(row, "id")?),
        tenant_id: TenantId::from_uuid(col(row, "tenant_id")?),
        name: col(row, "name")?,
        slug: col(row, "slug")?,
        description: col(row, "description")?,
        price: money(row, "price_minor")?,
        compare_at_price: money_opt(row, "compare_at_minor")?,
        status: parse_col(row, "status", ProductStatus::parse)?,
        tags: col::<Json<Vec<String>>>(row, "tags")?.0,
        media: col::<Json<_>>(row, "media")?.0,
        created_at: col(row, "created_at")?,
        updated_at: col(row, "updated_at")?,
    })
}

fn variant_from_row(row: &PgRow) -> StoreResult<Variant> {
    let stock: i64 = col(row, "stock")?;
    let reserved: i64 = col(row, "reserved")?;
    let level = StockLevel::from_parts(stock, reserved).ok_or_else(|| {
        StoreError::Serialization(format!("invalid stock pair ({stock}, {reserved})"))
    })?;
    Ok(Variant {
        id: VariantId::from_uuid(col(row, "id")?),
        tenant_id: TenantId::from_uuid(col(row, "tenant_id")?),
        product_id: ProductId::from_uuid(col(row, "product_id")?),
        sku: col(row, "sku")?,
        attributes: col::<Json<_>>(row, "attributes")?.0,
        price_override: money_opt(row, "price_override_minor")?,
        level,
        created_at: col(row, "created_at")?,
        updated_at: col(row, "updated_at")?,
    })
}

fn order_from_row(row: &PgRow) -> StoreResult<Order> {
    Ok(Order {
        id: OrderId::from_uuid(col(row, "id")?),
        tenant_id: TenantId::from_uuid(col(row, "tenant_id")?),
        order_number: col(row, "order_number")?,
        customer: col::<Json<_>>(row, "customer")?.0,
        items: col::<Json<_>>(row, "items")?.0,
        totals: OrderTotals {
            subtotal: money(row, "subtotal_minor")?,
            discount: money(row, "discount_minor")?,
            tax: money(row, "tax_minor")?,
            shipping: money(row, "shipping_minor")?,
            total: money(row, "total_minor")?,
        },
        status: parse_col(row, "status", OrderStatus::parse)?,
        fulfillment_status: parse_col(row, "fulfillment_status", FulfillmentStatus::parse)?,
        payment_method: parse_col(row, "payment_method", PaymentMethod::parse)?,
        payment_status: parse_col(row, "payment_status", PaymentStatus::parse)?,
        payment_reference: col(row, "payment_reference")?,
        tracking: col::<Option<Json<_>>>(row, "tracking")?.map(|j| j.0),
        discount_code: col(row, "discount_code")?,
        notes: col::<Json<_>>(row, "notes")?.0,
        created_at: col(row, "created_at")?,
        updated_at: col(row, "updated_at")?,
    })
}

fn discount_from_row(row: &PgRow) -> StoreResult<Discount> {
    Ok(Discount {
        id: DiscountId::from_uuid(col(row, "id")?),
        tenant_id: TenantId::from_uuid(col(row, "tenant_id")?),
        code: col(row, "code")?,
        discount_type: parse_col(row, "discount_type", DiscountType::parse)?,
        value: col(row, "value")?,
        min_order_value: money_opt(row, "min_order_minor")?,
        max_discount: money_opt(row, "max_discount_minor")?,
        usage_limit: col(row, "usage_limit")?,
        used_count: col(row, "used_count")?,
        starts_at: col(row, "starts_at")?,
        ends_at: col(row, "ends_at")?,
        active: col(row, "active")?,
        created_at: col(row, "created_at")?,
        updated_at: col(row, "updated_at")?,
    })
}

fn category_from_row(row: &PgRow) -> StoreResult<Category> {
    Ok(Category {
        id: CategoryId::from_uuid(col(row, "id")?),
        tenant_id: TenantId::from_uuid(col(row, "tenant_id")?),
        name: col(row, "name")?,
        slug: col(row, "slug")?,
        description: col(row, "description")?,
        parent_id: col::<Option<Uuid>>(row, "parent_id")?.map(CategoryId::from_uuid),
        created_at: col(row, "created_at")?,
        updated_at: col(row, "updated_at")?,
    })
}

fn collection_from_row(row: &PgRow) -> StoreResult<Collection> {
    Ok(Collection {
        id: CollectionId::from_uuid(col(row, "id")?),
        tenant_id: TenantId::from_uuid(col(row, "tenant_id")?),
        name: col(row, "name")?,
        slug: col(row, "slug")?,
        description: col(row, "description")?,
        created_at: col(row, "created_at")?,
        updated_at: col(row, "updated_at")?,
    })
}

fn uuids<T: Copy>(ids: &[T], as_uuid: impl Fn(T) -> Uuid) -> Vec<Uuid> {
    ids.iter().map(|id| as_uuid(*id)).collect()
}

#[async_trait]
impl ProductStore for PostgresCommerceStore {
    #[instrument(skip(self, product), fields(tenant_id = %product.tenant_id, product_id = %product.id), err)]
    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products
                (tenant_id, id, name, slug, description, price_minor, compare_at_minor,
                 status, tags, media, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(*product.tenant_id.as_uuid())
        .bind(*product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(product.price.minor())
        .bind(product.compare_at_price.map(Money::minor))
        .bind(product.status.as_str())
        .bind(Json(&product.tags))
        .bind(Json(&product.media))
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(())
    }

    async fn get_product(&self, tenant_id: TenantId, id: ProductId) -> StoreResult<Option<Product>> {
        let row = sqlx::query("SELECT * FROM products WHERE tenant_id = $1 AND id = $2")
            .bind(*tenant_id.as_uuid())
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self, product), fields(tenant_id = %product.tenant_id, product_id = %product.id), err)]
    async fn update_product(&self, product: &Product) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $3, slug = $4, description = $5, price_minor = $6,
                compare_at_minor = $7, status = $8, tags = $9, media = $10, updated_at = $11
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(*product.tenant_id.as_uuid())
        .bind(*product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(product.price.minor())
        .bind(product.compare_at_price.map(Money::minor))
        .bind(product.status.as_str())
        .bind(Json(&product.tags))
        .bind(Json(&product.media))
        .bind(product.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("product", product.id));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, product_id = %id), err)]
    async fn delete_product(&self, tenant_id: TenantId, id: ProductId) -> StoreResult<bool> {
        // Variants and memberships go with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM products WHERE tenant_id = $1 AND id = $2")
            .bind(*tenant_id.as_uuid())
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_products(
        &self,
        tenant_id: TenantId,
        filter: &ProductFilter,
    ) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT p.*
            FROM products p
            WHERE p.tenant_id = $1
                AND ($2::text IS NULL OR p.status = $2)
                AND ($3::uuid IS NULL OR EXISTS (
                    SELECT 1 FROM product_categories pc
                    WHERE pc.tenant_id = p.tenant_id AND pc.product_id = p.id
                        AND pc.category_id = $3))
                AND ($4::uuid IS NULL OR EXISTS (
                    SELECT 1 FROM collection_products cp
                    WHERE cp.tenant_id = p.tenant_id AND cp.product_id = p.id
                        AND cp.collection_id = $4))
                AND ($5::text IS NULL OR EXISTS (
                    SELECT 1 FROM jsonb_array_elements_text(p.tags) AS t(tag)
                    WHERE lower(t.tag) = lower($5)))
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT $6
            "#,
        )
        .bind(*tenant_id.as_uuid())
        .bind(filter.status.map(ProductStatus::as_str))
        .bind(filter.category_id.map(|c| *c.as_uuid()))
        .bind(filter.collection_id.map(|c| *c.as_uuid()))
        .bind(filter.tag.as_deref())
        .bind(filter.limit.map(|l| l as i64))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;
        rows.iter().map(product_from_row).collect()
    }
}

#[async_trait]
impl VariantStore for PostgresCommerceStore {
    #[instrument(skip(self, variant), fields(tenant_id = %variant.tenant_id, variant_id = %variant.id), err)]
    async fn insert_variant(&self, variant: &Variant) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO variants
                (tenant_id, id, product_id, sku, attributes, price_override_minor,
                 stock, reserved, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(*variant.tenant_id.as_uuid())
        .bind(*variant.id.as_uuid())
        .bind(*variant.product_id.as_uuid())
        .bind(&variant.sku)
        .bind(Json(&variant.attributes))
        .bind(variant.price_override.map(Money::minor))
        .bind(variant.stock())
        .bind(variant.reserved())
        .bind(variant.created_at)
        .bind(variant.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_variant", e))?;
        Ok(())
    }

    async fn get_variant(&self, tenant_id: TenantId, id: VariantId) -> StoreResult<Option<Variant>> {
        let row = sqlx::query("SELECT * FROM variants WHERE tenant_id = $1 AND id = $2")
            .bind(*tenant_id.as_uuid())
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_variant", e))?;
        row.as_ref().map(variant_from_row).transpose()
    }

    async fn update_variant(&self, variant: &Variant) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE variants
            SET sku = $3, attributes = $4, price_override_minor = $5, updated_at = $6
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(*variant.tenant_id.as_uuid())
        .bind(*variant.id.as_uuid())
        .bind(&variant.sku)
        .bind(Json(&variant.attributes))
        .bind(variant.price_override.map(Money::minor))
        .bind(variant.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_variant", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("variant", variant.id));
        }
        Ok(())
    }

    async fn delete_variant(&self, tenant_id: TenantId, id: VariantId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM variants WHERE tenant_id = $1 AND id = $2")
            .bind(*tenant_id.as_uuid())
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_variant", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_variants(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> StoreResult<Vec<Variant>> {
        let rows = sqlx::query(
            "SELECT * FROM variants WHERE tenant_id = $1 AND product_id = $2 ORDER BY created_at, id",
        )
        .bind(*tenant_id.as_uuid())
        .bind(*product_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_variants", e))?;
        rows.iter().map(variant_from_row).collect()
    }

    async fn list_low_stock(&self, tenant_id: TenantId, threshold: i64) -> StoreResult<Vec<Variant>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM variants
            WHERE tenant_id = $1 AND stock - reserved <= $2
            ORDER BY stock - reserved ASC, id
            "#,
        )
        .bind(*tenant_id.as_uuid())
        .bind(threshold)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_low_stock", e))?;
        rows.iter().map(variant_from_row).collect()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, variant_id = %id), err)]
    async fn compare_and_swap_stock(
        &self,
        tenant_id: TenantId,
        id: VariantId,
        expected: StockLevel,
        new: StockLevel,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE variants
            SET stock = $5, reserved = $6, updated_at = $7
            WHERE tenant_id = $1 AND id = $2 AND stock = $3 AND reserved = $4
            "#,
        )
        .bind(*tenant_id.as_uuid())
        .bind(*id.as_uuid())
        .bind(expected.stock())
        .bind(expected.reserved())
        .bind(new.stock())
        .bind(new.reserved())
        .bind(Utc::now())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("compare_and_swap_stock", e))?;
        if result.rows_affected() == 1 {
            return Ok(true);
        }
        match self.get_variant(tenant_id, id).await? {
            Some(_) => Ok(false),
            None => Err(StoreError::not_found("variant", id)),
        }
    }
}

#[async_trait]
impl OrderStore for PostgresCommerceStore {
    #[instrument(skip(self, order), fields(tenant_id = %order.tenant_id, order_number = %order.order_number), err)]
    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO orders
                (tenant_id, id, order_number, customer, items, subtotal_minor, discount_minor,
                 tax_minor, shipping_minor, total_minor, status, fulfillment_status,
                 payment_method, payment_status, payment_reference, tracking, discount_code,
                 notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20)
            "#,
        )
        .bind(*order.tenant_id.as_uuid())
        .bind(*order.id.as_uuid())
        .bind(&order.order_number)
        .bind(Json(&order.customer))
        .bind(Json(&order.items))
        .bind(order.totals.subtotal.minor())
        .bind(order.totals.discount.minor())
        .bind(order.totals.tax.minor())
        .bind(order.totals.shipping.minor())
        .bind(order.totals.total.minor())
        .bind(order.status.as_str())
        .bind(order.fulfillment_status.as_str())
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(&order.payment_reference)
        .bind(order.tracking.as_ref().map(Json))
        .bind(&order.discount_code)
        .bind(Json(&order.notes))
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;
        Ok(())
    }

    async fn get_order(&self, tenant_id: TenantId, id: OrderId) -> StoreResult<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE tenant_id = $1 AND id = $2")
            .bind(*tenant_id.as_uuid())
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_order", e))?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn find_order_by_number(
        &self,
        tenant_id: TenantId,
        order_number: &str,
    ) -> StoreResult<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE tenant_id = $1 AND order_number = $2")
            .bind(*tenant_id.as_uuid())
            .bind(order_number)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_order_by_number", e))?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn list_orders(&self, tenant_id: TenantId, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM orders
            WHERE tenant_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#,
        )
        .bind(*tenant_id.as_uuid())
        .bind(filter.status.map(OrderStatus::as_str))
        .bind(filter.limit.map(|l| l as i64))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_orders", e))?;
        rows.iter().map(order_from_row).collect()
    }

    #[instrument(
        skip(self, order),
        fields(tenant_id = %order.tenant_id, order_id = %order.id, expected = %expected, target = %order.status),
        err
    )]
    async fn update_order_status(&self, order: &Order, expected: OrderStatus) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $3, fulfillment_status = $4, payment_status = $5, tracking = $6,
                updated_at = $7
            WHERE tenant_id = $1 AND id = $2 AND status = $8
            "#,
        )
        .bind(*order.tenant_id.as_uuid())
        .bind(*order.id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.fulfillment_status.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.tracking.as_ref().map(Json))
        .bind(order.updated_at)
        .bind(expected.as_str())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_order_status", e))?;
        if result.rows_affected() == 1 {
            return Ok(true);
        }
        match self.get_order(order.tenant_id, order.id).await? {
            Some(_) => Ok(false),
            None => Err(StoreError::not_found("order", order.id)),
        }
    }

    async fn append_order_note(
        &self,
        tenant_id: TenantId,
        id: OrderId,
        note: &OrderNote,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET notes = notes || $3::jsonb, updated_at = $4
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(*tenant_id.as_uuid())
        .bind(*id.as_uuid())
        .bind(Json([note]))
        .bind(note.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("append_order_note", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("order", id));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, period = %period), err)]
    async fn next_order_sequence(&self, tenant_id: TenantId, period: &str) -> StoreResult<u64> {
        let row = sqlx::query(
            r#"
            INSERT INTO order_sequences (tenant_id, period, last_value)
            VALUES ($1, $2, 1)
            ON CONFLICT (tenant_id, period)
            DO UPDATE SET last_value = order_sequences.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(*tenant_id.as_uuid())
        .bind(period)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("next_order_sequence", e))?;
        let value: i64 = col(&row, "last_value")?;
        Ok(value.max(0) as u64)
    }

    async fn product_has_orders(&self, tenant_id: TenantId, id: ProductId) -> StoreResult<bool> {
        let probe = serde_json::json!([{ "productId": id }]);
        let row = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM orders WHERE tenant_id = $1 AND items @> $2) AS found",
        )
        .bind(*tenant_id.as_uuid())
        .bind(Json(probe))
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("product_has_orders", e))?;
        col(&row, "found")
    }

    async fn variant_has_orders(&self, tenant_id: TenantId, id: VariantId) -> StoreResult<bool> {
        let probe = serde_json::json!([{ "variantId": id }]);
        let row = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM orders WHERE tenant_id = $1 AND items @> $2) AS found",
        )
        .bind(*tenant_id.as_uuid())
        .bind(Json(probe))
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("variant_has_orders", e))?;
        col(&row, "found")
    }
}

#[async_trait]
impl DiscountStore for PostgresCommerceStore {
    #[instrument(skip(self, discount), fields(tenant_id = %discount.tenant_id, code = %discount.code), err)]
    async fn insert_discount(&self, discount: &Discount) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO discounts
                (tenant_id, id, code, discount_type, value, min_order_minor, max_discount_minor,
                 usage_limit, used_count, starts_at, ends_at, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(*discount.tenant_id.as_uuid())
        .bind(*discount.id.as_uuid())
        .bind(&discount.code)
        .bind(discount.discount_type.as_str())
        .bind(discount.value)
        .bind(discount.min_order_value.map(Money::minor))
        .bind(discount.max_discount.map(Money::minor))
        .bind(discount.usage_limit)
        .bind(discount.used_count)
        .bind(discount.starts_at)
        .bind(discount.ends_at)
        .bind(discount.active)
        .bind(discount.created_at)
        .bind(discount.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_discount", e))?;
        Ok(())
    }

    async fn get_discount(&self, tenant_id: TenantId, id: DiscountId) -> StoreResult<Option<Discount>> {
        let row = sqlx::query("SELECT * FROM discounts WHERE tenant_id = $1 AND id = $2")
            .bind(*tenant_id.as_uuid())
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_discount", e))?;
        row.as_ref().map(discount_from_row).transpose()
    }

    async fn find_discount_by_code(
        &self,
        tenant_id: TenantId,
        code: &str,
    ) -> StoreResult<Option<Discount>> {
        let row = sqlx::query("SELECT * FROM discounts WHERE tenant_id = $1 AND code = $2")
            .bind(*tenant_id.as_uuid())
            .bind(code)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_discount_by_code", e))?;
        row.as_ref().map(discount_from_row).transpose()
    }

    async fn update_discount(&self, discount: &Discount) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE discounts
            SET code = $3, discount_type = $4, value = $5, min_order_minor = $6,
                max_discount_minor = $7, usage_limit = $8, starts_at = $9, ends_at = $10,
                active = $11, updated_at = $12
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(*discount.tenant_id.as_uuid())
        .bind(*discount.id.as_uuid())
        .bind(&discount.code)
        .bind(discount.discount_type.as_str())
        .bind(discount.value)
        .bind(discount.min_order_value.map(Money::minor))
        .bind(discount.max_discount.map(Money::minor))
        .bind(discount.usage_limit)
        .bind(discount.starts_at)
        .bind(discount.ends_at)
        .bind(discount.active)
        .bind(discount.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_discount", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("discount", discount.id));
        }
        Ok(())
    }

    async fn list_discounts(&self, tenant_id: TenantId) -> StoreResult<Vec<Discount>> {
        let rows = sqlx::query(
            "SELECT * FROM discounts WHERE tenant_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(*tenant_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_discounts", e))?;
        rows.iter().map(discount_from_row).collect()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, discount_id = %id), err)]
    async fn increment_discount_usage(&self, tenant_id: TenantId, id: DiscountId) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE discounts SET used_count = used_count + 1
            WHERE tenant_id = $1 AND id = $2
                AND (usage_limit IS NULL OR used_count < usage_limit)
            "#,
        )
        .bind(*tenant_id.as_uuid())
        .bind(*id.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("increment_discount_usage", e))?;
        if result.rows_affected() == 1 {
            return Ok(true);
        }
        match self.get_discount(tenant_id, id).await? {
            Some(_) => Ok(false),
            None => Err(StoreError::not_found("discount", id)),
        }
    }
}

#[async_trait]
impl TaxonomyStore for PostgresCommerceStore {
    async fn insert_category(&self, category: &Category) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO categories
                (tenant_id, id, name, slug, description, parent_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(*category.tenant_id.as_uuid())
        .bind(*category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(category.parent_id.map(|p| *p.as_uuid()))
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_category", e))?;
        Ok(())
    }

    async fn get_category(&self, tenant_id: TenantId, id: CategoryId) -> StoreResult<Option<Category>> {
        let row = sqlx::query("SELECT * FROM categories WHERE tenant_id = $1 AND id = $2")
            .bind(*tenant_id.as_uuid())
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_category", e))?;
        row.as_ref().map(category_from_row).transpose()
    }

    async fn update_category(&self, category: &Category) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE categories
            SET name = $3, slug = $4, description = $5, parent_id = $6, updated_at = $7
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(*category.tenant_id.as_uuid())
        .bind(*category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(category.parent_id.map(|p| *p.as_uuid()))
        .bind(category.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_category", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("category", category.id));
        }
        Ok(())
    }

    async fn delete_category(&self, tenant_id: TenantId, id: CategoryId) -> StoreResult<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;
        sqlx::query("UPDATE categories SET parent_id = NULL WHERE tenant_id = $1 AND parent_id = $2")
            .bind(*tenant_id.as_uuid())
            .bind(*id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;
        let result = sqlx::query("DELETE FROM categories WHERE tenant_id = $1 AND id = $2")
            .bind(*tenant_id.as_uuid())
            .bind(*id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_categories(&self, tenant_id: TenantId) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query("SELECT * FROM categories WHERE tenant_id = $1 ORDER BY name")
            .bind(*tenant_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_categories", e))?;
        rows.iter().map(category_from_row).collect()
    }

    async fn assign_products_to_category(
        &self,
        tenant_id: TenantId,
        id: CategoryId,
        products: &[ProductId],
    ) -> StoreResult<usize> {
        if self.get_category(tenant_id, id).await?.is_none() {
            return Err(StoreError::not_found("category", id));
        }
        let result = sqlx::query(
            r#"
            INSERT INTO product_categories (tenant_id, category_id, product_id)
            SELECT $1, $2, unnest($3::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(*tenant_id.as_uuid())
        .bind(*id.as_uuid())
        .bind(uuids(products, |p| *p.as_uuid()))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("assign_products_to_category", e))?;
        Ok(result.rows_affected() as usize)
    }

    async fn remove_products_from_category(
        &self,
        tenant_id: TenantId,
        id: CategoryId,
        products: &[ProductId],
    ) -> StoreResult<usize> {
        if self.get_category(tenant_id, id).await?.is_none() {
            return Err(StoreError::not_found("category", id));
        }
        let result = sqlx::query(
            r#"
            DELETE FROM product_categories
            WHERE tenant_id = $1 AND category_id = $2 AND product_id = ANY($3)
            "#,
        )
        .bind(*tenant_id.as_uuid())
        .bind(*id.as_uuid())
        .bind(uuids(products, |p| *p.as_uuid()))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("remove_products_from_category", e))?;
        Ok(result.rows_affected() as usize)
    }

    async fn insert_collection(&self, collection: &Collection) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO collections
                (tenant_id, id, name, slug, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(*collection.tenant_id.as_uuid())
        .bind(*collection.id.as_uuid())
        .bind(&collection.name)
        .bind(&collection.slug)
        .bind(&collection.description)
        .bind(collection.created_at)
        .bind(collection.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_collection", e))?;
        Ok(())
    }

    async fn get_collection(
        &self,
        tenant_id: TenantId,
        id: CollectionId,
    ) -> StoreResult<Option<Collection>> {
        let row = sqlx::query("SELECT * FROM collections WHERE tenant_id = $1 AND id = $2")
            .bind(*tenant_id.as_uuid())
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_collection", e))?;
        row.as_ref().map(collection_from_row).transpose()
    }

    async fn update_collection(&self, collection: &Collection) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE collections SET name = $3, slug = $4, description = $5, updated_at = $6
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(*collection.tenant_id.as_uuid())
        .bind(*collection.id.as_uuid())
        .bind(&collection.name)
        .bind(&collection.slug)
        .bind(&collection.description)
        .bind(collection.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_collection", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("collection", collection.id));
        }
        Ok(())
    }

    async fn delete_collection(&self, tenant_id: TenantId, id: CollectionId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM collections WHERE tenant_id = $1 AND id = $2")
            .bind(*tenant_id.as_uuid())
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_collection", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_collections(&self, tenant_id: TenantId) -> StoreResult<Vec<Collection>> {
        let rows = sqlx::query("SELECT * FROM collections WHERE tenant_id = $1 ORDER BY name")
            .bind(*tenant_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_collections", e))?;
        rows.iter().map(collection_from_row).collect()
    }

    async fn add_products_to_collection(
        &self,
        tenant_id: TenantId,
        id: CollectionId,
        products: &[ProductId],
    ) -> StoreResult<usize> {
        if self.get_collection(tenant_id, id).await?.is_none() {
            return Err(StoreError::not_found("collection", id));
        }
        let result = sqlx::query(
            r#"
            INSERT INTO collection_products (tenant_id, collection_id, product_id)
            SELECT $1, $2, unnest($3::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(*tenant_id.as_uuid())
        .bind(*id.as_uuid())
        .bind(uuids(products, |p| *p.as_uuid()))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("add_products_to_collection", e))?;
        Ok(result.rows_affected() as usize)
    }

    async fn remove_products_from_collection(
        &self,
        tenant_id: TenantId,
        id: CollectionId,
        products: &[ProductId],
    ) -> StoreResult<usize> {
        if self.get_collection(tenant_id, id).await?.is_none() {
            return Err(StoreError::not_found("collection", id));
        }
        let result = sqlx::query(
            r#"
            DELETE FROM collection_products
            WHERE tenant_id = $1 AND collection_id = $2 AND product_id = ANY($3)
            "#,
        )
        .bind(*tenant_id.as_uuid())
        .bind(*id.as_uuid())
        .bind(uuids(products, |p| *p.as_uuid()))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("remove_products_from_collection", e))?;
        Ok(result.rows_affected() as usize)
    }
}

#[async_trait]
impl StoreConfigStore for PostgresCommerceStore {
    async fn get_store_config(&self, tenant_id: TenantId) -> StoreResult<Option<StoreConfig>> {
        let row = sqlx::query("SELECT document FROM store_configs WHERE tenant_id = $1")
            .bind(*tenant_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_store_config", e))?;
        match row {
            Some(row) => Ok(Some(col::<Json<StoreConfig>>(&row, "document")?.0)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, config), fields(tenant_id = %tenant_id), err)]
    async fn put_store_config(&self, tenant_id: TenantId, config: &StoreConfig) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO store_configs (tenant_id, document, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (tenant_id) DO UPDATE SET document = EXCLUDED.document,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(*tenant_id.as_uuid())
        .bind(Json(config))
        .bind(Utc::now())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("put_store_config", e))?;
        Ok(())
    }
}

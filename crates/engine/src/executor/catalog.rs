//! Products, variants, categories, collections and product media.

use chrono::Utc;
use serde_json::{Value as JsonValue, json};
use tracing::{info, instrument};

use storecraft_catalog::{
    Category, Collection, MediaRef, Product, ProductEvent, ProductStatus, ProductStatusChanged,
    validate_price,
};
use storecraft_core::{CategoryId, CollectionId, DomainError, DomainResult, ProductId, TenantId};
use storecraft_infra::ProductFilter;
use storecraft_inventory::Variant;

use super::to_data;
use crate::engine::Engine;
use crate::payload::{
    AttachMedia, BulkUpdatePrice, CategoryProducts, CategoryRef, CollectionProducts, CollectionRef,
    CreateCategory, CreateCollection, CreateProduct, CreateVariant, DetachMedia, ProductRef,
    UpdateCategory, UpdateCollection, UpdatePrice, UpdateProduct, UpdateVariant, VariantRef,
};

/// Upper bound on parent links walked when checking for a category cycle.
const MAX_CATEGORY_DEPTH: usize = 64;

fn clean_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

fn clean_text(text: &Option<String>) -> Option<String> {
    text.as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

impl Engine {
    #[instrument(skip(self, p), fields(tenant_id = %tenant_id, name = %p.name), err)]
    pub(crate) async fn create_product(&self, tenant_id: TenantId, p: &CreateProduct) -> DomainResult<JsonValue> {
        let now = Utc::now();
        let mut product = Product::new(tenant_id, &p.name, p.price, p.compare_at_price, now)?;
        product.description = clean_text(&p.description);
        product.tags = clean_tags(&p.tags);
        if let Some(status) = p.status {
            product.status = status;
        }

        let mut variants = Vec::with_capacity(p.variants.len());
        for v in &p.variants {
            if let Some(price) = v.price_override {
                validate_price(price)?;
            }
            let mut variant = Variant::new(
                tenant_id,
                product.id,
                v.attributes.clone(),
                v.price_override,
                v.stock,
                now,
            )?;
            variant.sku = clean_text(&v.sku);
            variants.push(variant);
        }
        for id in &p.category_ids {
            self.require_category(tenant_id, *id).await?;
        }
        for id in &p.collection_ids {
            self.require_collection(tenant_id, *id).await?;
        }

        self.store.insert_product(&product).await?;
        for variant in &variants {
            self.store.insert_variant(variant).await?;
        }
        for id in &p.category_ids {
            self.store
                .assign_products_to_category(tenant_id, *id, &[product.id])
                .await?;
        }
        for id in &p.collection_ids {
            self.store
                .add_products_to_collection(tenant_id, *id, &[product.id])
                .await?;
        }

        self.publisher.publish(&ProductEvent::Created {
            tenant_id,
            product_id: product.id,
            name: product.name.clone(),
            price: product.price,
            occurred_at: now,
        });
        Ok(json!({ "product": to_data(&product)?, "variants": to_data(&variants)? }))
    }

    pub(crate) async fn update_product(&self, tenant_id: TenantId, p: &UpdateProduct) -> DomainResult<JsonValue> {
        let mut product = self.require_product(tenant_id, p.product_id).await?;
        if let Some(name) = &p.name {
            product.rename(name)?;
        }
        if p.description.is_some() {
            product.description = clean_text(&p.description);
        }
        if let Some(tags) = &p.tags {
            product.tags = clean_tags(tags);
        }
        match (p.price, p.compare_at_price) {
            (Some(price), compare_at) => product.reprice(price, compare_at)?,
            (None, Some(compare_at)) => product.set_compare_at(Some(compare_at))?,
            (None, None) => {}
        }
        product.updated_at = Utc::now();
        self.store.update_product(&product).await?;
        to_data(&product)
    }

    pub(crate) async fn update_price(&self, tenant_id: TenantId, p: &UpdatePrice) -> DomainResult<JsonValue> {
        let mut product = self.require_product(tenant_id, p.product_id).await?;
        let old_price = product.price;
        product.reprice(p.price, p.compare_at_price)?;
        product.updated_at = Utc::now();
        self.store.update_product(&product).await?;
        Ok(json!({
            "productId": product.id,
            "oldPrice": old_price,
            "price": product.price,
            "compareAtPrice": product.compare_at_price,
        }))
    }

    /// Every affected product is repriced in memory first; nothing is written unless
    /// all of them pass.
    #[instrument(skip(self, p), fields(tenant_id = %tenant_id), err)]
    pub(crate) async fn bulk_update_price(
        &self,
        tenant_id: TenantId,
        p: &BulkUpdatePrice,
    ) -> DomainResult<JsonValue> {
        let adjustment = p.adjustment();
        adjustment.validate()?;

        let products = match &p.product_ids {
            Some(ids) => {
                let mut products = Vec::with_capacity(ids.len());
                for id in ids {
                    products.push(self.require_product(tenant_id, *id).await?);
                }
                products
            }
            None => {
                self.store
                    .list_products(tenant_id, &ProductFilter::default())
                    .await?
            }
        };
        adjustment.validate_against(products.iter().map(|p| (p.name.as_str(), p.price)))?;

        let now = Utc::now();
        let mut changes = Vec::with_capacity(products.len());
        let mut repriced = Vec::with_capacity(products.len());
        for mut product in products {
            let old_price = product.price;
            let new_price = adjustment.apply(old_price).ok_or_else(|| {
                DomainError::validation(format!(
                    "adjusted price of '{}' is out of range",
                    product.name
                ))
            })?;
            product.reprice(new_price, None)?;
            product.updated_at = now;
            changes.push(json!({
                "productId": product.id,
                "name": product.name,
                "oldPrice": old_price,
                "newPrice": product.price,
            }));
            repriced.push(product);
        }
        for product in &repriced {
            self.store.update_product(product).await?;
        }
        info!(updated = repriced.len(), "bulk price update applied");
        Ok(json!({ "updated": repriced.len(), "products": changes }))
    }

    pub(crate) async fn set_product_status(
        &self,
        tenant_id: TenantId,
        p: &ProductRef,
        status: ProductStatus,
    ) -> DomainResult<JsonValue> {
        let mut product = self.require_product(tenant_id, p.product_id).await?;
        let from = product.status;
        if from == status {
            return to_data(&product);
        }
        product.status = status;
        product.updated_at = Utc::now();
        self.store.update_product(&product).await?;
        self.publisher
            .publish(&ProductEvent::StatusChanged(ProductStatusChanged {
                tenant_id,
                product_id: product.id,
                from,
                to: status,
                occurred_at: product.updated_at,
            }));
        to_data(&product)
    }

    /// Refused for products that orders reference; those must be archived.
    pub(crate) async fn delete_product(&self, tenant_id: TenantId, p: &ProductRef) -> DomainResult<JsonValue> {
        let product = self.require_product(tenant_id, p.product_id).await?;
        if self.store.product_has_orders(tenant_id, product.id).await? {
            return Err(DomainError::validation(format!(
                "product '{}' appears in existing orders; archive it instead",
                product.name
            )));
        }
        if !self.store.delete_product(tenant_id, product.id).await? {
            return Err(DomainError::not_found("product", product.id));
        }
        Ok(json!({ "productId": product.id, "deleted": true }))
    }

    /// Copies the product and its variants as a draft. Copied variants start with no
    /// stock and no SKU.
    pub(crate) async fn duplicate_product(&self, tenant_id: TenantId, p: &ProductRef) -> DomainResult<JsonValue> {
        let source = self.require_product(tenant_id, p.product_id).await?;
        let now = Utc::now();
        let copy = source.duplicate(now);
        let mut variants = Vec::new();
        for v in self.store.list_variants(tenant_id, source.id).await? {
            variants.push(Variant::new(
                tenant_id,
                copy.id,
                v.attributes.clone(),
                v.price_override,
                0,
                now,
            )?);
        }

        self.store.insert_product(&copy).await?;
        for variant in &variants {
            self.store.insert_variant(variant).await?;
        }
        self.publisher.publish(&ProductEvent::Created {
            tenant_id,
            product_id: copy.id,
            name: copy.name.clone(),
            price: copy.price,
            occurred_at: now,
        });
        Ok(json!({
            "sourceId": source.id,
            "product": to_data(&copy)?,
            "variants": to_data(&variants)?,
        }))
    }

    pub(crate) async fn create_variant(&self, tenant_id: TenantId, p: &CreateVariant) -> DomainResult<JsonValue> {
        let product = self.require_product(tenant_id, p.product_id).await?;
        if let Some(price) = p.price_override {
            validate_price(price)?;
        }
        let mut variant = Variant::new(
            tenant_id,
            product.id,
            p.attributes.clone(),
            p.price_override,
            p.stock,
            Utc::now(),
        )?;
        variant.sku = clean_text(&p.sku);
        self.store.insert_variant(&variant).await?;
        to_data(&variant)
    }

    pub(crate) async fn update_variant(&self, tenant_id: TenantId, p: &UpdateVariant) -> DomainResult<JsonValue> {
        let mut variant = self.require_variant(tenant_id, p.variant_id).await?;
        if let Some(attributes) = &p.attributes {
            if attributes.keys().any(|k| k.trim().is_empty()) {
                return Err(DomainError::validation("variant attribute names cannot be empty"));
            }
            variant.attributes = attributes.clone();
        }
        if p.clear_price_override {
            variant.price_override = None;
        } else if let Some(price) = p.price_override {
            validate_price(price)?;
            variant.price_override = Some(price);
        }
        if p.sku.is_some() {
            variant.sku = clean_text(&p.sku);
        }
        variant.updated_at = Utc::now();
        self.store.update_variant(&variant).await?;
        to_data(&variant)
    }

    pub(crate) async fn delete_variant(&self, tenant_id: TenantId, p: &VariantRef) -> DomainResult<JsonValue> {
        let variant = self.require_variant(tenant_id, p.variant_id).await?;
        if self.store.variant_has_orders(tenant_id, variant.id).await? {
            return Err(DomainError::validation(format!(
                "variant {} appears in existing orders and cannot be deleted",
                variant.id
            )));
        }
        if !self.store.delete_variant(tenant_id, variant.id).await? {
            return Err(DomainError::not_found("variant", variant.id));
        }
        Ok(json!({ "variantId": variant.id, "deleted": true }))
    }

    pub(crate) async fn create_category(&self, tenant_id: TenantId, p: &CreateCategory) -> DomainResult<JsonValue> {
        if let Some(parent) = p.parent_id {
            self.require_category(tenant_id, parent).await?;
        }
        let category = Category::new(
            tenant_id,
            &p.name,
            clean_text(&p.description),
            p.parent_id,
            Utc::now(),
        )?;
        self.store.insert_category(&category).await?;
        to_data(&category)
    }

    pub(crate) async fn update_category(&self, tenant_id: TenantId, p: &UpdateCategory) -> DomainResult<JsonValue> {
        let mut category = self.require_category(tenant_id, p.category_id).await?;
        if let Some(name) = &p.name {
            category.rename(name)?;
        }
        if p.description.is_some() {
            category.description = clean_text(&p.description);
        }
        if p.clear_parent {
            category.set_parent(None)?;
        } else if let Some(parent) = p.parent_id {
            self.check_no_cycle(tenant_id, category.id, parent).await?;
            category.set_parent(Some(parent))?;
        }
        category.updated_at = Utc::now();
        self.store.update_category(&category).await?;
        to_data(&category)
    }

    /// Walk up from `parent`; reaching `id` would close a loop.
    async fn check_no_cycle(&self, tenant_id: TenantId, id: CategoryId, parent: CategoryId) -> DomainResult<()> {
        let mut cursor = Some(parent);
        for _ in 0..MAX_CATEGORY_DEPTH {
            let Some(current) = cursor else {
                return Ok(());
            };
            if current == id {
                return Err(DomainError::validation(
                    "a category cannot be nested under itself or its descendants",
                ));
            }
            cursor = self.require_category(tenant_id, current).await?.parent_id;
        }
        Err(DomainError::validation("category nesting is too deep"))
    }

    pub(crate) async fn delete_category(&self, tenant_id: TenantId, p: &CategoryRef) -> DomainResult<JsonValue> {
        if !self.store.delete_category(tenant_id, p.category_id).await? {
            return Err(DomainError::not_found("category", p.category_id));
        }
        Ok(json!({ "categoryId": p.category_id, "deleted": true }))
    }

    pub(crate) async fn assign_category(
        &self,
        tenant_id: TenantId,
        p: &CategoryProducts,
        assign: bool,
    ) -> DomainResult<JsonValue> {
        self.require_category(tenant_id, p.category_id).await?;
        let changed = if assign {
            self.require_products(tenant_id, &p.product_ids).await?;
            self.store
                .assign_products_to_category(tenant_id, p.category_id, &p.product_ids)
                .await?
        } else {
            self.store
                .remove_products_from_category(tenant_id, p.category_id, &p.product_ids)
                .await?
        };
        Ok(json!({ "categoryId": p.category_id, "changed": changed }))
    }

    pub(crate) async fn create_collection(
        &self,
        tenant_id: TenantId,
        p: &CreateCollection,
    ) -> DomainResult<JsonValue> {
        let collection = Collection::new(tenant_id, &p.name, clean_text(&p.description), Utc::now())?;
        self.store.insert_collection(&collection).await?;
        to_data(&collection)
    }

    pub(crate) async fn update_collection(
        &self,
        tenant_id: TenantId,
        p: &UpdateCollection,
    ) -> DomainResult<JsonValue> {
        let mut collection = self.require_collection(tenant_id, p.collection_id).await?;
        if let Some(name) = &p.name {
            collection.rename(name)?;
        }
        if p.description.is_some() {
            collection.description = clean_text(&p.description);
        }
        collection.updated_at = Utc::now();
        self.store.update_collection(&collection).await?;
        to_data(&collection)
    }

    pub(crate) async fn delete_collection(&self, tenant_id: TenantId, p: &CollectionRef) -> DomainResult<JsonValue> {
        if !self.store.delete_collection(tenant_id, p.collection_id).await? {
            return Err(DomainError::not_found("collection", p.collection_id));
        }
        Ok(json!({ "collectionId": p.collection_id, "deleted": true }))
    }

    pub(crate) async fn assign_collection(
        &self,
        tenant_id: TenantId,
        p: &CollectionProducts,
        add: bool,
    ) -> DomainResult<JsonValue> {
        self.require_collection(tenant_id, p.collection_id).await?;
        let changed = if add {
            self.require_products(tenant_id, &p.product_ids).await?;
            self.store
                .add_products_to_collection(tenant_id, p.collection_id, &p.product_ids)
                .await?
        } else {
            self.store
                .remove_products_from_collection(tenant_id, p.collection_id, &p.product_ids)
                .await?
        };
        Ok(json!({ "collectionId": p.collection_id, "changed": changed }))
    }

    pub(crate) async fn attach_media(&self, tenant_id: TenantId, p: &AttachMedia) -> DomainResult<JsonValue> {
        let mut product = self.require_product(tenant_id, p.product_id).await?;
        let media = MediaRef {
            url: p.url.trim().to_string(),
            alt: clean_text(&p.alt),
        };
        product.attach_media(media, p.position)?;
        product.updated_at = Utc::now();
        self.store.update_product(&product).await?;
        to_data(&product.media)
    }

    pub(crate) async fn detach_media(&self, tenant_id: TenantId, p: &DetachMedia) -> DomainResult<JsonValue> {
        let mut product = self.require_product(tenant_id, p.product_id).await?;
        if !product.detach_media(p.url.trim()) {
            return Err(DomainError::not_found("media", &p.url));
        }
        product.updated_at = Utc::now();
        self.store.update_product(&product).await?;
        to_data(&product.media)
    }

    async fn require_category(&self, tenant_id: TenantId, id: CategoryId) -> DomainResult<Category> {
        self.store
            .get_category(tenant_id, id)
            .await?
            .ok_or_else(|| DomainError::not_found("category", id))
    }

    async fn require_collection(&self, tenant_id: TenantId, id: CollectionId) -> DomainResult<Collection> {
        self.store
            .get_collection(tenant_id, id)
            .await?
            .ok_or_else(|| DomainError::not_found("collection", id))
    }

    async fn require_products(&self, tenant_id: TenantId, ids: &[ProductId]) -> DomainResult<()> {
        if ids.is_empty() {
            return Err(DomainError::validation("no products given"));
        }
        for id in ids {
            self.require_product(tenant_id, *id).await?;
        }
        Ok(())
    }
}

use std::sync::Arc;

use serde_json::{Value as JsonValue, json};

use storecraft_core::TenantId;
use storecraft_design::{HexColor, MIN_CONTRAST, StoreConfig, contrast_ratio};
use storecraft_events::InMemoryEventSink;
use storecraft_infra::{EngineConfig, EventPublisher, InMemoryCommerceStore, StoreConfigStore};
use storecraft_sales::OrderStatus;

use crate::action::RawAction;
use crate::engine::{ActionResult, Engine};
use crate::snapshot::{OrderSummary, Snapshot};

struct Harness {
    engine: Engine,
    store: Arc<InMemoryCommerceStore>,
    sink: Arc<InMemoryEventSink>,
    tenant_id: TenantId,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryCommerceStore::new());
    let sink = Arc::new(InMemoryEventSink::new());
    let engine = Engine::new(
        store.clone(),
        EventPublisher::new(sink.clone()),
        EngineConfig::default(),
    );
    Harness {
        engine,
        store,
        sink,
        tenant_id: TenantId::new(),
    }
}

fn act(kind: &str, payload: JsonValue) -> RawAction {
    RawAction::new(kind, payload)
}

impl Harness {
    async fn run(&self, actions: Vec<RawAction>) -> Vec<ActionResult> {
        self.engine
            .run(self.tenant_id, actions, &Snapshot::default())
            .await
    }

    async fn run_ok(&self, action: RawAction) -> JsonValue {
        let mut results = self.run(vec![action]).await;
        let result = results.remove(0);
        assert!(result.success, "action failed: {:?}", result.error);
        result.data.unwrap()
    }

    /// An active product with one variant; returns (product id, variant id) as JSON.
    async fn stocked_product(&self, price: f64, stock: i64) -> (JsonValue, JsonValue) {
        let data = self
            .run_ok(act(
                "product.create",
                json!({
                    "name": "Block Print Kurta",
                    "price": price,
                    "status": "active",
                    "variants": [{ "attributes": { "size": "M" }, "stock": stock }]
                }),
            ))
            .await;
        (
            data["product"]["id"].clone(),
            data["variants"][0]["id"].clone(),
        )
    }

    async fn order(&self, product: &JsonValue, variant: &JsonValue, quantity: i64) -> JsonValue {
        self.run_ok(act(
            "order.create",
            json!({
                "customer": { "name": "Meera", "email": "meera@example.com" },
                "items": [{ "productId": product, "variantId": variant, "quantity": quantity }],
                "paymentMethod": "cod"
            }),
        ))
        .await
    }

    async fn stock(&self, product: &JsonValue) -> i64 {
        let data = self
            .run_ok(act("query.product", json!({ "productId": product })))
            .await;
        data["variants"][0]["stock"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn batch_results_follow_input_order_and_failures_do_not_abort() {
    let h = harness();
    let results = h
        .run(vec![
            act("category.create", json!({ "name": "Sarees" })),
            act("product.create", json!({ "name": "Free", "price": 0 })),
            act("collection.create", json!({ "name": "Festive" })),
        ])
        .await;

    assert_eq!(results.len(), 3);
    assert_eq!(
        results.iter().map(|r| r.success).collect::<Vec<_>>(),
        vec![true, false, true]
    );
    assert_eq!(results[0].action.kind, "category.create");
    assert_eq!(results[1].error_code.as_deref(), Some("validation_failed"));
    assert_eq!(results[2].action.kind, "collection.create");
}

#[tokio::test]
async fn unknown_and_malformed_actions_are_reported_per_action() {
    let h = harness();
    let results = h
        .run(vec![
            act("product.levitate", json!({})),
            act("stock.adjust", json!({ "delta": 3 })),
            act("query.categories", JsonValue::Null),
        ])
        .await;
    assert_eq!(results[0].error_code.as_deref(), Some("unknown_action_type"));
    assert_eq!(results[1].error_code.as_deref(), Some("validation_failed"));
    assert!(results[2].success);
    assert_eq!(results[2].data, Some(json!([])));
}

#[tokio::test]
async fn unreadable_palette_is_fixed_and_echoed() {
    let h = harness();
    let results = h
        .run(vec![act(
            "design.update_palette",
            json!({ "text": "#FFFFFF", "background": "#FAFAFA" }),
        )])
        .await;
    let result = &results[0];
    assert!(result.success);
    let data = result.data.as_ref().unwrap();
    assert_eq!(data["autoFixed"], json!(true));

    let echoed: HexColor = result.action.payload["text"].as_str().unwrap().parse().unwrap();
    assert_ne!(echoed, "#FFFFFF".parse::<HexColor>().unwrap());

    let stored = h.store.get_store_config(h.tenant_id).await.unwrap().unwrap();
    assert_eq!(stored.palette.text, echoed);
    assert!(contrast_ratio(stored.palette.text, stored.palette.background) >= MIN_CONTRAST);
}

#[tokio::test]
async fn compliant_palette_is_not_marked_fixed() {
    let h = harness();
    let data = h
        .run_ok(act("design.update_palette", json!({ "accent": "#F97316" })))
        .await;
    assert!(data.get("autoFixed").is_none());
}

#[tokio::test]
async fn design_groups_do_not_clobber_each_other() {
    let h = harness();
    h.run_ok(act("design.update_palette", json!({ "accent": "#F97316" })))
        .await;
    h.run_ok(act("design.update_fonts", json!({ "display": "Fraunces" })))
        .await;
    h.run_ok(act("store.update_settings", json!({ "name": "Chai & Co" })))
        .await;

    let config: StoreConfig = serde_json::from_value(
        h.run_ok(act("query.store_config", json!({}))).await,
    )
    .unwrap();
    assert_eq!(config.palette.accent, "#F97316".parse().unwrap());
    assert_eq!(config.fonts.display, "Fraunces");
    assert_eq!(config.fonts.body, StoreConfig::default().fonts.body);
    assert_eq!(config.identity.name, "Chai & Co");
}

#[tokio::test]
async fn bulk_markdown_beyond_100_percent_touches_nothing() {
    let h = harness();
    let (product, _) = h.stocked_product(500.0, 1).await;
    let results = h
        .run(vec![act(
            "product.bulk_update_price",
            json!({ "adjustmentType": "percentage", "adjustmentValue": -150 }),
        )])
        .await;
    assert!(!results[0].success);

    let data = h
        .run_ok(act("query.product", json!({ "productId": product })))
        .await;
    assert_eq!(data["product"]["price"].as_f64(), Some(500.0));
}

#[tokio::test]
async fn bulk_markdown_applies_to_every_product() {
    let h = harness();
    let (a, _) = h.stocked_product(1000.0, 1).await;
    let (b, _) = h.stocked_product(400.0, 1).await;
    let data = h
        .run_ok(act(
            "product.bulk_update_price",
            json!({ "adjustmentType": "percentage", "adjustmentValue": -10 }),
        ))
        .await;
    assert_eq!(data["updated"], json!(2));

    for (id, expected) in [(a, 900.0), (b, 360.0)] {
        let data = h
            .run_ok(act("query.product", json!({ "productId": id })))
            .await;
        assert_eq!(data["product"]["price"].as_f64(), Some(expected));
    }
}

#[tokio::test]
async fn order_lifecycle_consumes_and_restores_stock() {
    let h = harness();
    let (product, variant) = h.stocked_product(450.0, 10).await;

    let order = h.order(&product, &variant, 2).await;
    assert_eq!(order["status"], json!("created"));
    assert_eq!(order["total"].as_f64(), Some(900.0));
    assert_eq!(h.stock(&product).await, 8);

    let order_id = order["id"].clone();
    let cancelled = h
        .run_ok(act(
            "order.cancel",
            json!({ "orderId": order_id, "reason": "customer changed their mind" }),
        ))
        .await;
    assert_eq!(cancelled["status"], json!("cancelled"));
    assert_eq!(cancelled["notes"][0]["text"], json!("customer changed their mind"));
    assert_eq!(h.stock(&product).await, 10);

    assert_eq!(h.sink.published_of(h.tenant_id, "sales.order.created").len(), 1);
    assert_eq!(
        h.sink
            .published_of(h.tenant_id, "sales.order.status_changed")
            .len(),
        1
    );
}

#[tokio::test]
async fn illegal_transition_is_rejected_by_snapshot_or_store() {
    let h = harness();
    let (product, variant) = h.stocked_product(100.0, 5).await;
    let order = h.order(&product, &variant, 1).await;
    let order_id = order["id"].clone();

    // Snapshot pre-check.
    let snapshot = Snapshot {
        orders: vec![OrderSummary {
            id: serde_json::from_value(order_id.clone()).unwrap(),
            order_number: None,
            status: OrderStatus::Created,
        }],
        ..Snapshot::default()
    };
    let results = h
        .engine
        .run(
            h.tenant_id,
            vec![act("order.mark_paid", json!({ "orderId": order_id }))],
            &snapshot,
        )
        .await;
    assert_eq!(results[0].error_code.as_deref(), Some("invalid_transition"));

    // No snapshot: the order service refuses on the stored status.
    let results = h
        .run(vec![act("order.mark_paid", json!({ "orderId": order_id }))])
        .await;
    assert_eq!(results[0].error_code.as_deref(), Some("invalid_transition"));

    let pending = h
        .run_ok(act(
            "order.update_status",
            json!({ "orderId": order_id, "status": "payment_pending" }),
        ))
        .await;
    assert_eq!(pending["status"], json!("payment_pending"));
}

#[tokio::test]
async fn ordered_products_cannot_be_deleted() {
    let h = harness();
    let (product, variant) = h.stocked_product(100.0, 5).await;
    h.order(&product, &variant, 1).await;

    let results = h
        .run(vec![
            act("product.delete", json!({ "productId": product })),
            act("variant.delete", json!({ "variantId": variant })),
            act("product.archive", json!({ "productId": product })),
        ])
        .await;
    assert_eq!(results[0].error_code.as_deref(), Some("validation_failed"));
    assert!(results[0].error.as_deref().unwrap().contains("archive"));
    assert_eq!(results[1].error_code.as_deref(), Some("validation_failed"));
    assert!(results[2].success);
    assert_eq!(results[2].data.as_ref().unwrap()["status"], json!("archived"));
}

#[tokio::test]
async fn discount_code_is_applied_and_redeemed() {
    let h = harness();
    let (product, variant) = h.stocked_product(1000.0, 5).await;
    h.run_ok(act(
        "discount.create",
        json!({ "code": "diwali20", "type": "percentage", "value": 20, "maxDiscount": 100 }),
    ))
    .await;

    let order = h
        .run_ok(act(
            "order.create",
            json!({
                "customer": { "name": "Ravi", "phone": "+91 90000 00000" },
                "items": [{ "productId": product, "variantId": variant, "quantity": 1 }],
                "discountCode": "Diwali20"
            }),
        ))
        .await;
    assert_eq!(order["discount"].as_f64(), Some(100.0));
    assert_eq!(order["discountCode"], json!("DIWALI20"));

    let discounts = h.run_ok(act("query.discounts", json!({}))).await;
    assert_eq!(discounts[0]["usedCount"], json!(1));

    let off = h
        .run_ok(act("discount.deactivate", json!({ "code": "diwali20" })))
        .await;
    assert_eq!(off["active"], json!(false));
}

#[tokio::test]
async fn sections_can_be_added_toggled_and_reordered() {
    let h = harness();
    let added = h
        .run_ok(act(
            "section.add",
            json!({ "kind": "testimonials", "settings": { "title": "Loved by you" }, "position": 0 }),
        ))
        .await;
    let section_id = added["id"].clone();

    let toggled = h
        .run_ok(act("section.toggle", json!({ "sectionId": section_id })))
        .await;
    assert_eq!(toggled["visible"], json!(false));

    let config: StoreConfig =
        serde_json::from_value(h.run_ok(act("query.store_config", json!({}))).await).unwrap();
    let mut ids: Vec<_> = config.sections.iter().map(|s| s.id).collect();
    assert_eq!(serde_json::to_value(ids[0]).unwrap(), section_id);
    ids.reverse();
    let reordered = h
        .run_ok(act("section.reorder", json!({ "sectionIds": ids })))
        .await;
    assert_eq!(reordered.as_array().unwrap().last().unwrap()["id"], section_id);
}

#[tokio::test]
async fn tenants_never_see_each_other() {
    let h = harness();
    let (product, _) = h.stocked_product(100.0, 5).await;

    let other = TenantId::new();
    let results = h
        .engine
        .run(
            other,
            vec![
                act("query.products", json!({})),
                act("product.publish", json!({ "productId": product })),
            ],
            &Snapshot::default(),
        )
        .await;
    assert_eq!(results[0].data, Some(json!([])));
    assert_eq!(results[1].error_code.as_deref(), Some("not_found"));
}

#[tokio::test]
async fn stock_actions_go_through_the_ledger() {
    let h = harness();
    let (product, variant) = h.stocked_product(100.0, 6).await;

    let results = h
        .run(vec![
            act("stock.reserve", json!({ "variantId": variant, "quantity": 4 })),
            act("stock.update", json!({ "variantId": variant, "quantity": 3 })),
            act("stock.adjust", json!({ "variantId": variant, "delta": -2 })),
            act("stock.release", json!({ "variantId": variant, "quantity": 4 })),
            act("query.low_stock", json!({})),
        ])
        .await;
    assert!(results[0].success);
    // Cannot drop below the 4 reserved units.
    assert_eq!(results[1].error_code.as_deref(), Some("insufficient_stock"));
    assert!(results[2].success);
    assert!(results[3].success);
    assert_eq!(h.stock(&product).await, 4);

    let low = results[4].data.as_ref().unwrap();
    assert_eq!(low["variants"].as_array().unwrap().len(), 1);
    assert_eq!(h.sink.published_of(h.tenant_id, "inventory.stock.low").len(), 1);
}

#[tokio::test]
async fn cod_order_ships_with_tracking_and_counts_as_revenue() {
    let h = harness();
    let (product, variant) = h.stocked_product(150.0, 10).await;
    let order = h.order(&product, &variant, 2).await;
    let order_id = order["id"].clone();

    let results = h
        .run(vec![
            act("order.confirm_cod", json!({ "orderId": order_id })),
            act("order.update_status", json!({ "orderId": order_id, "status": "processing" })),
            act(
                "order.ship",
                json!({ "orderId": order_id, "carrier": "Delhivery", "trackingNumber": "DL123" }),
            ),
        ])
        .await;
    assert!(results.iter().all(|r| r.success), "{results:?}");
    let shipped = results[2].data.as_ref().unwrap();
    assert_eq!(shipped["fulfillmentStatus"], json!("partially_fulfilled"));
    assert_eq!(shipped["tracking"]["carrier"], json!("Delhivery"));
    assert_eq!(shipped["tracking"]["number"], json!("DL123"));

    let delivered = h
        .run_ok(act("order.mark_delivered", json!({ "orderId": order_id })))
        .await;
    assert_eq!(delivered["fulfillmentStatus"], json!("fulfilled"));

    let by_number = h
        .run_ok(act("query.order", json!({ "orderNumber": order["orderNumber"] })))
        .await;
    assert_eq!(by_number["id"], order_id);
    assert_eq!(by_number["status"], json!("delivered"));

    let summary = h.run_ok(act("query.sales_summary", json!({}))).await;
    assert_eq!(summary["orderCount"], json!(1));
    assert_eq!(summary["revenueOrderCount"], json!(1));
    assert_eq!(summary["revenue"].as_f64(), Some(300.0));
    assert_eq!(summary["byStatus"]["delivered"], json!(1));
}

#[tokio::test]
async fn categories_refuse_cycles_and_filter_products() {
    let h = harness();
    let (product, _) = h.stocked_product(100.0, 5).await;

    let parent = h
        .run_ok(act("category.create", json!({ "name": "Apparel" })))
        .await;
    let child = h
        .run_ok(act(
            "category.create",
            json!({ "name": "Kurtas", "parentId": parent["id"] }),
        ))
        .await;
    assert_eq!(child["parentId"], parent["id"]);

    let results = h
        .run(vec![
            act(
                "category.update",
                json!({ "categoryId": parent["id"], "parentId": child["id"] }),
            ),
            act(
                "category.assign_products",
                json!({ "categoryId": child["id"], "productIds": [product] }),
            ),
            act("query.products", json!({ "categoryId": child["id"] })),
            act("query.products", json!({ "categoryId": parent["id"] })),
        ])
        .await;
    assert_eq!(results[0].error_code.as_deref(), Some("validation_failed"));
    assert!(results[1].success);
    assert_eq!(results[2].data.as_ref().unwrap().as_array().unwrap().len(), 1);
    assert_eq!(results[3].data, Some(json!([])));
}

#[tokio::test]
async fn duplicate_starts_as_an_empty_draft() {
    let h = harness();
    let (product, _) = h.stocked_product(799.0, 12).await;

    let copy = h
        .run_ok(act("product.duplicate", json!({ "productId": product })))
        .await;
    assert_eq!(copy["sourceId"], product);
    assert_eq!(copy["product"]["name"], json!("Block Print Kurta (Copy)"));
    assert_eq!(copy["product"]["status"], json!("draft"));
    assert_ne!(copy["product"]["id"], product);
    assert_eq!(copy["variants"][0]["stock"], json!(0));
    assert_eq!(h.stock(&product).await, 12);
}

#[tokio::test]
async fn media_is_attached_in_order_and_detached_by_url() {
    let h = harness();
    let (product, _) = h.stocked_product(100.0, 1).await;

    let results = h
        .run(vec![
            act("media.attach", json!({ "productId": product, "url": "https://cdn.example/a.jpg" })),
            act(
                "media.attach",
                json!({ "productId": product, "url": "https://cdn.example/b.jpg", "position": 0 }),
            ),
            act("media.detach", json!({ "productId": product, "url": "https://cdn.example/a.jpg" })),
            act("media.detach", json!({ "productId": product, "url": "https://cdn.example/a.jpg" })),
        ])
        .await;
    assert_eq!(results[1].data.as_ref().unwrap()[0]["url"], json!("https://cdn.example/b.jpg"));
    assert_eq!(
        results[2].data,
        Some(json!([{ "url": "https://cdn.example/b.jpg", "alt": null }]))
    );
    assert_eq!(results[3].error_code.as_deref(), Some("not_found"));
}

#[tokio::test]
async fn unrepresentable_order_total_fails_without_persisting() {
    let h = harness();
    let (product, _) = h.stocked_product(1000.0, 5).await;

    let results = h
        .run(vec![
            act(
                "order.create",
                json!({
                    "customer": { "name": "Meera", "phone": "+91 90000 00000" },
                    "items": [{ "productId": product, "quantity": 100_000_000_000_000i64 }],
                    "paymentMethod": "cod"
                }),
            ),
            act("query.orders", json!({})),
        ])
        .await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].error_code.as_deref(), Some("validation_failed"));
    assert!(results[1].success);
    assert_eq!(results[1].data, Some(json!([])));
    assert!(h.sink.published_of(h.tenant_id, "sales.order.created").is_empty());
}

#[tokio::test]
async fn extreme_stock_deltas_fail_per_action() {
    let h = harness();
    let (product, variant) = h.stocked_product(100.0, 6).await;

    let results = h
        .run(vec![
            act("stock.adjust", json!({ "variantId": variant, "delta": i64::MAX })),
            act("stock.adjust", json!({ "variantId": variant, "delta": i64::MIN })),
            act("query.low_stock", json!({})),
        ])
        .await;
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].error_code.as_deref(), Some("validation_failed"));
    assert_eq!(results[1].error_code.as_deref(), Some("insufficient_stock"));
    assert!(results[2].success);
    assert_eq!(h.stock(&product).await, 6);
}

#[tokio::test]
async fn bulk_markup_that_cannot_be_represented_touches_nothing() {
    let h = harness();
    let (product, _) = h.stocked_product(500.0, 1).await;

    let results = h
        .run(vec![
            act(
                "product.bulk_update_price",
                json!({ "adjustmentType": "percentage", "adjustmentValue": 1e20 }),
            ),
            act(
                "product.bulk_update_price",
                json!({ "adjustmentType": "flat", "adjustmentValue": 1e18 }),
            ),
        ])
        .await;
    assert_eq!(results[0].error_code.as_deref(), Some("validation_failed"));
    assert_eq!(results[1].error_code.as_deref(), Some("validation_failed"));

    let data = h
        .run_ok(act("query.product", json!({ "productId": product })))
        .await;
    assert_eq!(data["product"]["price"].as_f64(), Some(500.0));
}

#[tokio::test]
async fn palette_is_checked_against_the_stored_background_not_a_stale_snapshot() {
    let h = harness();
    h.run_ok(act("design.update_palette", json!({ "background": "#111111" })))
        .await;

    // The default snapshot still has a white background, so validation passes this.
    let data = h
        .run_ok(act("design.update_palette", json!({ "text": "#222222" })))
        .await;
    assert!(data.get("autoFixed").is_none());
    assert_eq!(data["contrastFixes"][0]["slot"], json!("text"));

    let stored = h.store.get_store_config(h.tenant_id).await.unwrap().unwrap();
    let background: HexColor = "#111111".parse().unwrap();
    assert_eq!(stored.palette.background, background);
    assert_ne!(stored.palette.text, "#222222".parse::<HexColor>().unwrap());
    assert!(contrast_ratio(stored.palette.text, background) >= MIN_CONTRAST);
}

#[tokio::test]
async fn returned_to_origin_restocks_and_marks_fulfillment_returned() {
    let h = harness();
    let (product, variant) = h.stocked_product(250.0, 10).await;
    let order = h.order(&product, &variant, 3).await;
    let order_id = order["id"].clone();
    assert_eq!(h.stock(&product).await, 7);

    let results = h
        .run(vec![
            act("order.confirm_cod", json!({ "orderId": order_id })),
            act("order.update_status", json!({ "orderId": order_id, "status": "processing" })),
            act(
                "order.ship",
                json!({ "orderId": order_id, "carrier": "Delhivery", "trackingNumber": "DL987" }),
            ),
            act("order.update_status", json!({ "orderId": order_id, "status": "rto" })),
        ])
        .await;
    assert!(results.iter().all(|r| r.success), "{results:?}");
    let returned = results[3].data.as_ref().unwrap();
    assert_eq!(returned["status"], json!("rto"));
    assert_eq!(returned["fulfillmentStatus"], json!("returned"));
    assert_eq!(h.stock(&product).await, 10);

    // Terminal for stock purposes: a refund does not restock a second time.
    h.run_ok(act(
        "order.update_status",
        json!({ "orderId": order_id, "status": "refunded" }),
    ))
    .await;
    assert_eq!(h.stock(&product).await, 10);
}

mod property_tests {
    use proptest::prelude::*;

    use super::*;

    const KINDS: [&str; 6] = [
        "query.categories",
        "query.discounts",
        "query.products",
        "category.create",
        "product.levitate",
        "stock.adjust",
    ];

    fn payload_for(kind: &str) -> JsonValue {
        match kind {
            "category.create" => json!({ "name": "Festive" }),
            "stock.adjust" => json!({ "delta": 1 }),
            _ => json!({}),
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 32,
            ..ProptestConfig::default()
        })]

        /// Property: any batch yields exactly one result per action, in input order,
        /// whatever mix of successes and failures it contains.
        #[test]
        fn one_result_per_action_in_input_order(
            picks in prop::collection::vec(0usize..KINDS.len(), 0..12)
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let kinds: Vec<&str> = picks.iter().map(|&i| KINDS[i]).collect();
            let results = runtime.block_on(async {
                let h = harness();
                h.run(kinds.iter().map(|k| act(k, payload_for(k))).collect()).await
            });

            prop_assert_eq!(results.len(), kinds.len());
            for (result, kind) in results.iter().zip(&kinds) {
                prop_assert_eq!(result.action.kind.as_str(), *kind);
                prop_assert_eq!(result.success, result.error_code.is_none());
                let expect_success = !matches!(*kind, "product.levitate" | "stock.adjust");
                prop_assert_eq!(result.success, expect_success);
            }
        }
    }
}

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use serde_json::json;

use storecraft_core::{Money, OrderId, ProductId};
use storecraft_engine::{Action, OrderSummary, ProductSummary, RawAction, Snapshot, validate};
use storecraft_sales::OrderStatus;

fn action(kind: &str, payload: serde_json::Value) -> Action {
    Action::from_raw(&RawAction::new(kind, payload)).expect("valid bench action")
}

fn bench_palette_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("palette_validation");
    let snapshot = Snapshot::default();

    let compliant = action("design.update_palette", json!({ "text": "#111111", "background": "#FFFFFF" }));
    group.bench_function("compliant", |b| {
        b.iter(|| validate(black_box(&compliant), &snapshot))
    });

    let washed_out = action("design.update_palette", json!({ "text": "#FFFFFF", "background": "#FAFAFA" }));
    group.bench_function("needs_correction", |b| {
        b.iter(|| validate(black_box(&washed_out), &snapshot))
    });
    group.finish();
}

fn bench_bulk_price_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("bulk_price_validation");
    let markdown = action(
        "product.bulk_update_price",
        json!({ "adjustmentType": "flat", "adjustmentValue": -50 }),
    );

    for product_count in [10usize, 100, 1_000] {
        let snapshot = Snapshot {
            products: (0..product_count)
                .map(|i| ProductSummary {
                    id: ProductId::new(),
                    name: format!("Product {i}"),
                    price: Money::from_minor(10_000 + i as i64 * 100),
                    compare_at_price: None,
                    status: None,
                })
                .collect(),
            ..Snapshot::default()
        };
        group.throughput(Throughput::Elements(product_count as u64));
        group.bench_with_input(
            BenchmarkId::new("flat_markdown", product_count),
            &snapshot,
            |b, snapshot| b.iter(|| validate(black_box(&markdown), snapshot)),
        );
    }
    group.finish();
}

fn bench_order_transition_check(c: &mut Criterion) {
    let id = OrderId::new();
    let snapshot = Snapshot {
        orders: vec![OrderSummary {
            id,
            order_number: None,
            status: OrderStatus::Processing,
        }],
        ..Snapshot::default()
    };
    let ship = action("order.ship", json!({ "orderId": id, "carrier": "Delhivery" }));
    c.bench_function("order_transition_check", |b| {
        b.iter(|| validate(black_box(&ship), &snapshot))
    });
}

fn bench_structural_decode(c: &mut Criterion) {
    let raw = RawAction::new(
        "product.create",
        json!({
            "name": "Handloom Saree",
            "price": 2499,
            "compareAtPrice": 2999,
            "tags": ["silk", "festive"],
            "variants": [{ "attributes": { "color": "maroon" }, "stock": 12 }]
        }),
    );
    c.bench_function("decode_product_create", |b| {
        b.iter(|| Action::from_raw(black_box(&raw)))
    });
}

criterion_group!(
    benches,
    bench_palette_validation,
    bench_bulk_price_validation,
    bench_order_transition_check,
    bench_structural_decode
);
criterion_main!(benches);

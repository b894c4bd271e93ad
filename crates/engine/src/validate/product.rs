use storecraft_catalog::{validate_price, validate_price_pair};
use storecraft_core::{DomainError, DomainResult};

use super::Verdict;
use crate::action::Action;
use crate::snapshot::Snapshot;

/// Price sanity for every action that sets a price. Never auto-corrects.
pub fn validate_product(action: &Action, snapshot: &Snapshot) -> Verdict {
    Verdict::from_result(check(action, snapshot))
}

fn check(action: &Action, snapshot: &Snapshot) -> DomainResult<()> {
    match action {
        Action::ProductCreate(p) => {
            validate_price_pair(p.price, p.compare_at_price)?;
            for variant in &p.variants {
                if let Some(price) = variant.price_override {
                    validate_price(price)?;
                }
            }
            Ok(())
        }
        Action::ProductUpdate(p) => match (p.price, p.compare_at_price) {
            (Some(price), compare_at) => validate_price_pair(price, compare_at),
            (None, Some(compare_at)) => match snapshot.product(p.product_id) {
                Some(known) => validate_price_pair(known.price, Some(compare_at)),
                None => Ok(()),
            },
            (None, None) => Ok(()),
        },
        Action::ProductUpdatePrice(p) => validate_price_pair(p.price, p.compare_at_price),
        Action::ProductBulkUpdatePrice(p) => {
            if matches!(&p.product_ids, Some(ids) if ids.is_empty()) {
                return Err(DomainError::validation("bulk price update names no products"));
            }
            let adjustment = p.adjustment();
            adjustment.validate_against(
                snapshot
                    .products
                    .iter()
                    .filter(|known| p.covers(known.id))
                    .map(|known| (known.name.as_str(), known.price)),
            )
        }
        Action::VariantCreate(v) => v.price_override.map_or(Ok(()), validate_price),
        Action::VariantUpdate(v) => v.price_override.map_or(Ok(()), validate_price),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use storecraft_core::{Money, ProductId};

    use crate::action::RawAction;
    use crate::snapshot::ProductSummary;

    fn action(kind: &str, payload: serde_json::Value) -> Action {
        Action::from_raw(&RawAction::new(kind, payload)).unwrap()
    }

    fn rejected(action: &Action, snapshot: &Snapshot) -> bool {
        matches!(
            validate_product(action, snapshot),
            Verdict::Invalid(DomainError::Validation(_))
        )
    }

    #[test]
    fn create_enforces_price_rules() {
        let none = Snapshot::default();
        assert!(rejected(&action("product.create", json!({ "name": "A", "price": 0 })), &none));
        assert!(rejected(
            &action("product.create", json!({ "name": "A", "price": 1_000_001 })),
            &none
        ));
        assert!(rejected(
            &action("product.create", json!({ "name": "A", "price": 500, "compareAtPrice": 500 })),
            &none
        ));
        assert!(rejected(
            &action(
                "product.create",
                json!({ "name": "A", "price": 500, "variants": [{ "priceOverride": -1 }] })
            ),
            &none
        ));
        assert_eq!(
            validate_product(
                &action("product.create", json!({ "name": "A", "price": 500, "compareAtPrice": 650 })),
                &none
            ),
            Verdict::Valid
        );
    }

    #[test]
    fn compare_at_alone_is_checked_against_the_known_price() {
        let id = ProductId::new();
        let snapshot = Snapshot {
            products: vec![ProductSummary {
                id,
                name: "Shirt".into(),
                price: Money::from_minor(80_000),
                compare_at_price: None,
                status: None,
            }],
            ..Snapshot::default()
        };
        let update = action("product.update", json!({ "productId": id, "compareAtPrice": 700 }));
        assert!(rejected(&update, &snapshot));
        // Unknown product: the executor decides.
        assert!(!rejected(&update, &Snapshot::default()));
    }

    #[test]
    fn bulk_markdown_of_150_percent_is_rejected_without_any_products() {
        let bulk = action(
            "product.bulk_update_price",
            json!({ "adjustmentType": "percentage", "adjustmentValue": -150 }),
        );
        assert!(rejected(&bulk, &Snapshot::default()));
    }

    #[test]
    fn bulk_flat_markdown_is_checked_against_known_products() {
        let cheap = ProductId::new();
        let snapshot = Snapshot {
            products: vec![
                ProductSummary {
                    id: ProductId::new(),
                    name: "Lamp".into(),
                    price: Money::from_minor(200_000),
                    compare_at_price: None,
                    status: None,
                },
                ProductSummary {
                    id: cheap,
                    name: "Coaster".into(),
                    price: Money::from_minor(9_900),
                    compare_at_price: None,
                    status: None,
                },
            ],
            ..Snapshot::default()
        };
        let everything = action(
            "product.bulk_update_price",
            json!({ "adjustmentType": "flat", "adjustmentValue": -100 }),
        );
        assert!(rejected(&everything, &snapshot));

        let others = action(
            "product.bulk_update_price",
            json!({
                "adjustmentType": "flat",
                "adjustmentValue": -100,
                "productIds": [snapshot.products[0].id]
            }),
        );
        assert_eq!(validate_product(&others, &snapshot), Verdict::Valid);
    }

    #[test]
    fn variant_override_must_be_a_valid_price() {
        let create = action(
            "variant.create",
            json!({ "productId": ProductId::new(), "priceOverride": 0 }),
        );
        assert!(rejected(&create, &Snapshot::default()));
    }
}

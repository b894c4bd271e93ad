//! The action catalogue.
//!
//! An action arrives as a [`RawAction`] (`{type, payload}`); structural validation turns
//! it into a typed [`Action`] with one payload type per kind. [`ActionKind`] is the
//! tag table.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use storecraft_core::{DomainError, DomainResult, OrderId};
use storecraft_design::{FontsPatch, FooterPatch, HeroPatch, IdentityPatch, NavPatch, PalettePatch};
use storecraft_infra::NewOrder;
use storecraft_sales::OrderStatus;

use crate::payload::*;

/// An action as proposed by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAction {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: JsonValue,
}

impl RawAction {
    pub fn new(kind: impl Into<String>, payload: JsonValue) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }
}

macro_rules! action_catalogue {
    ($( $variant:ident($payload:ty) => $tag:literal, )+) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ActionKind {
            $( $variant, )+
        }

        impl ActionKind {
            pub const ALL: &'static [ActionKind] = &[ $( ActionKind::$variant, )+ ];

            pub fn as_str(self) -> &'static str {
                match self {
                    $( ActionKind::$variant => $tag, )+
                }
            }
        }

        #[derive(Debug, Clone, PartialEq)]
        pub enum Action {
            $( $variant($payload), )+
        }

        impl Action {
            pub fn kind(&self) -> ActionKind {
                match self {
                    $( Action::$variant(_) => ActionKind::$variant, )+
                }
            }

            fn decode(kind: ActionKind, payload: JsonValue) -> Result<Action, serde_json::Error> {
                Ok(match kind {
                    $( ActionKind::$variant => Action::$variant(serde_json::from_value(payload)?), )+
                })
            }

            fn encode_payload(&self) -> Result<JsonValue, serde_json::Error> {
                match self {
                    $( Action::$variant(p) => serde_json::to_value(p), )+
                }
            }
        }
    };
}

action_catalogue! {
    StoreUpdateSettings(IdentityPatch) => "store.update_settings",
    StoreUpdateLogo(UpdateLogo) => "store.update_logo",
    DesignUpdatePalette(PalettePatch) => "design.update_palette",
    DesignUpdateFonts(FontsPatch) => "design.update_fonts",
    DesignUpdateHero(HeroPatch) => "design.update_hero",
    DesignUpdateNav(NavPatch) => "design.update_nav",
    DesignUpdateFooter(FooterPatch) => "design.update_footer",
    DesignReset(NoArgs) => "design.reset",

    SectionAdd(AddSection) => "section.add",
    SectionUpdate(UpdateSection) => "section.update",
    SectionRemove(SectionRef) => "section.remove",
    SectionReorder(ReorderSections) => "section.reorder",
    SectionToggle(ToggleSection) => "section.toggle",

    ProductCreate(CreateProduct) => "product.create",
    ProductUpdate(UpdateProduct) => "product.update",
    ProductUpdatePrice(UpdatePrice) => "product.update_price",
    ProductBulkUpdatePrice(BulkUpdatePrice) => "product.bulk_update_price",
    ProductPublish(ProductRef) => "product.publish",
    ProductUnpublish(ProductRef) => "product.unpublish",
    ProductArchive(ProductRef) => "product.archive",
    ProductDelete(ProductRef) => "product.delete",
    ProductDuplicate(ProductRef) => "product.duplicate",

    VariantCreate(CreateVariant) => "variant.create",
    VariantUpdate(UpdateVariant) => "variant.update",
    VariantDelete(VariantRef) => "variant.delete",
    StockUpdate(SetStock) => "stock.update",
    StockAdjust(AdjustStock) => "stock.adjust",
    StockReserve(StockQuantity) => "stock.reserve",
    StockRelease(StockQuantity) => "stock.release",

    CategoryCreate(CreateCategory) => "category.create",
    CategoryUpdate(UpdateCategory) => "category.update",
    CategoryDelete(CategoryRef) => "category.delete",
    CategoryAssignProducts(CategoryProducts) => "category.assign_products",
    CategoryRemoveProducts(CategoryProducts) => "category.remove_products",

    CollectionCreate(CreateCollection) => "collection.create",
    CollectionUpdate(UpdateCollection) => "collection.update",
    CollectionDelete(CollectionRef) => "collection.delete",
    CollectionAddProducts(CollectionProducts) => "collection.add_products",
    CollectionRemoveProducts(CollectionProducts) => "collection.remove_products",

    OrderCreate(NewOrder) => "order.create",
    OrderUpdateStatus(UpdateOrderStatus) => "order.update_status",
    OrderConfirmCod(OrderRef) => "order.confirm_cod",
    OrderMarkPaid(OrderRef) => "order.mark_paid",
    OrderShip(ShipOrder) => "order.ship",
    OrderMarkDelivered(OrderRef) => "order.mark_delivered",
    OrderCancel(OrderRef) => "order.cancel",
    OrderRefund(OrderRef) => "order.refund",
    OrderAddNote(AddOrderNote) => "order.add_note",

    DiscountCreate(CreateDiscount) => "discount.create",
    DiscountUpdate(UpdateDiscount) => "discount.update",
    DiscountActivate(DiscountRef) => "discount.activate",
    DiscountDeactivate(DiscountRef) => "discount.deactivate",

    MediaAttach(AttachMedia) => "media.attach",
    MediaDetach(DetachMedia) => "media.detach",
    MediaSetHeroImage(SetHeroImage) => "media.set_hero_image",

    QueryProducts(QueryProducts) => "query.products",
    QueryProduct(ProductRef) => "query.product",
    QueryOrders(QueryOrders) => "query.orders",
    QueryOrder(QueryOrder) => "query.order",
    QueryLowStock(QueryLowStock) => "query.low_stock",
    QueryDiscounts(NoArgs) => "query.discounts",
    QueryCategories(NoArgs) => "query.categories",
    QueryCollections(NoArgs) => "query.collections",
    QuerySalesSummary(QuerySalesSummary) => "query.sales_summary",
    QueryStoreConfig(NoArgs) => "query.store_config",
}

fn tag_table() -> &'static HashMap<&'static str, ActionKind> {
    static TABLE: OnceLock<HashMap<&'static str, ActionKind>> = OnceLock::new();
    TABLE.get_or_init(|| ActionKind::ALL.iter().map(|k| (k.as_str(), *k)).collect())
}

impl ActionKind {
    pub fn from_tag(tag: &str) -> Option<ActionKind> {
        tag_table().get(tag).copied()
    }

    pub fn is_query(self) -> bool {
        self.as_str().starts_with("query.")
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Action {
    /// Structural validation: known tag, payload of the right shape.
    pub fn from_raw(raw: &RawAction) -> DomainResult<Action> {
        let kind = ActionKind::from_tag(raw.kind.trim())
            .ok_or_else(|| DomainError::UnknownActionType(raw.kind.clone()))?;
        let payload = match &raw.payload {
            JsonValue::Null => JsonValue::Object(Default::default()),
            other => other.clone(),
        };
        Action::decode(kind, payload).map_err(|e| {
            DomainError::validation(format!("invalid payload for {kind}: {e}"))
        })
    }

    pub fn to_raw(&self) -> DomainResult<RawAction> {
        let payload = self
            .encode_payload()
            .map_err(|e| DomainError::Persistence(format!("cannot encode action: {e}")))?;
        Ok(RawAction::new(self.kind().as_str(), payload))
    }

    /// The order and target status, for actions that move an order.
    pub fn order_transition(&self) -> Option<(OrderId, OrderStatus)> {
        match self {
            Action::OrderUpdateStatus(p) => Some((p.order_id, p.status)),
            Action::OrderConfirmCod(p) => Some((p.order_id, OrderStatus::CodConfirmed)),
            Action::OrderMarkPaid(p) => Some((p.order_id, OrderStatus::Paid)),
            Action::OrderShip(p) => Some((p.order_id, OrderStatus::Shipped)),
            Action::OrderMarkDelivered(p) => Some((p.order_id, OrderStatus::Delivered)),
            Action::OrderCancel(p) => Some((p.order_id, OrderStatus::Cancelled)),
            Action::OrderRefund(p) => Some((p.order_id, OrderStatus::Refunded)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn tags_are_unique_and_round_trip() {
        let tags: HashSet<&str> = ActionKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(tags.len(), ActionKind::ALL.len());
        for kind in ActionKind::ALL {
            assert_eq!(ActionKind::from_tag(kind.as_str()), Some(*kind));
        }
    }

    #[test]
    fn unknown_type_is_reported_as_such() {
        let err = Action::from_raw(&RawAction::new("product.teleport", json!({}))).unwrap_err();
        assert_eq!(err, DomainError::UnknownActionType("product.teleport".into()));
    }

    #[test]
    fn malformed_payload_is_a_validation_failure() {
        let raw = RawAction::new("stock.adjust", json!({ "variantId": "not-a-uuid", "delta": 1 }));
        let err = Action::from_raw(&raw).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("stock.adjust")));
    }

    #[test]
    fn null_payload_is_accepted_for_argument_free_actions() {
        let raw = RawAction::new("design.reset", JsonValue::Null);
        assert_eq!(Action::from_raw(&raw).unwrap(), Action::DesignReset(NoArgs {}));
    }

    #[test]
    fn money_fields_accept_major_units() {
        let raw = RawAction::new(
            "product.create",
            json!({ "name": "Kurta", "price": 1299.5, "compareAtPrice": "1599" }),
        );
        let Action::ProductCreate(p) = Action::from_raw(&raw).unwrap() else {
            panic!("wrong action");
        };
        assert_eq!(p.price.minor(), 129_950);
        assert_eq!(p.compare_at_price.map(|m| m.minor()), Some(159_900));
    }

    #[test]
    fn typed_action_encodes_back_to_its_tag() {
        let raw = RawAction::new("design.update_palette", json!({ "accent": "#FF8800" }));
        let action = Action::from_raw(&raw).unwrap();
        let back = action.to_raw().unwrap();
        assert_eq!(back.kind, "design.update_palette");
        assert_eq!(back.payload, json!({ "accent": "#FF8800" }));
    }

    #[test]
    fn fixed_target_transitions_are_recognised() {
        let id = OrderId::new();
        let raw = RawAction::new("order.cancel", json!({ "orderId": id }));
        let action = Action::from_raw(&raw).unwrap();
        assert_eq!(action.order_transition(), Some((id, OrderStatus::Cancelled)));
    }
}

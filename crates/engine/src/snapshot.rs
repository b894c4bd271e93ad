//! Caller-supplied view of recent tenant state.
//!
//! Only validators read it. It may be stale or partial; handlers always re-read the
//! store.

use serde::{Deserialize, Serialize};

use storecraft_catalog::ProductStatus;
use storecraft_core::{Money, OrderId, ProductId};
use storecraft_design::{Palette, StoreConfig};
use storecraft_sales::OrderStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub compare_at_price: Option<Money>,
    #[serde(default)]
    pub status: Option<ProductStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: OrderId,
    #[serde(default)]
    pub order_number: Option<String>,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    pub products: Vec<ProductSummary>,
    pub orders: Vec<OrderSummary>,
    pub store_config: Option<StoreConfig>,
}

impl Snapshot {
    pub fn product(&self, id: ProductId) -> Option<&ProductSummary> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn order_status(&self, id: OrderId) -> Option<OrderStatus> {
        self.orders.iter().find(|o| o.id == id).map(|o| o.status)
    }

    /// The current palette, or the default one when no config was supplied.
    pub fn palette(&self) -> Palette {
        self.store_config
            .as_ref()
            .map(|c| c.palette)
            .unwrap_or_default()
    }
}

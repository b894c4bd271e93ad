//! Infrastructure layer: persistence, the store-backed inventory ledger and order
//! service, event publication and engine configuration.

pub mod config;
pub mod ledger;
pub mod orders;
pub mod publisher;
pub mod store;

pub use config::EngineConfig;
pub use ledger::InventoryLedger;
pub use orders::{NewOrder, OrderLineRequest, OrderService};
pub use publisher::EventPublisher;
pub use store::{
    CommerceStore, DiscountStore, InMemoryCommerceStore, OrderFilter, OrderStore,
    PostgresCommerceStore, ProductFilter, ProductStore, StoreConfigStore, StoreError,
    StoreResult, TaxonomyStore, VariantStore,
};

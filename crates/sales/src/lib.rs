//! Sales domain module: orders, totals and the order state machine.
//!
//! Pure domain logic (no IO, no HTTP, no storage). Persisting an order and the
//! inventory side effects of a transition are the infrastructure layer's job.

pub mod order;
pub mod status;

pub use order::{
    Customer, LineItem, LineSnapshot, Order, OrderCreated, OrderDetails, OrderEvent, OrderNote,
    OrderStatusChanged, OrderTotals, PricingRules, SalesSummary, Tracking, format_order_number,
    order_period,
};
pub use status::{
    FulfillmentStatus, OrderStatus, PaymentMethod, PaymentStatus, TransitionEffects,
};

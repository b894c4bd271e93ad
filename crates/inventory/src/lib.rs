//! Inventory domain module.
//!
//! Per-variant stock and reservation bookkeeping, implemented purely as deterministic
//! arithmetic (no IO, no storage). The store-backed, atomic ledger service lives in
//! `storecraft-infra` and delegates every decision to [`StockOp::apply`].

pub mod alert;
pub mod ledger;
pub mod variant;

pub use alert::{StockAlert, StockAlertRaised, StockEvent};
pub use ledger::{StockError, StockLevel, StockOp};
pub use variant::Variant;

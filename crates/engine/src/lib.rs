//! Action validation and execution for multi-tenant commerce.
//!
//! A caller proposes a batch of `{type, payload}` actions for one tenant. Each action is
//! decoded into a typed [`Action`], checked (and possibly repaired) by the validators
//! against the caller's [`Snapshot`], then executed against the store. One
//! [`ActionResult`] comes back per action, in input order.

pub mod action;
pub mod engine;
mod executor;
pub mod payload;
pub mod snapshot;
pub mod validate;

#[cfg(test)]
mod batch_tests;

pub use action::{Action, ActionKind, RawAction};
pub use engine::{ActionResult, Engine};
pub use snapshot::{OrderSummary, ProductSummary, Snapshot};
pub use validate::{Verdict, validate};

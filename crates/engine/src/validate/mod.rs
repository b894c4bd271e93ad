//! Pre-execution validators.
//!
//! Each family looks at a structurally valid [`Action`] plus the caller's [`Snapshot`]
//! and either lets it through, repairs it, or rejects it. Validators never touch the
//! store.

mod design;
mod order;
mod product;

use serde_json::Value as JsonValue;

use storecraft_core::DomainError;

use crate::action::Action;
use crate::snapshot::Snapshot;

pub use design::validate_design;
pub use order::validate_order;
pub use product::validate_product;

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Valid,
    /// Execute `action` instead of the one proposed.
    Fixed { action: Action, details: JsonValue },
    Invalid(DomainError),
}

impl Verdict {
    fn from_result(result: Result<(), DomainError>) -> Verdict {
        match result {
            Ok(()) => Verdict::Valid,
            Err(err) => Verdict::Invalid(err),
        }
    }
}

/// Run the validator family that owns this action, if any.
pub fn validate(action: &Action, snapshot: &Snapshot) -> Verdict {
    let verdict = validate_design(action, snapshot);
    if verdict != Verdict::Valid {
        return verdict;
    }
    let verdict = validate_product(action, snapshot);
    if verdict != Verdict::Valid {
        return verdict;
    }
    validate_order(action, snapshot)
}

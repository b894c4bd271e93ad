//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every failure the engine can produce is scoped to one action (or one order line);
/// none of these is fatal to the process. The `Display` form is the human-readable
/// message returned to the caller in a per-action result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Structural or business-rule rejection; no mutation was attempted.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The order state machine does not allow `from -> to`.
    #[error("invalid order transition: {from} -> {to} (allowed: {})", join_or_none(.allowed))]
    InvalidTransition {
        from: String,
        to: String,
        allowed: Vec<String>,
    },

    /// The inventory ledger cannot satisfy the requested quantity.
    #[error("insufficient stock for variant {variant_id}: requested {requested}, available {available}")]
    InsufficientStock {
        variant_id: String,
        requested: i64,
        available: i64,
    },

    /// Referenced entity is absent in the tenant's scope.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The action `type` tag has no registered handler.
    #[error("unknown action type: {0}")]
    UnknownActionType(String),

    /// A compare-and-swap write kept losing to concurrent writers.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The action exceeded its time budget.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The underlying store failed.
    #[error("persistence error: {0}")]
    Persistence(String),
}

fn join_or_none(allowed: &[String]) -> String {
    if allowed.is_empty() {
        "none".to_string()
    } else {
        allowed.join(", ")
    }
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn insufficient_stock(variant_id: impl ToString, requested: i64, available: i64) -> Self {
        Self::InsufficientStock {
            variant_id: variant_id.to_string(),
            requested,
            available,
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Stable machine-readable code for this error category.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation_failed",
            DomainError::InvalidTransition { .. } => "invalid_transition",
            DomainError::InsufficientStock { .. } => "insufficient_stock",
            DomainError::NotFound { .. } => "not_found",
            DomainError::UnknownActionType(_) => "unknown_action_type",
            DomainError::Conflict(_) => "conflict",
            DomainError::Timeout(_) => "timeout",
            DomainError::Persistence(_) => "persistence_error",
        }
    }
}

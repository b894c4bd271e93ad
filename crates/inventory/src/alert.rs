//! Low/zero stock threshold detection and the events it raises.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storecraft_core::{ProductId, TenantId, VariantId};
use storecraft_events::Event;

use crate::ledger::StockLevel;

/// A threshold crossing caused by a single ledger write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StockAlert {
    /// `available` moved from above the threshold to at-or-below it (but not zero).
    Low { available: i64, threshold: i64 },
    /// `available` reached zero from above zero.
    Depleted,
}

impl StockAlert {
    /// Compare the level before and after a write.
    ///
    /// Only downward crossings alert; a write that stays below the threshold or moves
    /// upward is silent.
    pub fn detect(before: StockLevel, after: StockLevel, threshold: i64) -> Option<StockAlert> {
        let (was, now) = (before.available(), after.available());
        if now >= was {
            return None;
        }
        if now == 0 && was > 0 {
            return Some(StockAlert::Depleted);
        }
        if now <= threshold && was > threshold {
            return Some(StockAlert::Low {
                available: now,
                threshold,
            });
        }
        None
    }
}

/// Event payload for a threshold crossing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAlertRaised {
    pub tenant_id: TenantId,
    pub variant_id: VariantId,
    pub product_id: ProductId,
    pub stock: i64,
    pub reserved: i64,
    pub available: i64,
    pub threshold: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Serialized without a variant wrapper; the envelope carries the event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StockEvent {
    LowStock(StockAlertRaised),
    Depleted(StockAlertRaised),
}

impl StockEvent {
    pub fn from_alert(alert: StockAlert, raised: StockAlertRaised) -> Self {
        match alert {
            StockAlert::Low { .. } => StockEvent::LowStock(raised),
            StockAlert::Depleted => StockEvent::Depleted(raised),
        }
    }

    fn raised(&self) -> &StockAlertRaised {
        match self {
            StockEvent::LowStock(e) | StockEvent::Depleted(e) => e,
        }
    }
}

impl Event for StockEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockEvent::LowStock(_) => "inventory.stock.low",
            StockEvent::Depleted(_) => "inventory.stock.depleted",
        }
    }

    fn tenant_id(&self) -> TenantId {
        self.raised().tenant_id
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.raised().occurred_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(stock: i64, reserved: i64) -> StockLevel {
        StockLevel::from_parts(stock, reserved).unwrap()
    }

    #[test]
    fn crossing_into_low_band_alerts() {
        assert_eq!(
            StockAlert::detect(level(8, 0), level(4, 0), 5),
            Some(StockAlert::Low {
                available: 4,
                threshold: 5
            })
        );
    }

    #[test]
    fn reaching_zero_is_depleted_not_low() {
        assert_eq!(
            StockAlert::detect(level(8, 0), level(2, 2), 5),
            Some(StockAlert::Depleted)
        );
    }

    #[test]
    fn staying_below_threshold_is_silent() {
        assert_eq!(StockAlert::detect(level(4, 0), level(3, 0), 5), None);
    }

    #[test]
    fn restocking_is_silent() {
        assert_eq!(StockAlert::detect(level(0, 0), level(3, 0), 5), None);
    }
}

//! Stock/reservation arithmetic.
//!
//! A variant's inventory is the pair `(stock, reserved)` with the invariant
//! `0 <= reserved <= stock`. Every operation maps a valid pair to a valid pair or
//! fails without producing one, so a caller that writes the result with a
//! compare-and-swap can never persist an invalid state.

use serde::{Deserialize, Serialize};

use storecraft_core::{DomainError, VariantId};

/// Physical stock and units held against in-flight orders.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawStockLevel")]
pub struct StockLevel {
    stock: i64,
    reserved: i64,
}

#[derive(Deserialize)]
struct RawStockLevel {
    stock: i64,
    reserved: i64,
}

impl TryFrom<RawStockLevel> for StockLevel {
    type Error = String;

    fn try_from(raw: RawStockLevel) -> Result<Self, Self::Error> {
        StockLevel::from_parts(raw.stock, raw.reserved).ok_or_else(|| {
            format!(
                "invalid stock level: reserved {} with stock {}",
                raw.reserved, raw.stock
            )
        })
    }
}

/// Why an operation was refused.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StockError {
    /// Quantities must be strictly positive (absolute sets: non-negative).
    InvalidQuantity(i64),
    /// Not enough units to satisfy the request.
    Insufficient { requested: i64, available: i64 },
    /// The result would not fit in an `i64`.
    OutOfRange(i64),
}

impl StockError {
    pub fn into_domain(self, variant_id: VariantId) -> DomainError {
        match self {
            StockError::InvalidQuantity(q) => {
                DomainError::validation(format!("quantity must be positive (got {q})"))
            }
            StockError::OutOfRange(q) => {
                DomainError::validation(format!("quantity {q} is out of range"))
            }
            StockError::Insufficient {
                requested,
                available,
            } => DomainError::insufficient_stock(variant_id, requested, available),
        }
    }
}

impl StockLevel {
    /// A fresh level with nothing reserved.
    pub fn new(stock: i64) -> Result<Self, StockError> {
        if stock < 0 {
            return Err(StockError::InvalidQuantity(stock));
        }
        Ok(Self { stock, reserved: 0 })
    }

    /// Rebuild a level read back from storage, checking the invariant.
    pub fn from_parts(stock: i64, reserved: i64) -> Option<Self> {
        (0 <= reserved && reserved <= stock).then_some(Self { stock, reserved })
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    pub fn reserved(&self) -> i64 {
        self.reserved
    }

    pub fn available(&self) -> i64 {
        self.stock - self.reserved
    }

    /// `stock += delta`. Physical stock may not drop below what is already reserved.
    pub fn adjust(self, delta: i64) -> Result<Self, StockError> {
        let stock = self
            .stock
            .checked_add(delta)
            .ok_or(StockError::OutOfRange(delta))?;
        if stock < 0 {
            return Err(StockError::Insufficient {
                requested: delta.saturating_neg(),
                available: self.stock,
            });
        }
        if stock < self.reserved {
            return Err(StockError::Insufficient {
                requested: delta.saturating_neg(),
                available: self.available(),
            });
        }
        Ok(Self { stock, ..self })
    }

    /// Absolute set, expressed as an adjustment.
    pub fn set(self, quantity: i64) -> Result<Self, StockError> {
        if quantity < 0 {
            return Err(StockError::InvalidQuantity(quantity));
        }
        let delta = quantity
            .checked_sub(self.stock)
            .ok_or(StockError::OutOfRange(quantity))?;
        self.adjust(delta)
    }

    pub fn reserve(self, qty: i64) -> Result<Self, StockError> {
        ensure_positive(qty)?;
        if self.available() < qty {
            return Err(StockError::Insufficient {
                requested: qty,
                available: self.available(),
            });
        }
        let reserved = self
            .reserved
            .checked_add(qty)
            .ok_or(StockError::OutOfRange(qty))?;
        Ok(Self { reserved, ..self })
    }

    /// Clamped at zero; never fails for a positive quantity.
    pub fn release(self, qty: i64) -> Result<Self, StockError> {
        ensure_positive(qty)?;
        Ok(Self {
            reserved: (self.reserved - qty).max(0),
            ..self
        })
    }

    /// Convert a reservation into a permanent deduction.
    ///
    /// Works without a prior reservation too: `reserved` is clamped, `stock` must
    /// cover the quantity.
    pub fn commit(self, qty: i64) -> Result<Self, StockError> {
        ensure_positive(qty)?;
        if self.stock < qty {
            return Err(StockError::Insufficient {
                requested: qty,
                available: self.stock,
            });
        }
        Ok(Self {
            stock: self.stock - qty,
            reserved: (self.reserved - qty).max(0),
        })
    }
}

fn ensure_positive(qty: i64) -> Result<(), StockError> {
    if qty <= 0 {
        return Err(StockError::InvalidQuantity(qty));
    }
    Ok(())
}

/// One ledger operation, replayable against a freshly read level.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op", content = "quantity")]
pub enum StockOp {
    Adjust(i64),
    Set(i64),
    Reserve(i64),
    Release(i64),
    Commit(i64),
}

impl StockOp {
    pub fn apply(self, level: StockLevel) -> Result<StockLevel, StockError> {
        match self {
            StockOp::Adjust(delta) => level.adjust(delta),
            StockOp::Set(qty) => level.set(qty),
            StockOp::Reserve(qty) => level.reserve(qty),
            StockOp::Release(qty) => level.release(qty),
            StockOp::Commit(qty) => level.commit(qty),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StockOp::Adjust(_) => "adjust",
            StockOp::Set(_) => "set",
            StockOp::Reserve(_) => "reserve",
            StockOp::Release(_) => "release",
            StockOp::Commit(_) => "commit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(stock: i64, reserved: i64) -> StockLevel {
        StockLevel::from_parts(stock, reserved).unwrap()
    }

    #[test]
    fn reserve_then_commit_consumes_stock_and_nets_out_reservation() {
        let before = level(10, 3);
        let after = before.reserve(4).unwrap().commit(4).unwrap();
        assert_eq!(after.stock(), 6);
        assert_eq!(after.reserved(), 3);
    }

    #[test]
    fn reserve_then_release_is_a_no_op() {
        let before = level(10, 3);
        let after = before.reserve(4).unwrap().release(4).unwrap();
        assert_eq!(after, before);
    }

    #[test]
    fn reserve_fails_when_available_is_short() {
        let err = level(5, 4).reserve(2).unwrap_err();
        assert_eq!(
            err,
            StockError::Insufficient {
                requested: 2,
                available: 1
            }
        );
    }

    #[test]
    fn release_clamps_at_zero() {
        assert_eq!(level(5, 1).release(10).unwrap().reserved(), 0);
    }

    #[test]
    fn adjust_cannot_go_negative() {
        assert!(matches!(
            level(3, 0).adjust(-4),
            Err(StockError::Insufficient { requested: 4, available: 3 })
        ));
        assert_eq!(level(3, 0).adjust(-3).unwrap().stock(), 0);
    }

    #[test]
    fn adjust_cannot_undercut_reservations() {
        assert!(level(5, 4).adjust(-2).is_err());
    }

    #[test]
    fn commit_without_reservation_only_touches_stock() {
        let after = level(5, 0).commit(2).unwrap();
        assert_eq!((after.stock(), after.reserved()), (3, 0));
    }

    #[test]
    fn commit_requires_physical_stock() {
        assert!(level(1, 0).commit(2).is_err());
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        assert_eq!(level(5, 0).reserve(0), Err(StockError::InvalidQuantity(0)));
        assert_eq!(level(5, 0).release(-1), Err(StockError::InvalidQuantity(-1)));
        assert_eq!(level(5, 0).set(-1), Err(StockError::InvalidQuantity(-1)));
    }

    #[test]
    fn set_is_absolute() {
        assert_eq!(level(5, 2).set(9).unwrap().stock(), 9);
        assert!(level(5, 2).set(1).is_err());
    }

    #[test]
    fn from_parts_rejects_broken_invariant() {
        assert!(StockLevel::from_parts(1, 2).is_none());
        assert!(StockLevel::from_parts(1, -1).is_none());
    }

    #[test]
    fn extreme_quantities_fail_instead_of_wrapping() {
        assert_eq!(
            level(10, 0).adjust(i64::MAX),
            Err(StockError::OutOfRange(i64::MAX))
        );
        assert!(matches!(
            level(10, 0).adjust(i64::MIN),
            Err(StockError::Insufficient { requested: i64::MAX, available: 10 })
        ));
        assert_eq!(level(i64::MAX, 0).adjust(-1).unwrap().stock(), i64::MAX - 1);
        assert_eq!(
            level(i64::MAX, 3).reserve(i64::MAX),
            Err(StockError::Insufficient {
                requested: i64::MAX,
                available: i64::MAX - 3,
            })
        );
        assert_eq!(level(i64::MAX, 0).set(0).unwrap().stock(), 0);
        assert!(matches!(
            StockError::OutOfRange(i64::MAX).into_domain(VariantId::new()),
            DomainError::Validation(_)
        ));
    }

    #[test]
    fn deserializing_checks_the_invariant() {
        let ok: StockLevel = serde_json::from_str(r#"{"stock":5,"reserved":2}"#).unwrap();
        assert_eq!(ok, level(5, 2));
        assert!(serde_json::from_str::<StockLevel>(r#"{"stock":1,"reserved":2}"#).is_err());
        assert!(serde_json::from_str::<StockLevel>(r#"{"stock":-3,"reserved":0}"#).is_err());
    }

    #[test]
    fn insufficient_maps_to_domain_error_with_variant() {
        let variant_id = VariantId::new();
        let err = StockError::Insufficient {
            requested: 3,
            available: 1,
        }
        .into_domain(variant_id);
        assert_eq!(
            err,
            DomainError::insufficient_stock(variant_id, 3, 1)
        );
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn any_op() -> impl Strategy<Value = StockOp> {
            prop_oneof![
                (-50i64..50).prop_map(StockOp::Adjust),
                prop_oneof![Just(i64::MAX), Just(i64::MIN), Just(i64::MAX - 1)]
                    .prop_map(StockOp::Adjust),
                (-5i64..60).prop_map(StockOp::Set),
                (-5i64..30).prop_map(StockOp::Reserve),
                Just(i64::MAX).prop_map(StockOp::Reserve),
                (-5i64..30).prop_map(StockOp::Release),
                (-5i64..30).prop_map(StockOp::Commit),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: whatever sequence of operations is attempted, the level that
            /// results from the accepted ones satisfies `0 <= reserved <= stock`.
            #[test]
            fn invariant_holds_for_any_sequence(
                initial in 0i64..100,
                ops in prop::collection::vec(any_op(), 0..40)
            ) {
                let mut current = StockLevel::new(initial).unwrap();
                for op in ops {
                    if let Ok(next) = op.apply(current) {
                        current = next;
                    }
                    prop_assert!(current.reserved() >= 0);
                    prop_assert!(current.reserved() <= current.stock());
                    prop_assert!(current.available() >= 0);
                }
            }

            /// Property: reserve(q) followed by commit(q) reduces stock by q and leaves
            /// reserved where it started.
            #[test]
            fn reserve_commit_nets_out(stock in 0i64..100, reserved_pct in 0i64..100, q in 1i64..100) {
                let reserved = stock * reserved_pct / 100;
                let before = StockLevel::from_parts(stock, reserved).unwrap();
                if let Ok(held) = before.reserve(q) {
                    let after = held.commit(q).unwrap();
                    prop_assert_eq!(after.stock(), before.stock() - q);
                    prop_assert_eq!(after.reserved(), before.reserved());
                }
            }

            /// Property: reserve(q) followed by release(q) is the identity.
            #[test]
            fn reserve_release_is_identity(stock in 0i64..100, reserved_pct in 0i64..100, q in 1i64..100) {
                let reserved = stock * reserved_pct / 100;
                let before = StockLevel::from_parts(stock, reserved).unwrap();
                if let Ok(held) = before.reserve(q) {
                    prop_assert_eq!(held.release(q).unwrap(), before);
                }
            }
        }
    }
}

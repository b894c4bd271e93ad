//! Order lifecycle: the adjacency map and the side effects bound to each transition.

use serde::{Deserialize, Serialize};

use storecraft_core::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    PaymentPending,
    Paid,
    CodConfirmed,
    Processing,
    Shipped,
    OutForDelivery,
    Delivered,
    Cancelled,
    Refunded,
    Rto,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 11] = [
        OrderStatus::Created,
        OrderStatus::PaymentPending,
        OrderStatus::Paid,
        OrderStatus::CodConfirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
        OrderStatus::Rto,
    ];

    /// Legal next states. This table is the only place transitions are defined.
    pub fn allowed_next(self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Created => &[PaymentPending, CodConfirmed, Cancelled],
            PaymentPending => &[Paid, Cancelled],
            Paid => &[Processing, Cancelled, Refunded],
            CodConfirmed => &[Processing, Cancelled],
            Processing => &[Shipped, Cancelled],
            Shipped => &[OutForDelivery, Delivered, Rto],
            OutForDelivery => &[Delivered, Rto],
            Delivered => &[Refunded],
            Rto => &[Refunded],
            Cancelled => &[Refunded],
            Refunded => &[],
        }
    }

    pub fn can_transition_to(self, target: OrderStatus) -> bool {
        self.allowed_next().contains(&target)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }

    /// Validate `self -> target` and describe what else must change with it.
    pub fn transition_to(self, target: OrderStatus) -> DomainResult<TransitionEffects> {
        if !self.can_transition_to(target) {
            return Err(DomainError::InvalidTransition {
                from: self.as_str().to_string(),
                to: target.as_str().to_string(),
                allowed: self
                    .allowed_next()
                    .iter()
                    .map(|s| s.as_str().to_string())
                    .collect(),
            });
        }
        Ok(TransitionEffects::entering(target))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::PaymentPending => "payment_pending",
            OrderStatus::Paid => "paid",
            OrderStatus::CodConfirmed => "cod_confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Rto => "rto",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|st| st.as_str() == s)
    }

    /// Whether an order in this state still counts towards revenue.
    pub fn is_revenue(self) -> bool {
        !matches!(
            self,
            OrderStatus::Cancelled | OrderStatus::Refunded | OrderStatus::Rto
        )
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived from the order status; never set directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    Unfulfilled,
    PartiallyFulfilled,
    Fulfilled,
    Returned,
}

impl FulfillmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FulfillmentStatus::Unfulfilled => "unfulfilled",
            FulfillmentStatus::PartiallyFulfilled => "partially_fulfilled",
            FulfillmentStatus::Fulfilled => "fulfilled",
            FulfillmentStatus::Returned => "returned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [
            FulfillmentStatus::Unfulfilled,
            FulfillmentStatus::PartiallyFulfilled,
            FulfillmentStatus::Fulfilled,
            FulfillmentStatus::Returned,
        ]
        .into_iter()
        .find(|f| f.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Prepaid,
    Cod,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Prepaid => "prepaid",
            PaymentMethod::Cod => "cod",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "prepaid" => Some(PaymentMethod::Prepaid),
            "cod" => Some(PaymentMethod::Cod),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

/// What a legal transition changes besides the status itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionEffects {
    pub fulfillment: Option<FulfillmentStatus>,
    pub payment: Option<PaymentStatus>,
    /// Put every variant-bearing line's quantity back into stock.
    pub restock: bool,
    /// Tracking details supplied with the transition are persisted.
    pub records_tracking: bool,
}

impl TransitionEffects {
    fn entering(target: OrderStatus) -> Self {
        let fulfillment = match target {
            OrderStatus::Shipped | OrderStatus::OutForDelivery => {
                Some(FulfillmentStatus::PartiallyFulfilled)
            }
            OrderStatus::Delivered => Some(FulfillmentStatus::Fulfilled),
            OrderStatus::Rto => Some(FulfillmentStatus::Returned),
            _ => None,
        };
        let payment = match target {
            OrderStatus::Paid => Some(PaymentStatus::Paid),
            OrderStatus::Refunded => Some(PaymentStatus::Refunded),
            _ => None,
        };
        Self {
            fulfillment,
            payment,
            restock: matches!(target, OrderStatus::Cancelled | OrderStatus::Rto),
            records_tracking: target == OrderStatus::Shipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn created_to_paid_is_rejected_with_allowed_set() {
        let err = OrderStatus::Created
            .transition_to(OrderStatus::Paid)
            .unwrap_err();
        match err {
            DomainError::InvalidTransition { from, to, allowed } => {
                assert_eq!(from, "created");
                assert_eq!(to, "paid");
                assert_eq!(allowed, vec!["payment_pending", "cod_confirmed", "cancelled"]);
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
    }

    #[test]
    fn created_to_payment_pending_is_allowed() {
        let fx = OrderStatus::Created
            .transition_to(OrderStatus::PaymentPending)
            .unwrap();
        assert_eq!(fx.fulfillment, None);
        assert!(!fx.restock);
    }

    #[test]
    fn refunded_is_terminal() {
        assert!(OrderStatus::Refunded.is_terminal());
        let err = OrderStatus::Refunded
            .transition_to(OrderStatus::Cancelled)
            .unwrap_err();
        assert!(err.to_string().contains("allowed: none"));
    }

    #[test]
    fn side_effects_by_target() {
        let shipped = OrderStatus::Processing
            .transition_to(OrderStatus::Shipped)
            .unwrap();
        assert_eq!(shipped.fulfillment, Some(FulfillmentStatus::PartiallyFulfilled));
        assert!(shipped.records_tracking);

        let delivered = OrderStatus::OutForDelivery
            .transition_to(OrderStatus::Delivered)
            .unwrap();
        assert_eq!(delivered.fulfillment, Some(FulfillmentStatus::Fulfilled));

        let rto = OrderStatus::Shipped.transition_to(OrderStatus::Rto).unwrap();
        assert_eq!(rto.fulfillment, Some(FulfillmentStatus::Returned));
        assert!(rto.restock);

        let cancelled = OrderStatus::Paid
            .transition_to(OrderStatus::Cancelled)
            .unwrap();
        assert!(cancelled.restock);
        assert_eq!(cancelled.fulfillment, None);

        let paid = OrderStatus::PaymentPending
            .transition_to(OrderStatus::Paid)
            .unwrap();
        assert_eq!(paid.payment, Some(PaymentStatus::Paid));
    }

    #[test]
    fn status_names_parse_back() {
        for s in OrderStatus::ALL {
            assert_eq!(OrderStatus::parse(s.as_str()), Some(s));
            let wire = serde_json::to_value(s).unwrap();
            assert_eq!(wire, serde_json::json!(s.as_str()));
        }
        assert_eq!(OrderStatus::parse("teleported"), None);
    }

    fn any_status() -> impl Strategy<Value = OrderStatus> {
        (0..OrderStatus::ALL.len()).prop_map(|i| OrderStatus::ALL[i])
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

        /// Property: a transition succeeds exactly when the target is in the adjacency set.
        #[test]
        fn transition_succeeds_iff_adjacent(from in any_status(), to in any_status()) {
            let adjacent = from.allowed_next().contains(&to);
            prop_assert_eq!(from.transition_to(to).is_ok(), adjacent);
        }

        /// Property: a walk of legal transitions never revisits `created`.
        #[test]
        fn created_is_never_reentered(choices in proptest::collection::vec(0usize..4, 0..12)) {
            let mut current = OrderStatus::Created;
            for c in choices {
                let next = current.allowed_next();
                if next.is_empty() {
                    break;
                }
                current = next[c % next.len()];
                prop_assert_ne!(current, OrderStatus::Created);
            }
        }
    }
}

use super::Verdict;
use crate::action::Action;
use crate::snapshot::Snapshot;

/// Pre-check a status change against the snapshot's view of the order.
///
/// Orders missing from the snapshot pass; the order service checks again against the
/// stored status.
pub fn validate_order(action: &Action, snapshot: &Snapshot) -> Verdict {
    let Some((order_id, target)) = action.order_transition() else {
        return Verdict::Valid;
    };
    match snapshot.order_status(order_id) {
        Some(from) => Verdict::from_result(from.transition_to(target).map(|_| ())),
        None => Verdict::Valid,
    }
}

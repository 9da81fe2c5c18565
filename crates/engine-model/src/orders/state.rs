use crate::enums::OrderStatus;

/// Raised when a caller tries to drive the order state machine backwards.
#[derive(Debug, thiserror::Error)]
#[error("invalid order status transition: {from} -> {to}")]
pub struct OrderStatusError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

/// Validates a status transition against the state machine in §3; a violation is a
/// programmer error (§7 invariant violations), not a recoverable condition, so this
/// panics rather than returning a `Result`.
pub fn validate_transition(from: OrderStatus, to: OrderStatus) {
    use OrderStatus::{
        Accepted, Canceled, Expired, Filled, Initialized, PartiallyFilled, PendingCancel, PendingUpdate, Rejected,
        Submitted, Triggered,
    };

    if from == to {
        // Re-emitting PartiallyFilled for successive fills is legal; anything else idempotent.
        return;
    }

    let allowed = matches!(
        (from, to),
        (Initialized, Submitted)
            | (Submitted, Accepted)
            | (Submitted, Rejected)
            | (Accepted, PendingUpdate)
            | (Accepted, PendingCancel)
            | (Accepted, Triggered)
            | (Accepted, PartiallyFilled)
            | (Accepted, Filled)
            | (Accepted, Canceled)
            | (Accepted, Expired)
            | (PendingUpdate, Accepted)
            | (PendingUpdate, PendingCancel)
            | (PendingUpdate, Canceled)
            | (PendingUpdate, Rejected)
            | (PendingCancel, Canceled)
            | (PendingCancel, Accepted)
            | (Triggered, PendingUpdate)
            | (Triggered, PendingCancel)
            | (Triggered, PartiallyFilled)
            | (Triggered, Filled)
            | (Triggered, Canceled)
            | (Triggered, Expired)
            | (PartiallyFilled, PendingUpdate)
            | (PartiallyFilled, PendingCancel)
            | (PartiallyFilled, PartiallyFilled)
            | (PartiallyFilled, Filled)
            | (PartiallyFilled, Canceled)
            | (PartiallyFilled, Expired)
    );

    assert!(allowed, "{}", OrderStatusError { from, to });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transition_does_not_panic() {
        validate_transition(OrderStatus::Initialized, OrderStatus::Submitted);
        validate_transition(OrderStatus::Submitted, OrderStatus::Accepted);
        validate_transition(OrderStatus::Accepted, OrderStatus::Filled);
    }

    #[test]
    #[should_panic]
    fn test_terminal_to_anything_panics() {
        validate_transition(OrderStatus::Filled, OrderStatus::Canceled);
    }

    #[test]
    #[should_panic]
    fn test_backtrack_panics() {
        validate_transition(OrderStatus::Accepted, OrderStatus::Submitted);
    }
}

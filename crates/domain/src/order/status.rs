//! Order status state machine.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The status of an order in its lifecycle.
///
/// Transitions:
/// ```text
/// pending ──► confirmed ──► delivering ──► delivered
///    │            │
///    └────────────┴──► cancelled
/// ```
///
/// `delivered` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created with stock reserved, awaiting staff confirmation.
    #[default]
    Pending,

    /// Confirmed by staff, awaiting shipper assignment.
    Confirmed,

    /// Handed to a shipper, out for delivery.
    Delivering,

    /// Delivery confirmed by the shipper (terminal).
    Delivered,

    /// Cancelled with stock returned (terminal).
    Cancelled,
}

/// An event driving the order state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionAction {
    Confirm,
    AssignShipper,
    Complete,
    Cancel,
}

impl OrderStatus {
    /// Applies a transition, returning the next status.
    ///
    /// The table is total: any (status, action) pair not listed in the
    /// transition diagram yields [`DomainError::InvalidTransition`] and no
    /// state change.
    pub fn apply(self, action: TransitionAction) -> Result<OrderStatus, DomainError> {
        use OrderStatus::*;
        use TransitionAction::*;

        match (self, action) {
            (Pending, Confirm) => Ok(Confirmed),
            (Confirmed, AssignShipper) => Ok(Delivering),
            (Delivering, Complete) => Ok(Delivered),
            (Pending | Confirmed, Cancel) => Ok(Cancelled),
            (from, action) => Err(DomainError::InvalidTransition { from, action }),
        }
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Returns the status name as used on the wire and in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Delivering => "delivering",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// All statuses, in lifecycle order.
    pub fn all() -> [OrderStatus; 5] {
        [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Delivering,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ]
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "delivering" => Ok(OrderStatus::Delivering),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

impl TransitionAction {
    /// All actions the state machine understands.
    pub fn all() -> [TransitionAction; 4] {
        [
            TransitionAction::Confirm,
            TransitionAction::AssignShipper,
            TransitionAction::Complete,
            TransitionAction::Cancel,
        ]
    }

    fn as_str(&self) -> &'static str {
        match self {
            TransitionAction::Confirm => "confirm",
            TransitionAction::AssignShipper => "assign a shipper to",
            TransitionAction::Complete => "complete",
            TransitionAction::Cancel => "cancel",
        }
    }
}

impl std::fmt::Display for TransitionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_is_linear() {
        let status = OrderStatus::Pending;
        let status = status.apply(TransitionAction::Confirm).unwrap();
        assert_eq!(status, OrderStatus::Confirmed);
        let status = status.apply(TransitionAction::AssignShipper).unwrap();
        assert_eq!(status, OrderStatus::Delivering);
        let status = status.apply(TransitionAction::Complete).unwrap();
        assert_eq!(status, OrderStatus::Delivered);
        assert!(status.is_terminal());
    }

    #[test]
    fn cancel_allowed_from_pending_and_confirmed_only() {
        assert_eq!(
            OrderStatus::Pending.apply(TransitionAction::Cancel),
            Ok(OrderStatus::Cancelled)
        );
        assert_eq!(
            OrderStatus::Confirmed.apply(TransitionAction::Cancel),
            Ok(OrderStatus::Cancelled)
        );
        for status in [
            OrderStatus::Delivering,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert!(matches!(
                status.apply(TransitionAction::Cancel),
                Err(DomainError::InvalidTransition { .. })
            ));
        }
    }

    #[test]
    fn terminal_states_accept_nothing() {
        for status in [OrderStatus::Delivered, OrderStatus::Cancelled] {
            for action in TransitionAction::all() {
                assert!(matches!(
                    status.apply(action),
                    Err(DomainError::InvalidTransition { .. })
                ));
            }
        }
    }

    #[test]
    fn transition_table_is_total() {
        // Every (status, action) pair either transitions or errors; nothing
        // panics and nothing silently keeps the current status.
        for status in OrderStatus::all() {
            for action in TransitionAction::all() {
                match status.apply(action) {
                    Ok(next) => assert_ne!(next, status),
                    Err(DomainError::InvalidTransition { from, action: a }) => {
                        assert_eq!(from, status);
                        assert_eq!(a, action);
                    }
                    Err(other) => panic!("unexpected error: {other}"),
                }
            }
        }
    }

    #[test]
    fn wire_format_is_snake_case() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Delivering).unwrap(),
            "\"delivering\""
        );
        let back: OrderStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(back, OrderStatus::Pending);
    }

    #[test]
    fn from_str_roundtrip() {
        for status in OrderStatus::all() {
            let parsed: OrderStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }
}

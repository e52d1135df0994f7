//! Fulfillment error types.

use common::{OrderId, ShipperId};
use domain::{DomainError, Role};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur while driving the order workflow.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// Domain validation or state machine rejection.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Store rejection (insufficient stock, conflicts, not found, database).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Order not found.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// No promotion matches the submitted code.
    #[error("unknown promotion code: {0}")]
    UnknownPromotionCode(String),

    /// The given id does not belong to a user with the shipper role.
    #[error("user {0} is not a shipper")]
    NotAShipper(ShipperId),

    /// The caller's role lacks the capability for this operation.
    #[error("role {role} may not {action}")]
    Forbidden { role: Role, action: &'static str },
}

/// Result type for fulfillment operations.
pub type Result<T> = std::result::Result<T, FulfillmentError>;

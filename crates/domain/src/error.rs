//! Domain error types.

use chrono::NaiveDate;
use common::{BookId, PromotionId};
use thiserror::Error;

use crate::order::{OrderStatus, TransitionAction};

/// Errors produced by pure domain validation and the order state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A date range ends before it starts.
    #[error("invalid date range: end {end} is before start {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    /// A discount value is out of range for its kind.
    #[error("invalid discount value {value} for {kind} discount")]
    InvalidDiscountValue { kind: &'static str, value: i64 },

    /// A promotion was created or edited without any books.
    #[error("promotion must include at least one book")]
    EmptyPromotion,

    /// A promotion name is blank.
    #[error("promotion name must not be blank")]
    BlankPromotionName,

    /// An order line requested a non-positive quantity.
    #[error("quantity for book {book_id} must be positive")]
    InvalidQuantity { book_id: BookId },

    /// An order was submitted without line items.
    #[error("order must contain at least one line item")]
    EmptyOrder,

    /// The selected promotion window does not cover the order date.
    #[error("promotion {promotion_id} is not active on {date}")]
    PromotionNotApplicable {
        promotion_id: PromotionId,
        date: NaiveDate,
    },

    /// The state machine has no transition for this (status, action) pair.
    #[error("cannot {action} an order in status {from}")]
    InvalidTransition {
        from: OrderStatus,
        action: TransitionAction,
    },
}

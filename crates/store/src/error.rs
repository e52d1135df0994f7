use common::{BookId, OrderId, PromotionId, ShipperId, UserId};
use domain::OrderStatus;
use thiserror::Error;

/// Errors that can occur when interacting with the authoritative store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// One or more books lack the stock requested by a reservation.
    ///
    /// The message keeps the wording existing callers substring-match on
    /// ("không đủ tồn kho" plus the numeric book id); `book_ids` names every
    /// offender.
    #[error("Sách {} không đủ tồn kho", format_ids(book_ids))]
    InsufficientStock { book_ids: Vec<BookId> },

    /// The promotion's books are already committed to an overlapping
    /// campaign.
    #[error("books already committed to an overlapping promotion: {}", format_ids(book_ids))]
    PromotionConflict { book_ids: Vec<BookId> },

    /// The shipper already has an uncompleted delivery for another order.
    #[error("shipper {shipper_id} already has an active delivery for order {busy_with}")]
    ShipperUnavailable {
        shipper_id: ShipperId,
        busy_with: OrderId,
    },

    /// A delivery completion was attempted by a shipper other than the one
    /// assigned to the order.
    #[error("shipper {shipper_id} is not assigned to order {order_id}")]
    NotAssignedShipper {
        order_id: OrderId,
        shipper_id: ShipperId,
    },

    /// The order was not in the status the operation requires.
    #[error("order {order_id} is in status {current}")]
    StatusConflict {
        order_id: OrderId,
        current: OrderStatus,
    },

    /// Book not found.
    #[error("book not found: {0}")]
    BookNotFound(BookId),

    /// Order not found.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// Promotion not found.
    #[error("promotion not found: {0}")]
    PromotionNotFound(PromotionId),

    /// User not found.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// No active assignment exists for the order.
    #[error("no active shipper assignment for order {0}")]
    AssignmentNotFound(OrderId),

    /// A draft failed domain validation at commit time.
    #[error(transparent)]
    Domain(#[from] domain::DomainError),

    /// A stored value could not be interpreted (corrupt row).
    #[error("invalid stored value: {0}")]
    Decode(String),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

fn format_ids(ids: &[BookId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

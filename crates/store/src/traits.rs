//! Repository traits implemented by every store backend.
//!
//! The traits carry the atomicity contract, not just the data access: any
//! method documented as atomic must apply its guard and its write as one
//! unit, so that concurrent callers can never both pass a check that only
//! one of them may act on.

use async_trait::async_trait;
use common::{BookId, Money, OrderId, PromotionId, ShipperId, UserId};
use domain::{
    Book, NewOrder, Order, OrderStatus, Promotion, PromotionDraft, PromotionWindow, Role,
    ShipperAssignment, User,
};

use crate::error::Result;

/// Catalog access.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Adds a book to the catalog (seeding and tests).
    async fn insert_book(&self, title: &str, price: Money, stock: u32) -> Result<Book>;

    /// Fetches a single book.
    async fn get_book(&self, id: BookId) -> Result<Option<Book>>;

    /// Lists the whole catalog, ordered by id.
    async fn list_books(&self) -> Result<Vec<Book>>;
}

/// The stock reservation ledger.
///
/// Reservations are recorded per order so a reversal can re-credit exactly
/// the quantities that were committed, exactly once.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Atomically checks and decrements stock for every line.
    ///
    /// All-or-nothing: if any book lacks stock, no stock is mutated and the
    /// error names every under-stocked book id. On success an active
    /// reservation is recorded for `order_id`.
    async fn reserve_stock(&self, order_id: OrderId, lines: &[(BookId, u32)]) -> Result<()>;

    /// Re-credits the active reservation recorded for `order_id`.
    ///
    /// Idempotent: returns `true` if a reservation was reversed, `false`
    /// if it was already reversed (or never existed). A second call never
    /// double-credits.
    async fn release_stock(&self, order_id: OrderId) -> Result<bool>;
}

/// Promotion persistence.
///
/// Both write methods re-validate the overlapping-window/disjoint-book-set
/// invariant inside the same critical section or transaction that performs
/// the write, closing the race between two concurrent conflicting creates.
#[async_trait]
pub trait PromotionStore: Send + Sync {
    /// Inserts a validated draft, re-checking conflicts at commit time.
    async fn insert_promotion(&self, draft: PromotionDraft) -> Result<Promotion>;

    /// Replaces an existing promotion, re-checking conflicts at commit time
    /// (the promotion's own window is excluded from the check).
    async fn update_promotion(&self, id: PromotionId, draft: PromotionDraft) -> Result<Promotion>;

    /// Fetches a single promotion with its book set.
    async fn get_promotion(&self, id: PromotionId) -> Result<Option<Promotion>>;

    /// Lists all promotions, ordered by id.
    async fn list_promotions(&self) -> Result<Vec<Promotion>>;

    /// Returns every promotion's window (id, range, book set), optionally
    /// excluding one promotion (used when editing it against itself).
    async fn promotion_windows(&self, exclude: Option<PromotionId>)
    -> Result<Vec<PromotionWindow>>;
}

/// Order persistence and status transitions.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Reserves stock for every line and inserts the order in `pending`
    /// status, as one atomic unit. No order is created if any line lacks
    /// stock.
    async fn create_order(&self, order: NewOrder) -> Result<Order>;

    /// Fetches a single order with its lines.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists all orders, newest first.
    async fn list_orders(&self) -> Result<Vec<Order>>;

    /// Compare-and-swap on the order status.
    ///
    /// Returns `true` if the order was in `from` and is now `to`; `false`
    /// if it exists but was in some other status (no write happens). Two
    /// concurrent identical swaps cannot both return `true`.
    async fn transition_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool>;

    /// Compare-and-swap to `cancelled` plus reversal of the order's stock
    /// reservation, atomically. Returns `false` (and reverses nothing) if
    /// the order was not in `from`.
    async fn cancel_order(&self, id: OrderId, from: OrderStatus) -> Result<bool>;
}

/// Shipper assignment lifecycle, coupled to the order status writes that
/// accompany each step.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Moves a `confirmed` order to `delivering` and records an active
    /// assignment, atomically. Fails with `ShipperUnavailable` if the
    /// shipper already has an uncompleted delivery for another order.
    async fn assign_shipper(
        &self,
        order_id: OrderId,
        shipper_id: ShipperId,
    ) -> Result<ShipperAssignment>;

    /// Removes the order's active assignment and returns the order to
    /// `confirmed`, atomically.
    async fn unassign_shipper(&self, order_id: OrderId) -> Result<()>;

    /// Marks the delivery complete: sets `completed_at` on the active
    /// assignment and moves the order to `delivered`, atomically. The
    /// caller must be the assigned shipper.
    async fn complete_delivery(
        &self,
        order_id: OrderId,
        shipper_id: ShipperId,
    ) -> Result<ShipperAssignment>;

    /// Returns the order's active (uncompleted) assignment, if any.
    async fn active_assignment(&self, order_id: OrderId) -> Result<Option<ShipperAssignment>>;
}

/// User account lookups backing the cached directory endpoints.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Adds a user (seeding and tests).
    async fn insert_user(&self, name: &str, role: Role, phone: &str) -> Result<User>;

    /// Lists all users, ordered by id.
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Lists users with the shipper role, ordered by id.
    async fn list_shippers(&self) -> Result<Vec<User>>;

    /// Fetches a single user.
    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// Updates a user's name, role, and phone.
    async fn update_user(&self, id: UserId, name: &str, role: Role, phone: &str) -> Result<User>;
}

/// The full store a running service needs.
pub trait Store:
    BookStore + StockLedger + PromotionStore + OrderStore + AssignmentStore + UserStore
{
}

impl<T> Store for T where
    T: BookStore + StockLedger + PromotionStore + OrderStore + AssignmentStore + UserStore
{
}

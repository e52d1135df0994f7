//! In-memory store implementation.
//!
//! Every operation takes the single state lock once and performs its whole
//! check-then-write sequence inside that acquisition, which is what makes
//! the atomicity contract of the traits hold for concurrent tasks.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{BookId, Money, OrderId, PromotionId, ShipperId, UserId};
use domain::{
    Book, NewOrder, Order, OrderStatus, Promotion, PromotionDraft, PromotionWindow, Role,
    ShipperAssignment, User, conflicting_books, overlapping_windows,
};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::traits::{
    AssignmentStore, BookStore, OrderStore, PromotionStore, StockLedger, UserStore,
};

#[derive(Debug, Default)]
struct MemoryState {
    books: HashMap<BookId, Book>,
    promotions: HashMap<PromotionId, Promotion>,
    orders: HashMap<OrderId, Order>,
    assignments: Vec<ShipperAssignment>,
    /// Active (unreversed) reservations, keyed by order.
    reservations: HashMap<OrderId, Vec<(BookId, u32)>>,
    users: HashMap<UserId, User>,
    next_book_id: i64,
    next_promotion_id: i64,
    next_order_id: i64,
    next_user_id: i64,
}

impl MemoryState {
    /// Checks and decrements stock for the aggregated lines, recording the
    /// reservation. Caller holds the write lock, so this is atomic.
    fn reserve(&mut self, order_id: OrderId, lines: &[(BookId, u32)]) -> Result<()> {
        // Duplicate lines for the same book are checked against their sum.
        let mut needed: BTreeMap<BookId, u32> = BTreeMap::new();
        for (book_id, quantity) in lines {
            *needed.entry(*book_id).or_default() += quantity;
        }

        let mut short = Vec::new();
        for (book_id, quantity) in &needed {
            match self.books.get(book_id) {
                None => return Err(StoreError::BookNotFound(*book_id)),
                Some(book) if !book.has_stock(*quantity) => short.push(*book_id),
                Some(_) => {}
            }
        }
        if !short.is_empty() {
            return Err(StoreError::InsufficientStock { book_ids: short });
        }

        for (book_id, quantity) in &needed {
            if let Some(book) = self.books.get_mut(book_id) {
                book.stock -= quantity;
            }
        }
        self.reservations
            .insert(order_id, needed.into_iter().collect());
        Ok(())
    }

    /// Re-credits and consumes the order's reservation, if still active.
    fn release(&mut self, order_id: OrderId) -> bool {
        match self.reservations.remove(&order_id) {
            Some(lines) => {
                for (book_id, quantity) in lines {
                    if let Some(book) = self.books.get_mut(&book_id) {
                        book.stock += quantity;
                    }
                }
                true
            }
            None => false,
        }
    }

    fn validated_windows(
        &self,
        draft: &PromotionDraft,
        exclude: Option<PromotionId>,
    ) -> Result<()> {
        let range = draft.validate()?;
        let windows: Vec<PromotionWindow> =
            self.promotions.values().map(Promotion::window).collect();
        let hits = overlapping_windows(&range, &windows, exclude);
        let conflicts = conflicting_books(&draft.book_ids, &hits);
        if !conflicts.is_empty() {
            return Err(StoreError::PromotionConflict {
                book_ids: conflicts,
            });
        }
        Ok(())
    }
}

/// In-memory store, shared by cloning.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn insert_book(&self, title: &str, price: Money, stock: u32) -> Result<Book> {
        let mut state = self.state.write().await;
        state.next_book_id += 1;
        let book = Book {
            id: BookId::new(state.next_book_id),
            title: title.to_string(),
            price,
            stock,
        };
        state.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn get_book(&self, id: BookId) -> Result<Option<Book>> {
        let state = self.state.read().await;
        Ok(state.books.get(&id).cloned())
    }

    async fn list_books(&self) -> Result<Vec<Book>> {
        let state = self.state.read().await;
        let mut books: Vec<Book> = state.books.values().cloned().collect();
        books.sort_by_key(|b| b.id);
        Ok(books)
    }
}

#[async_trait]
impl StockLedger for MemoryStore {
    async fn reserve_stock(&self, order_id: OrderId, lines: &[(BookId, u32)]) -> Result<()> {
        let mut state = self.state.write().await;
        state.reserve(order_id, lines)
    }

    async fn release_stock(&self, order_id: OrderId) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(state.release(order_id))
    }
}

#[async_trait]
impl PromotionStore for MemoryStore {
    async fn insert_promotion(&self, draft: PromotionDraft) -> Result<Promotion> {
        let mut state = self.state.write().await;
        state.validated_windows(&draft, None)?;
        state.next_promotion_id += 1;
        let promotion = draft.into_promotion(PromotionId::new(state.next_promotion_id));
        state.promotions.insert(promotion.id, promotion.clone());
        Ok(promotion)
    }

    async fn update_promotion(&self, id: PromotionId, draft: PromotionDraft) -> Result<Promotion> {
        let mut state = self.state.write().await;
        if !state.promotions.contains_key(&id) {
            return Err(StoreError::PromotionNotFound(id));
        }
        state.validated_windows(&draft, Some(id))?;
        let promotion = draft.into_promotion(id);
        state.promotions.insert(id, promotion.clone());
        Ok(promotion)
    }

    async fn get_promotion(&self, id: PromotionId) -> Result<Option<Promotion>> {
        let state = self.state.read().await;
        Ok(state.promotions.get(&id).cloned())
    }

    async fn list_promotions(&self) -> Result<Vec<Promotion>> {
        let state = self.state.read().await;
        let mut promotions: Vec<Promotion> = state.promotions.values().cloned().collect();
        promotions.sort_by_key(|p| p.id);
        Ok(promotions)
    }

    async fn promotion_windows(
        &self,
        exclude: Option<PromotionId>,
    ) -> Result<Vec<PromotionWindow>> {
        let state = self.state.read().await;
        let mut windows: Vec<PromotionWindow> = state
            .promotions
            .values()
            .filter(|p| Some(p.id) != exclude)
            .map(Promotion::window)
            .collect();
        windows.sort_by_key(|w| w.promotion_id);
        Ok(windows)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        let mut state = self.state.write().await;

        state.next_order_id += 1;
        let id = OrderId::new(state.next_order_id);

        let line_quantities: Vec<(BookId, u32)> = order
            .lines
            .iter()
            .map(|line| (line.book_id, line.quantity))
            .collect();
        state.reserve(id, &line_quantities)?;

        let stored = Order {
            id,
            customer_name: order.customer_name,
            customer_phone: order.customer_phone,
            shipping_address: order.shipping_address,
            payment_method: order.payment_method,
            status: OrderStatus::Pending,
            lines: order.lines,
            total_amount: order.total_amount,
            discount_amount: order.discount_amount,
            final_amount: order.final_amount,
            promotion_id: order.promotion_id,
            created_at: Utc::now(),
        };
        state.orders.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.get(&id).cloned())
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state.orders.values().cloned().collect();
        orders.sort_by_key(|o| std::cmp::Reverse(o.id));
        Ok(orders)
    }

    async fn transition_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderNotFound(id))?;
        if order.status != from {
            return Ok(false);
        }
        order.status = to;
        Ok(true)
    }

    async fn cancel_order(&self, id: OrderId, from: OrderStatus) -> Result<bool> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderNotFound(id))?;
        if order.status != from {
            return Ok(false);
        }
        order.status = OrderStatus::Cancelled;
        state.release(id);
        Ok(true)
    }
}

#[async_trait]
impl AssignmentStore for MemoryStore {
    async fn assign_shipper(
        &self,
        order_id: OrderId,
        shipper_id: ShipperId,
    ) -> Result<ShipperAssignment> {
        let mut state = self.state.write().await;

        let current = state
            .orders
            .get(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?
            .status;
        if current != OrderStatus::Confirmed {
            return Err(StoreError::StatusConflict { order_id, current });
        }

        if let Some(busy) = state
            .assignments
            .iter()
            .find(|a| a.shipper_id == shipper_id && a.is_active())
        {
            return Err(StoreError::ShipperUnavailable {
                shipper_id,
                busy_with: busy.order_id,
            });
        }

        if let Some(order) = state.orders.get_mut(&order_id) {
            order.status = OrderStatus::Delivering;
        }
        let assignment = ShipperAssignment {
            order_id,
            shipper_id,
            assigned_at: Utc::now(),
            completed_at: None,
        };
        state.assignments.push(assignment.clone());
        Ok(assignment)
    }

    async fn unassign_shipper(&self, order_id: OrderId) -> Result<()> {
        let mut state = self.state.write().await;

        let position = state
            .assignments
            .iter()
            .position(|a| a.order_id == order_id && a.is_active())
            .ok_or(StoreError::AssignmentNotFound(order_id))?;

        let current = state
            .orders
            .get(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?
            .status;
        if current != OrderStatus::Delivering {
            return Err(StoreError::StatusConflict { order_id, current });
        }

        state.assignments.remove(position);
        if let Some(order) = state.orders.get_mut(&order_id) {
            order.status = OrderStatus::Confirmed;
        }
        Ok(())
    }

    async fn complete_delivery(
        &self,
        order_id: OrderId,
        shipper_id: ShipperId,
    ) -> Result<ShipperAssignment> {
        let mut state = self.state.write().await;

        let current = state
            .orders
            .get(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?
            .status;

        let assignment = state
            .assignments
            .iter_mut()
            .find(|a| a.order_id == order_id && a.is_active())
            .ok_or(StoreError::AssignmentNotFound(order_id))?;
        if assignment.shipper_id != shipper_id {
            return Err(StoreError::NotAssignedShipper {
                order_id,
                shipper_id,
            });
        }
        if current != OrderStatus::Delivering {
            return Err(StoreError::StatusConflict { order_id, current });
        }

        assignment.completed_at = Some(Utc::now());
        let completed = assignment.clone();
        if let Some(order) = state.orders.get_mut(&order_id) {
            order.status = OrderStatus::Delivered;
        }
        Ok(completed)
    }

    async fn active_assignment(&self, order_id: OrderId) -> Result<Option<ShipperAssignment>> {
        let state = self.state.read().await;
        Ok(state
            .assignments
            .iter()
            .find(|a| a.order_id == order_id && a.is_active())
            .cloned())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, name: &str, role: Role, phone: &str) -> Result<User> {
        let mut state = self.state.write().await;
        state.next_user_id += 1;
        let user = User {
            id: UserId::new(state.next_user_id),
            name: name.to_string(),
            role,
            phone: phone.to_string(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn list_shippers(&self) -> Result<Vec<User>> {
        let state = self.state.read().await;
        let mut shippers: Vec<User> = state
            .users
            .values()
            .filter(|u| u.is_shipper())
            .cloned()
            .collect();
        shippers.sort_by_key(|u| u.id);
        Ok(shippers)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).cloned())
    }

    async fn update_user(&self, id: UserId, name: &str, role: Role, phone: &str) -> Result<User> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(&id)
            .ok_or(StoreError::UserNotFound(id))?;
        user.name = name.to_string();
        user.role = role;
        user.phone = phone.to_string();
        Ok(user.clone())
    }
}

//! Order model and state machine.

mod status;

pub use status::{OrderStatus, TransitionAction};

use chrono::{DateTime, Utc};
use common::{BookId, Money, OrderId, PromotionId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// One line of an order: a book, a quantity, and the unit price captured at
/// order time. The snapshot decouples the order from later price changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub book_id: BookId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    /// Creates a line, rejecting a zero quantity.
    pub fn new(book_id: BookId, quantity: u32, unit_price: Money) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { book_id });
        }
        Ok(Self {
            book_id,
            quantity,
            unit_price,
        })
    }

    /// The line subtotal (`quantity * unit_price`).
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// An order ready to be persisted, before the store has assigned an id.
///
/// Amounts are computed by the fulfillment service: `total_amount` is the
/// sum of line subtotals, and `final_amount = total_amount - discount_amount`
/// clamped at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_name: String,
    pub customer_phone: String,
    pub shipping_address: Option<String>,
    pub payment_method: Option<String>,
    pub lines: Vec<OrderLine>,
    pub total_amount: Money,
    pub discount_amount: Money,
    pub final_amount: Money,
    pub promotion_id: Option<PromotionId>,
}

impl NewOrder {
    /// Checks the amount invariants hold.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.lines.is_empty() {
            return Err(DomainError::EmptyOrder);
        }
        debug_assert_eq!(
            self.total_amount,
            self.lines.iter().map(OrderLine::subtotal).sum::<Money>()
        );
        debug_assert_eq!(
            self.final_amount,
            self.total_amount.saturating_sub(self.discount_amount)
        );
        Ok(())
    }
}

/// A persisted order.
///
/// Orders are never deleted; they only move through the status state
/// machine until a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_name: String,
    pub customer_phone: String,
    pub shipping_address: Option<String>,
    pub payment_method: Option<String>,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
    pub total_amount: Money,
    pub discount_amount: Money,
    pub final_amount: Money,
    pub promotion_id: Option<PromotionId>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Returns true if no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_quantity_line_is_rejected() {
        let result = OrderLine::new(BookId::new(1), 0, Money::new(10_000));
        assert!(matches!(result, Err(DomainError::InvalidQuantity { .. })));
    }

    #[test]
    fn line_subtotal_multiplies() {
        let line = OrderLine::new(BookId::new(1), 3, Money::new(25_000)).unwrap();
        assert_eq!(line.subtotal(), Money::new(75_000));
    }

    #[test]
    fn new_order_without_lines_is_rejected() {
        let order = NewOrder {
            customer_name: "An".to_string(),
            customer_phone: "0900000001".to_string(),
            shipping_address: None,
            payment_method: None,
            lines: vec![],
            total_amount: Money::zero(),
            discount_amount: Money::zero(),
            final_amount: Money::zero(),
            promotion_id: None,
        };
        assert_eq!(order.validate(), Err(DomainError::EmptyOrder));
    }
}

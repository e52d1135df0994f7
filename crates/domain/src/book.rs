//! Catalog book model.

use common::{BookId, Money};
use serde::{Deserialize, Serialize};

/// A book in the catalog.
///
/// `stock` is only ever mutated by the stock ledger's atomic reserve and
/// release operations; it never goes negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub price: Money,
    pub stock: u32,
}

impl Book {
    /// Returns true if the requested quantity can be reserved.
    pub fn has_stock(&self, quantity: u32) -> bool {
        self.stock >= quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_stock_at_exact_boundary() {
        let book = Book {
            id: BookId::new(1),
            title: "Số Đỏ".to_string(),
            price: Money::new(85_000),
            stock: 5,
        };
        assert!(book.has_stock(5));
        assert!(!book.has_stock(6));
    }
}

//! Numeric entity identifiers.
//!
//! Every identifier wraps an `i64` (bigserial in the relational schema) to
//! prevent mixing up ids of different entities at compile time.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from a raw numeric value.
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the underlying numeric value.
            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Unique identifier for a book in the catalog.
    BookId
);

define_id!(
    /// Unique identifier for a promotion campaign.
    PromotionId
);

define_id!(
    /// Unique identifier for an order.
    OrderId
);

define_id!(
    /// Unique identifier for a shipper (delivery staff).
    ShipperId
);

define_id!(
    /// Unique identifier for a user account of any role.
    UserId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_preserves_value() {
        let id = BookId::new(42);
        assert_eq!(id.value(), 42);
        assert_eq!(i64::from(id), 42);
    }

    #[test]
    fn id_display_is_numeric() {
        assert_eq!(OrderId::new(7).to_string(), "7");
    }

    #[test]
    fn id_serialization_is_transparent() {
        let id = PromotionId::new(12);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "12");
        let back: PromotionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn ids_are_ordered() {
        assert!(ShipperId::new(1) < ShipperId::new(2));
    }
}

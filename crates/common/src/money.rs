//! Monetary amounts in integer minor units.

use serde::{Deserialize, Serialize};

/// A monetary amount stored as a whole number of the smallest currency unit
/// (Vietnamese đồng has no subunit, so this is simply the amount in đồng).
///
/// Integer representation avoids floating point drift in discount and total
/// computations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a money amount from a raw unit count.
    pub fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns the raw amount.
    pub fn amount(&self) -> i64 {
        self.0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money(self.0 * i64::from(quantity))
    }

    /// Subtracts, clamping the result at zero instead of going negative.
    pub fn saturating_sub(&self, other: Money) -> Money {
        Money((self.0 - other.0).max(0))
    }

    /// Returns the smaller of two amounts.
    pub fn min(self, other: Money) -> Money {
        Money(self.0.min(other.0))
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}đ", self.0)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::ops::SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_arithmetic() {
        let a = Money::new(100_000);
        let b = Money::new(40_000);

        assert_eq!((a + b).amount(), 140_000);
        assert_eq!((a - b).amount(), 60_000);
        assert_eq!(a.multiply(3).amount(), 300_000);
    }

    #[test]
    fn saturating_sub_clamps_at_zero() {
        let subtotal = Money::new(100_000);
        let discount = Money::new(150_000);
        assert_eq!(subtotal.saturating_sub(discount), Money::zero());
        assert_eq!(discount.saturating_sub(subtotal).amount(), 50_000);
    }

    #[test]
    fn sum_over_iterator() {
        let total: Money = [Money::new(10), Money::new(20), Money::new(30)]
            .into_iter()
            .sum();
        assert_eq!(total.amount(), 60);
    }

    #[test]
    fn money_display() {
        assert_eq!(Money::new(120_000).to_string(), "120000đ");
    }

    #[test]
    fn money_serialization_is_transparent() {
        let m = Money::new(99_000);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "99000");
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}

//! Discount computation for order subtotals.

use common::Money;
use serde::{Deserialize, Serialize};

use crate::promotion::{DiscountKind, Promotion};

/// The result of applying a promotion to a subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountOutcome {
    pub discount: Money,
    pub final_amount: Money,
}

/// Computes the discount and final amount for a subtotal.
///
/// - percent: `floor(subtotal * value / 100)`
/// - fixed: the promotion value
/// - no promotion: zero discount
///
/// The discount is clamped to the subtotal so the final amount never goes
/// negative.
pub fn compute_discount(promotion: Option<&Promotion>, subtotal: Money) -> DiscountOutcome {
    let raw = match promotion {
        None => Money::zero(),
        Some(p) => match p.kind {
            DiscountKind::Percent => Money::new(subtotal.amount() * p.value / 100),
            DiscountKind::Fixed => Money::new(p.value),
        },
    };
    let discount = raw.min(subtotal);
    DiscountOutcome {
        discount,
        final_amount: subtotal.saturating_sub(discount),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use common::{BookId, PromotionId};

    fn promo(kind: DiscountKind, value: i64) -> Promotion {
        Promotion {
            id: PromotionId::new(1),
            name: "TET10".to_string(),
            kind,
            value,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            book_ids: vec![BookId::new(1)],
        }
    }

    #[test]
    fn percent_discount_floors() {
        // 10% of 99_999 floors to 9_999.
        let outcome = compute_discount(Some(&promo(DiscountKind::Percent, 10)), Money::new(99_999));
        assert_eq!(outcome.discount, Money::new(9_999));
        assert_eq!(outcome.final_amount, Money::new(90_000));
    }

    #[test]
    fn fixed_discount_subtracts_value() {
        let outcome = compute_discount(Some(&promo(DiscountKind::Fixed, 20_000)), Money::new(100_000));
        assert_eq!(outcome.discount, Money::new(20_000));
        assert_eq!(outcome.final_amount, Money::new(80_000));
    }

    #[test]
    fn fixed_discount_clamps_to_subtotal() {
        // Scenario: subtotal 100,000 with a 150,000 fixed discount.
        let outcome = compute_discount(Some(&promo(DiscountKind::Fixed, 150_000)), Money::new(100_000));
        assert_eq!(outcome.discount, Money::new(100_000));
        assert_eq!(outcome.final_amount, Money::zero());
    }

    #[test]
    fn no_promotion_means_no_discount() {
        let outcome = compute_discount(None, Money::new(55_000));
        assert_eq!(outcome.discount, Money::zero());
        assert_eq!(outcome.final_amount, Money::new(55_000));
    }

    #[test]
    fn hundred_percent_zeroes_the_total() {
        let outcome = compute_discount(Some(&promo(DiscountKind::Percent, 100)), Money::new(42_000));
        assert_eq!(outcome.discount, Money::new(42_000));
        assert_eq!(outcome.final_amount, Money::zero());
    }

    #[test]
    fn zero_subtotal_stays_zero() {
        let outcome = compute_discount(Some(&promo(DiscountKind::Percent, 50)), Money::zero());
        assert_eq!(outcome.discount, Money::zero());
        assert_eq!(outcome.final_amount, Money::zero());
    }
}

//! Promotion campaign model.

use chrono::NaiveDate;
use common::{BookId, PromotionId};
use serde::{Deserialize, Serialize};

use crate::daterange::{DateRange, PromotionWindow};
use crate::error::DomainError;

/// How a promotion's discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    /// `value` is a percentage of the subtotal, 0–100.
    Percent,
    /// `value` is a flat amount in minor currency units.
    Fixed,
}

impl DiscountKind {
    /// Returns the kind name as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountKind::Percent => "percent",
            DiscountKind::Fixed => "fixed",
        }
    }
}

impl std::fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A time-bounded discount campaign over a fixed set of books.
///
/// Invariant (enforced by the store at commit time): two promotions whose
/// windows overlap never share a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    pub id: PromotionId,
    pub name: String,
    pub kind: DiscountKind,
    pub value: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub book_ids: Vec<BookId>,
}

impl Promotion {
    /// The promotion's date range.
    ///
    /// Stored promotions always satisfy `end_date >= start_date`, so this
    /// cannot fail for a value read back from the store.
    pub fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
            .expect("stored promotion has a valid date range")
    }

    /// The window view used by the eligibility resolver.
    pub fn window(&self) -> PromotionWindow {
        PromotionWindow {
            promotion_id: self.id,
            range: self.range(),
            book_ids: self.book_ids.clone(),
        }
    }

    /// Returns true if the promotion is active on the given day.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.range().contains(date)
    }
}

/// A promotion as submitted by staff, before it has an id.
///
/// Used for both create and update requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionDraft {
    pub name: String,
    pub kind: DiscountKind,
    pub value: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub book_ids: Vec<BookId>,
}

impl PromotionDraft {
    /// Validates the draft's shape: name, date order, discount value, and a
    /// non-empty book set. Conflict checking against other promotions is the
    /// store's job.
    pub fn validate(&self) -> Result<DateRange, DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::BlankPromotionName);
        }
        let range = DateRange::new(self.start_date, self.end_date)?;
        match self.kind {
            DiscountKind::Percent if !(0..=100).contains(&self.value) => {
                return Err(DomainError::InvalidDiscountValue {
                    kind: self.kind.as_str(),
                    value: self.value,
                });
            }
            DiscountKind::Fixed if self.value < 0 => {
                return Err(DomainError::InvalidDiscountValue {
                    kind: self.kind.as_str(),
                    value: self.value,
                });
            }
            _ => {}
        }
        if self.book_ids.is_empty() {
            return Err(DomainError::EmptyPromotion);
        }
        Ok(range)
    }

    /// Attaches an id, producing a full promotion.
    pub fn into_promotion(self, id: PromotionId) -> Promotion {
        Promotion {
            id,
            name: self.name,
            kind: self.kind,
            value: self.value,
            start_date: self.start_date,
            end_date: self.end_date,
            book_ids: self.book_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn draft() -> PromotionDraft {
        PromotionDraft {
            name: "TET10".to_string(),
            kind: DiscountKind::Percent,
            value: 10,
            start_date: date(2025, 1, 1),
            end_date: date(2025, 1, 31),
            book_ids: vec![BookId::new(1)],
        }
    }

    #[test]
    fn valid_draft_passes() {
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut d = draft();
        d.name = "   ".to_string();
        assert_eq!(d.validate(), Err(DomainError::BlankPromotionName));
    }

    #[test]
    fn reversed_dates_are_rejected() {
        let mut d = draft();
        d.start_date = date(2025, 2, 1);
        d.end_date = date(2025, 1, 1);
        assert!(matches!(d.validate(), Err(DomainError::InvalidRange { .. })));
    }

    #[test]
    fn percent_over_100_is_rejected() {
        let mut d = draft();
        d.value = 101;
        assert!(matches!(
            d.validate(),
            Err(DomainError::InvalidDiscountValue { .. })
        ));
    }

    #[test]
    fn negative_fixed_value_is_rejected() {
        let mut d = draft();
        d.kind = DiscountKind::Fixed;
        d.value = -1;
        assert!(matches!(
            d.validate(),
            Err(DomainError::InvalidDiscountValue { .. })
        ));
    }

    #[test]
    fn empty_book_set_is_rejected() {
        let mut d = draft();
        d.book_ids.clear();
        assert_eq!(d.validate(), Err(DomainError::EmptyPromotion));
    }

    #[test]
    fn active_on_boundary_days() {
        let promo = draft().into_promotion(PromotionId::new(1));
        assert!(promo.is_active_on(date(2025, 1, 1)));
        assert!(promo.is_active_on(date(2025, 1, 31)));
        assert!(!promo.is_active_on(date(2025, 2, 1)));
    }

    #[test]
    fn discount_kind_wire_format() {
        assert_eq!(
            serde_json::to_string(&DiscountKind::Percent).unwrap(),
            "\"percent\""
        );
        assert_eq!(
            serde_json::to_string(&DiscountKind::Fixed).unwrap(),
            "\"fixed\""
        );
    }
}

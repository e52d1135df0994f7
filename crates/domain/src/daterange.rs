//! Calendar date-range algebra for promotion windows.
//!
//! All comparisons operate on `NaiveDate` — whole calendar days with an
//! inclusive end. Timestamps never enter this module, so a campaign that
//! ends on the 31st conflicts with one that starts on the 31st regardless
//! of clock time or timezone.

use chrono::NaiveDate;
use common::{BookId, PromotionId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range, rejecting one whose end precedes its start.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DomainError> {
        if end < start {
            return Err(DomainError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// First day of the range.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the range (inclusive).
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Returns true if the two ranges share at least one calendar day.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Returns true if the given day falls inside the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A promotion's date range tagged with its id and committed book set.
///
/// This is the unit the eligibility resolver works over: enough to decide
/// whether a candidate range conflicts and which books are already taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionWindow {
    pub promotion_id: PromotionId,
    pub range: DateRange,
    pub book_ids: Vec<BookId>,
}

/// Filters `windows` down to those overlapping `candidate`, skipping the
/// window owned by `exclude` (used when editing a promotion against itself).
pub fn overlapping_windows<'a>(
    candidate: &DateRange,
    windows: &'a [PromotionWindow],
    exclude: Option<PromotionId>,
) -> Vec<&'a PromotionWindow> {
    windows
        .iter()
        .filter(|w| Some(w.promotion_id) != exclude)
        .filter(|w| w.range.overlaps(candidate))
        .collect()
}

/// Returns the requested book ids already committed to any of the given
/// windows, sorted and deduplicated.
///
/// An empty result means the requested set is conflict-free.
pub fn conflicting_books(requested: &[BookId], windows: &[&PromotionWindow]) -> Vec<BookId> {
    let mut conflicts: Vec<BookId> = requested
        .iter()
        .filter(|id| windows.iter().any(|w| w.book_ids.contains(id)))
        .copied()
        .collect();
    conflicts.sort();
    conflicts.dedup();
    conflicts
}

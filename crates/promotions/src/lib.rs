//! Promotion eligibility resolver.
//!
//! Decides which books may be attached to a candidate campaign window and
//! validates create/update requests against the committed campaigns. The
//! selection-time check here produces the friendly conflict report; the
//! store repeats the same check inside its write transaction, so two
//! concurrent conflicting requests can never both commit.

pub mod error;

use std::collections::HashSet;

use chrono::NaiveDate;
use common::{BookId, PromotionId};
use domain::{
    Book, DateRange, Promotion, PromotionDraft, conflicting_books, overlapping_windows,
};
use store::{BookStore, PromotionStore, StoreError};

pub use error::{PromotionError, Result};

/// Service resolving promotion eligibility over the authoritative store.
pub struct PromotionService<S> {
    store: S,
}

impl<S: BookStore + PromotionStore> PromotionService<S> {
    /// Creates a new service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Lists the catalog books not committed to any promotion whose window
    /// overlaps `[start, end]`.
    ///
    /// `exclude` skips one promotion's own window when editing it.
    #[tracing::instrument(skip(self))]
    pub async fn list_available_books(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        exclude: Option<PromotionId>,
    ) -> Result<Vec<Book>> {
        let range = DateRange::new(start, end)?;

        let windows = self.store.promotion_windows(exclude).await?;
        let hits = overlapping_windows(&range, &windows, exclude);
        let committed: HashSet<BookId> = hits
            .iter()
            .flat_map(|w| w.book_ids.iter().copied())
            .collect();

        let books = self.store.list_books().await?;
        Ok(books
            .into_iter()
            .filter(|book| !committed.contains(&book.id))
            .collect())
    }

    /// Validates a draft against the committed campaigns without writing.
    ///
    /// Returns the conflicting book ids; an empty list means the draft's
    /// book set is free for its window.
    async fn conflicts_for(
        &self,
        draft: &PromotionDraft,
        exclude: Option<PromotionId>,
    ) -> Result<Vec<BookId>> {
        let range = draft.validate()?;
        let windows = self.store.promotion_windows(exclude).await?;
        let hits = overlapping_windows(&range, &windows, exclude);
        Ok(conflicting_books(&draft.book_ids, &hits))
    }

    /// Creates a promotion. The store re-validates inside its own write
    /// transaction, closing the concurrent-create race.
    #[tracing::instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create_promotion(&self, draft: PromotionDraft) -> Result<Promotion> {
        let conflicts = self.conflicts_for(&draft, None).await?;
        if !conflicts.is_empty() {
            return Err(StoreError::PromotionConflict {
                book_ids: conflicts,
            }
            .into());
        }

        let promotion = self.store.insert_promotion(draft).await?;
        metrics::counter!("promotions_created_total").increment(1);
        Ok(promotion)
    }

    /// Updates a promotion, excluding its own window from conflict checks.
    #[tracing::instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn update_promotion(
        &self,
        id: PromotionId,
        draft: PromotionDraft,
    ) -> Result<Promotion> {
        if self.store.get_promotion(id).await?.is_none() {
            return Err(PromotionError::NotFound(id));
        }

        let conflicts = self.conflicts_for(&draft, Some(id)).await?;
        if !conflicts.is_empty() {
            return Err(StoreError::PromotionConflict {
                book_ids: conflicts,
            }
            .into());
        }

        Ok(self.store.update_promotion(id, draft).await?)
    }

    /// Fetches a promotion by id.
    pub async fn get_promotion(&self, id: PromotionId) -> Result<Promotion> {
        self.store
            .get_promotion(id)
            .await?
            .ok_or(PromotionError::NotFound(id))
    }

    /// Lists all promotions.
    pub async fn list_promotions(&self) -> Result<Vec<Promotion>> {
        Ok(self.store.list_promotions().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;
    use domain::{DiscountKind, DomainError};
    use store::MemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn draft(name: &str, start: NaiveDate, end: NaiveDate, books: Vec<BookId>) -> PromotionDraft {
        PromotionDraft {
            name: name.to_string(),
            kind: DiscountKind::Percent,
            value: 10,
            start_date: start,
            end_date: end,
            book_ids: books,
        }
    }

    async fn seed_books(store: &MemoryStore, count: usize) -> Vec<Book> {
        let mut books = Vec::new();
        for i in 0..count {
            books.push(
                store
                    .insert_book(&format!("Sách {i}"), Money::new(60_000), 10)
                    .await
                    .unwrap(),
            );
        }
        books
    }

    #[tokio::test]
    async fn reversed_range_is_invalid() {
        let service = PromotionService::new(MemoryStore::new());
        let result = service
            .list_available_books(date(2025, 2, 1), date(2025, 1, 1), None)
            .await;
        assert!(matches!(
            result,
            Err(PromotionError::Domain(DomainError::InvalidRange { .. }))
        ));
    }

    #[tokio::test]
    async fn committed_books_are_unavailable_for_overlapping_window() {
        let store = MemoryStore::new();
        let books = seed_books(&store, 3).await;
        let service = PromotionService::new(store);

        service
            .create_promotion(draft(
                "TET10",
                date(2025, 1, 1),
                date(2025, 1, 31),
                vec![books[0].id],
            ))
            .await
            .unwrap();

        let available = service
            .list_available_books(date(2025, 1, 15), date(2025, 2, 15), None)
            .await
            .unwrap();
        let ids: Vec<BookId> = available.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![books[1].id, books[2].id]);

        // A disjoint window sees the whole catalog.
        let available = service
            .list_available_books(date(2025, 3, 1), date(2025, 3, 31), None)
            .await
            .unwrap();
        assert_eq!(available.len(), 3);
    }

    #[tokio::test]
    async fn overlapping_create_with_shared_book_is_rejected() {
        // Scenario: "TET10" (2025-01-01..31) holds book Y; "TET10B"
        // (2025-01-15..02-01) requesting Y is rejected naming Y.
        let store = MemoryStore::new();
        let books = seed_books(&store, 2).await;
        let service = PromotionService::new(store);
        let book_y = books[0].id;

        service
            .create_promotion(draft("TET10", date(2025, 1, 1), date(2025, 1, 31), vec![book_y]))
            .await
            .unwrap();

        let result = service
            .create_promotion(draft(
                "TET10B",
                date(2025, 1, 15),
                date(2025, 2, 1),
                vec![book_y],
            ))
            .await;
        match result {
            Err(PromotionError::Store(StoreError::PromotionConflict { book_ids })) => {
                assert_eq!(book_ids, vec![book_y]);
            }
            other => panic!("expected PromotionConflict, got {other:?}"),
        }

        // The conflicting campaign can take the other book instead.
        service
            .create_promotion(draft(
                "TET10B",
                date(2025, 1, 15),
                date(2025, 2, 1),
                vec![books[1].id],
            ))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_does_not_conflict_with_itself() {
        let store = MemoryStore::new();
        let books = seed_books(&store, 1).await;
        let service = PromotionService::new(store);

        let promo = service
            .create_promotion(draft(
                "TET10",
                date(2025, 1, 1),
                date(2025, 1, 31),
                vec![books[0].id],
            ))
            .await
            .unwrap();

        let updated = service
            .update_promotion(
                promo.id,
                draft("TET10", date(2025, 1, 1), date(2025, 2, 28), vec![books[0].id]),
            )
            .await
            .unwrap();
        assert_eq!(updated.end_date, date(2025, 2, 28));
    }

    #[tokio::test]
    async fn update_unknown_promotion_is_not_found() {
        let store = MemoryStore::new();
        let books = seed_books(&store, 1).await;
        let service = PromotionService::new(store);

        let result = service
            .update_promotion(
                PromotionId::new(99),
                draft("TET10", date(2025, 1, 1), date(2025, 1, 31), vec![books[0].id]),
            )
            .await;
        assert!(matches!(result, Err(PromotionError::NotFound(_))));
    }
}

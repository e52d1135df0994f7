//! Promotion service error types.

use common::PromotionId;
use domain::DomainError;
use store::StoreError;
use thiserror::Error;

/// Errors that can occur while resolving eligibility or saving promotions.
#[derive(Debug, Error)]
pub enum PromotionError {
    /// Domain validation failed (bad range, bad discount value, …).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The store rejected the operation (conflict, not found, database).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Promotion not found.
    #[error("promotion not found: {0}")]
    NotFound(PromotionId),
}

/// Result type for promotion operations.
pub type Result<T> = std::result::Result<T, PromotionError>;

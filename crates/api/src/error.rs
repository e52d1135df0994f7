//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use fulfillment::FulfillmentError;
use promotions::PromotionError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Caller lacks the capability (or identity) for the operation.
    Forbidden(String),
    /// Fulfillment workflow error.
    Fulfillment(FulfillmentError),
    /// Promotion service error.
    Promotion(PromotionError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, book_ids) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),
            ApiError::Fulfillment(err) => fulfillment_error_to_response(err),
            ApiError::Promotion(err) => promotion_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg, None)
            }
        };

        let body = match book_ids {
            Some(ids) => serde_json::json!({ "error": message, "book_ids": ids }),
            None => serde_json::json!({ "error": message }),
        };
        (status, axum::Json(body)).into_response()
    }
}

type ErrorParts = (StatusCode, String, Option<Vec<i64>>);

fn domain_error_to_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::InvalidTransition { .. } => StatusCode::CONFLICT,
        _ => StatusCode::BAD_REQUEST,
    }
}

fn store_error_to_response(err: StoreError) -> ErrorParts {
    let message = err.to_string();
    match err {
        StoreError::InsufficientStock { book_ids }
        | StoreError::PromotionConflict { book_ids } => (
            StatusCode::CONFLICT,
            message,
            Some(book_ids.iter().map(|id| id.value()).collect()),
        ),
        StoreError::ShipperUnavailable { .. } | StoreError::StatusConflict { .. } => {
            (StatusCode::CONFLICT, message, None)
        }
        StoreError::NotAssignedShipper { .. } => (StatusCode::FORBIDDEN, message, None),
        StoreError::BookNotFound(_)
        | StoreError::OrderNotFound(_)
        | StoreError::PromotionNotFound(_)
        | StoreError::UserNotFound(_)
        | StoreError::AssignmentNotFound(_) => (StatusCode::NOT_FOUND, message, None),
        StoreError::Domain(domain) => (domain_error_to_status(&domain), message, None),
        StoreError::Decode(_) | StoreError::Database(_) | StoreError::Migration(_) => {
            tracing::error!(error = %message, "store failure");
            (StatusCode::INTERNAL_SERVER_ERROR, message, None)
        }
    }
}

fn fulfillment_error_to_response(err: FulfillmentError) -> ErrorParts {
    let message = err.to_string();
    match err {
        FulfillmentError::Domain(domain) => (domain_error_to_status(&domain), message, None),
        FulfillmentError::Store(store) => store_error_to_response(store),
        FulfillmentError::OrderNotFound(_) | FulfillmentError::UnknownPromotionCode(_) => {
            (StatusCode::NOT_FOUND, message, None)
        }
        FulfillmentError::NotAShipper(_) => (StatusCode::BAD_REQUEST, message, None),
        FulfillmentError::Forbidden { .. } => (StatusCode::FORBIDDEN, message, None),
    }
}

fn promotion_error_to_response(err: PromotionError) -> ErrorParts {
    let message = err.to_string();
    match err {
        PromotionError::Domain(domain) => (domain_error_to_status(&domain), message, None),
        PromotionError::Store(store) => store_error_to_response(store),
        PromotionError::NotFound(_) => (StatusCode::NOT_FOUND, message, None),
    }
}

impl From<FulfillmentError> for ApiError {
    fn from(err: FulfillmentError) -> Self {
        ApiError::Fulfillment(err)
    }
}

impl From<PromotionError> for ApiError {
    fn from(err: PromotionError) -> Self {
        ApiError::Promotion(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        // Route store errors through the fulfillment mapping so every
        // handler gets the same status translation.
        ApiError::Fulfillment(FulfillmentError::Store(err))
    }
}

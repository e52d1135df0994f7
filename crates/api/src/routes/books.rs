//! Catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use common::Money;
use domain::{Book, Capability};
use serde::Deserialize;
use store::Store;

use crate::error::ApiError;
use crate::routes::{AppState, actor_from_headers, require};

#[derive(Deserialize)]
pub struct CreateBookRequest {
    pub title: String,
    pub price: i64,
    pub stock: u32,
}

/// GET /books — list the catalog.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Book>>, ApiError> {
    Ok(Json(state.store.list_books().await?))
}

/// POST /books — add a book to the catalog.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<CreateBookRequest>,
) -> Result<(axum::http::StatusCode, Json<Book>), ApiError> {
    let actor = actor_from_headers(&headers)?;
    require(actor, Capability::ManageCatalog, "manage the catalog")?;

    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title must not be blank".to_string()));
    }
    if req.price < 0 {
        return Err(ApiError::BadRequest("price must not be negative".to_string()));
    }

    let book = state
        .store
        .insert_book(&req.title, Money::new(req.price), req.stock)
        .await?;
    Ok((axum::http::StatusCode::CREATED, Json(book)))
}

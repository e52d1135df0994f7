//! Promotion campaign endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use chrono::NaiveDate;
use common::PromotionId;
use domain::{Book, Capability, Promotion, PromotionDraft};
use serde::Deserialize;
use store::Store;

use crate::error::ApiError;
use crate::routes::{AppState, actor_from_headers, require};

#[derive(Debug, Deserialize)]
pub struct AvailableBooksQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub exclude_id: Option<i64>,
}

/// GET /promotions — list all campaigns.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Promotion>>, ApiError> {
    Ok(Json(state.promotions.list_promotions().await?))
}

/// GET /promotions/{id} — fetch one campaign.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<Promotion>, ApiError> {
    let promotion = state.promotions.get_promotion(PromotionId::new(id)).await?;
    Ok(Json(promotion))
}

/// GET /promotions/available-books — books free for a candidate window.
#[tracing::instrument(skip(state))]
pub async fn available_books<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<AvailableBooksQuery>,
) -> Result<Json<Vec<Book>>, ApiError> {
    let books = state
        .promotions
        .list_available_books(
            query.start_date,
            query.end_date,
            query.exclude_id.map(PromotionId::new),
        )
        .await?;
    Ok(Json(books))
}

/// POST /promotions — create a campaign.
#[tracing::instrument(skip(state, headers, draft))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(draft): Json<PromotionDraft>,
) -> Result<(axum::http::StatusCode, Json<Promotion>), ApiError> {
    let actor = actor_from_headers(&headers)?;
    require(actor, Capability::ManagePromotions, "manage promotions")?;

    let promotion = state.promotions.create_promotion(draft).await?;
    Ok((axum::http::StatusCode::CREATED, Json(promotion)))
}

/// PUT /promotions/{id} — replace a campaign.
#[tracing::instrument(skip(state, headers, draft))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(draft): Json<PromotionDraft>,
) -> Result<Json<Promotion>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    require(actor, Capability::ManagePromotions, "manage promotions")?;

    let promotion = state
        .promotions
        .update_promotion(PromotionId::new(id), draft)
        .await?;
    Ok(Json(promotion))
}

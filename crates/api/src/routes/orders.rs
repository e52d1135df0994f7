//! Order workflow endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use common::{OrderId, ShipperId};
use domain::{Order, ShipperAssignment};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::error::ApiError;
use crate::routes::{AppState, actor_from_headers};

#[derive(Deserialize)]
pub struct ConfirmRequest {
    pub order_ids: Vec<i64>,
}

#[derive(Serialize)]
pub struct ConfirmResponse {
    pub confirmed: u64,
}

#[derive(Deserialize)]
pub struct AssignShipperRequest {
    pub shipper_id: i64,
}

/// GET /orders — list orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.fulfillment.list_orders().await?))
}

/// GET /orders/{id} — fetch one order.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.fulfillment.get_order(OrderId::new(id)).await?))
}

/// PATCH /orders/confirm — bulk-confirm pending orders.
///
/// Ids that are missing or no longer pending are skipped silently; the
/// response reports how many orders actually transitioned.
#[tracing::instrument(skip(state, headers, req))]
pub async fn confirm<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<ConfirmResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let ids: Vec<OrderId> = req.order_ids.iter().copied().map(OrderId::new).collect();
    let confirmed = state.fulfillment.confirm_orders(actor, &ids).await?;
    Ok(Json(ConfirmResponse { confirmed }))
}

/// PATCH /orders/{id}/confirm — single-order confirm with the same
/// idempotent semantics as the bulk endpoint.
#[tracing::instrument(skip(state, headers))]
pub async fn confirm_one<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<ConfirmResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let confirmed = state
        .fulfillment
        .confirm_orders(actor, &[OrderId::new(id)])
        .await?;
    Ok(Json(ConfirmResponse { confirmed }))
}

/// POST /orders/{id}/assign-shipper — hand a confirmed order to a shipper.
#[tracing::instrument(skip(state, headers, req))]
pub async fn assign_shipper<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<AssignShipperRequest>,
) -> Result<(axum::http::StatusCode, Json<ShipperAssignment>), ApiError> {
    let actor = actor_from_headers(&headers)?;
    let assignment = state
        .fulfillment
        .assign_shipper(actor, OrderId::new(id), ShipperId::new(req.shipper_id))
        .await?;
    Ok((axum::http::StatusCode::CREATED, Json(assignment)))
}

/// PATCH /orders/{id}/unassign-shipper — return a delivering order to
/// confirmed.
#[tracing::instrument(skip(state, headers))]
pub async fn unassign_shipper<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Order>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    state
        .fulfillment
        .unassign_shipper(actor, OrderId::new(id))
        .await?;
    Ok(Json(state.fulfillment.get_order(OrderId::new(id)).await?))
}

/// PATCH /orders/{id}/complete — the assigned shipper confirms delivery.
#[tracing::instrument(skip(state, headers))]
pub async fn complete<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<ShipperAssignment>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let assignment = state
        .fulfillment
        .complete_delivery(actor, OrderId::new(id))
        .await?;
    Ok(Json(assignment))
}

/// PATCH /orders/{id}/cancel — cancel and restore reserved stock.
#[tracing::instrument(skip(state, headers))]
pub async fn cancel<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Order>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let order = state
        .fulfillment
        .cancel_order(actor, OrderId::new(id))
        .await?;
    Ok(Json(order))
}

//! Invoice creation endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use common::BookId;
use domain::Order;
use fulfillment::{CreateInvoice, InvoiceLine};
use serde::Deserialize;
use store::Store;

use crate::error::ApiError;
use crate::routes::{AppState, actor_from_headers};

#[derive(Deserialize)]
pub struct InvoiceLineRequest {
    pub book_id: i64,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct InvoiceRequest {
    pub customer_name: String,
    pub customer_phone: String,
    pub shipping_address: Option<String>,
    pub payment_method: Option<String>,
    /// Accepted under both the snake_case and the legacy camelCase name.
    /// Unit prices are snapshotted from the catalog server-side; a client-
    /// supplied price field is ignored.
    #[serde(alias = "bookDetails")]
    pub book_details: Vec<InvoiceLineRequest>,
    pub promotion_code: Option<String>,
}

/// POST /invoices — create an order from a sales invoice.
#[tracing::instrument(skip(state, headers, req), fields(customer = %req.customer_name))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<InvoiceRequest>,
) -> Result<(axum::http::StatusCode, Json<Order>), ApiError> {
    let actor = actor_from_headers(&headers)?;

    let invoice = CreateInvoice {
        customer_name: req.customer_name,
        customer_phone: req.customer_phone,
        shipping_address: req.shipping_address,
        payment_method: req.payment_method,
        lines: req
            .book_details
            .iter()
            .map(|line| InvoiceLine {
                book_id: BookId::new(line.book_id),
                quantity: line.quantity,
            })
            .collect(),
        promotion_code: req.promotion_code,
    };

    let order = state.fulfillment.create_invoice(actor, invoice).await?;
    Ok((axum::http::StatusCode::CREATED, Json(order)))
}

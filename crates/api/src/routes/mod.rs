//! Route handlers and shared application state.

pub mod books;
pub mod health;
pub mod invoices;
pub mod metrics;
pub mod orders;
pub mod promotions;
pub mod users;

use std::sync::Arc;

use axum::http::HeaderMap;
use cache::Cache;
use common::UserId;
use domain::{Capability, Role};
use ::promotions::PromotionService;
use fulfillment::{Actor, FulfillmentService};
use store::Store;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub store: S,
    pub fulfillment: FulfillmentService<S>,
    pub promotions: PromotionService<S>,
    pub cache: Arc<dyn Cache>,
}

impl<S: Store + Clone> AppState<S> {
    /// Wires the services over one store and the injected cache.
    pub fn new(store: S, cache: Arc<dyn Cache>) -> Self {
        Self {
            fulfillment: FulfillmentService::new(store.clone()),
            promotions: PromotionService::new(store.clone()),
            store,
            cache,
        }
    }
}

/// Builds the caller identity from the gateway-provided headers.
///
/// Authentication itself happens upstream; this layer only needs the id
/// and role to evaluate capabilities.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
    let user_id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("missing x-user-id header".to_string()))?;
    let user_id: i64 = user_id
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid x-user-id header".to_string()))?;

    let role = headers
        .get("x-user-role")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("missing x-user-role header".to_string()))?;
    let role: Role = role
        .parse()
        .map_err(|e: String| ApiError::BadRequest(e))?;

    Ok(Actor::new(UserId::new(user_id), role))
}

/// Rejects callers whose role lacks the capability.
pub fn require(actor: Actor, capability: Capability, action: &str) -> Result<(), ApiError> {
    if actor.role.can(capability) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "role {} may not {action}",
            actor.role
        )))
    }
}

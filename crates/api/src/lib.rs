//! HTTP API server with observability for the bookstore sales system.
//!
//! Provides REST endpoints for the catalog, promotions, invoicing, and the
//! order fulfillment workflow, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post, put};
use cache::MemoryCache;
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/books", get(routes::books::list::<S>))
        .route("/books", post(routes::books::create::<S>))
        .route("/promotions", get(routes::promotions::list::<S>))
        .route("/promotions", post(routes::promotions::create::<S>))
        .route(
            "/promotions/available-books",
            get(routes::promotions::available_books::<S>),
        )
        .route("/promotions/{id}", get(routes::promotions::get::<S>))
        .route("/promotions/{id}", put(routes::promotions::update::<S>))
        .route("/invoices", post(routes::invoices::create::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/confirm", patch(routes::orders::confirm::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/confirm", patch(routes::orders::confirm_one::<S>))
        .route(
            "/orders/{id}/assign-shipper",
            post(routes::orders::assign_shipper::<S>),
        )
        .route(
            "/orders/{id}/unassign-shipper",
            patch(routes::orders::unassign_shipper::<S>),
        )
        .route("/orders/{id}/complete", patch(routes::orders::complete::<S>))
        .route("/orders/{id}/cancel", patch(routes::orders::cancel::<S>))
        .route("/users", get(routes::users::list::<S>))
        .route("/users", post(routes::users::create::<S>))
        .route("/users/shippers", get(routes::users::shippers::<S>))
        .route("/users/role/{role}", get(routes::users::by_role::<S>))
        .route("/users/{id}", get(routes::users::get::<S>))
        .route("/users/{id}", put(routes::users::update::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state over the given store with an in-memory cache.
pub fn create_default_state<S: Store + Clone + 'static>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store, Arc::new(MemoryCache::new())))
}

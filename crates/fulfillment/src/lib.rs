//! Order fulfillment workflow for the bookstore sales system.
//!
//! Sequences the order lifecycle — invoice creation, confirmation, shipper
//! assignment, delivery completion, cancellation — on top of the store's
//! atomic primitives, with role-capability guards on every transition.

pub mod error;
pub mod service;

pub use error::{FulfillmentError, Result};
pub use service::{Actor, CreateInvoice, FulfillmentService, InvoiceLine};

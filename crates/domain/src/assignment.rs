//! Shipper assignment model.

use chrono::{DateTime, Utc};
use common::{OrderId, ShipperId};
use serde::{Deserialize, Serialize};

/// Binds a shipper to an order that is out for delivery.
///
/// An assignment is *active* until `completed_at` is set; at most one active
/// assignment exists per order, and (defensively) per shipper. The
/// `completed_at` timestamp is the authoritative delivery time for
/// reporting, not the order's creation date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipperAssignment {
    pub order_id: OrderId,
    pub shipper_id: ShipperId,
    pub assigned_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ShipperAssignment {
    /// Returns true while the delivery has not been confirmed.
    pub fn is_active(&self) -> bool {
        self.completed_at.is_none()
    }
}

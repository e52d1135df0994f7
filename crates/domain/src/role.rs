//! Staff roles and their capabilities.
//!
//! Transition guards consume capabilities, never role identifiers, so the
//! state machine stays decoupled from how the presentation layer labels
//! its users.

use serde::{Deserialize, Serialize};

/// A user's role in the bookstore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Sales,
    Warehouse,
    OrderManager,
    Shipper,
    Customer,
}

/// A discrete permission a role may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    CreateInvoices,
    ConfirmOrders,
    AssignShippers,
    CompleteDelivery,
    CancelOrders,
    ManagePromotions,
    ManageCatalog,
    ManageUsers,
}

impl Role {
    /// The capability set granted to this role.
    pub fn capabilities(&self) -> &'static [Capability] {
        use Capability::*;
        match self {
            Role::Admin => &[
                CreateInvoices,
                ConfirmOrders,
                AssignShippers,
                CompleteDelivery,
                CancelOrders,
                ManagePromotions,
                ManageCatalog,
                ManageUsers,
            ],
            Role::Sales => &[CreateInvoices, ManagePromotions],
            Role::Warehouse => &[ConfirmOrders, ManageCatalog],
            Role::OrderManager => &[ConfirmOrders, AssignShippers, CancelOrders],
            Role::Shipper => &[CompleteDelivery],
            Role::Customer => &[CancelOrders],
        }
    }

    /// Returns true if the role holds the given capability.
    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Returns the role name as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Sales => "sales",
            Role::Warehouse => "warehouse",
            Role::OrderManager => "order_manager",
            Role::Shipper => "shipper",
            Role::Customer => "customer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "sales" => Ok(Role::Sales),
            "warehouse" => Ok(Role::Warehouse),
            "order_manager" => Ok(Role::OrderManager),
            "shipper" => Ok(Role::Shipper),
            "customer" => Ok(Role::Customer),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

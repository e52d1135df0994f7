//! User account model.

use common::UserId;
use serde::{Deserialize, Serialize};

use crate::role::Role;

/// A user account: staff of any role or an end customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub role: Role,
    pub phone: String,
}

impl User {
    /// Returns true if this account is delivery staff.
    pub fn is_shipper(&self) -> bool {
        self.role == Role::Shipper
    }
}

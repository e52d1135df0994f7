//! Well-known cache keys and TTLs for the user directory.
//!
//! Every write to a user must invalidate the aggregate list keys plus the
//! user's own keys; [`user_write_invalidations`] builds that exact set.

use std::time::Duration;

/// All users.
pub const USERS_ALL: &str = "users:all";

/// Users with the shipper role.
pub const USERS_SHIPPERS: &str = "users:shippers";

/// TTL for list lookups (30 minutes).
pub const LIST_TTL: Duration = Duration::from_secs(30 * 60);

/// TTL for single-entity lookups (20 minutes).
pub const ENTITY_TTL: Duration = Duration::from_secs(20 * 60);

/// Key for a single user.
pub fn user(id: i64) -> String {
    format!("users:{id}")
}

/// Key for the users holding a given role.
pub fn users_by_role(role: &str) -> String {
    format!("users:role:{role}")
}

/// The keys a mutation of `id` (previously and/or now holding `roles`)
/// must invalidate.
pub fn user_write_invalidations(id: i64, roles: &[&str]) -> Vec<String> {
    let mut keys = vec![USERS_ALL.to_string(), USERS_SHIPPERS.to_string(), user(id)];
    for role in roles {
        keys.push(users_by_role(role));
    }
    keys
}

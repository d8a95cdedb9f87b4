//! Static role/capability registry and the permission guard.
//!
//! Loaded-once, read-only configuration: role names map to a capability
//! bitfield. An unrecognized role name resolves to the empty set -- denial by
//! absence is the normal path and never raises an error by itself.

use crate::dao::base::{DaoError, DaoResult};

/// Capability bits (u64 bitfield), namespaced by resource domain.
pub mod capabilities {
    pub const VIEW_PROJECTS: u64 = 1 << 0;
    pub const MANAGE_PROJECTS: u64 = 1 << 1;
    pub const VIEW_TASKS: u64 = 1 << 2;
    pub const MANAGE_TASKS: u64 = 1 << 3;
    pub const VIEW_DOCUMENTS: u64 = 1 << 4;
    pub const MANAGE_DOCUMENTS: u64 = 1 << 5;
    pub const VIEW_QUOTES: u64 = 1 << 6;
    pub const MANAGE_QUOTES: u64 = 1 << 7;
    pub const VIEW_MEMBERS: u64 = 1 << 8;
    pub const MANAGE_MEMBERS: u64 = 1 << 9;
    pub const VIEW_ANALYTICS: u64 = 1 << 10;
    pub const MANAGE_SETTINGS: u64 = 1 << 11;

    /// Read-only slice of the tenant.
    pub const VIEW_ALL: u64 = VIEW_PROJECTS
        | VIEW_TASKS
        | VIEW_DOCUMENTS
        | VIEW_QUOTES
        | VIEW_MEMBERS
        | VIEW_ANALYTICS;

    /// Everything.
    pub const ALL: u64 = (1 << 12) - 1;
}

/// The configured role vocabulary. Membership rows may carry any string;
/// only these four grant capabilities.
pub mod roles {
    pub const OWNER: &str = "owner";
    pub const ADMIN: &str = "admin";
    pub const MEMBER: &str = "member";
    pub const VIEWER: &str = "viewer";

    pub const VOCABULARY: [&str; 4] = [OWNER, ADMIN, MEMBER, VIEWER];

    pub fn is_valid(role: &str) -> bool {
        VOCABULARY.contains(&role)
    }
}

/// Capability set for a role name. Unknown roles get the empty set.
pub fn capabilities_of(role: &str) -> u64 {
    match role {
        roles::OWNER => capabilities::ALL,
        // Admins hold every capability; the operations reserved to owners
        // (minting owners) are gated on the literal role, not a capability.
        roles::ADMIN => capabilities::ALL,
        roles::MEMBER => {
            capabilities::VIEW_ALL
                | capabilities::MANAGE_PROJECTS
                | capabilities::MANAGE_TASKS
                | capabilities::MANAGE_DOCUMENTS
        }
        roles::VIEWER => capabilities::VIEW_ALL,
        _ => 0,
    }
}

pub fn has(granted: u64, required: u64) -> bool {
    granted & required == required
}

/// Pure, side-effect-free guard. Every gated operation calls this before
/// touching the store; failure short-circuits with no state change.
pub fn authorize(role: &str, required: u64) -> DaoResult<()> {
    if has(capabilities_of(role), required) {
        Ok(())
    } else {
        Err(DaoError::PermissionDenied {
            role: role.to_string(),
        })
    }
}

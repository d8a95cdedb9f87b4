use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// The (user, tenant) relation. Rows are never hard-deleted: removal flips
/// `status` to `removed` and stamps `removed_at`, so history stays queryable.
/// At most one `active` row may exist per (tenant, user) pair; the partial
/// unique index in `indexes.rs` enforces it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub tenant_id: ObjectId,
    pub user_id: ObjectId,
    /// Role name; anything outside the configured vocabulary carries zero
    /// capabilities (see `sitedesk_services::rbac`).
    pub role: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub status: MembershipStatus,
    pub invited_by: Option<ObjectId>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub removed_at: Option<DateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    #[default]
    Active,
    Removed,
}

impl Membership {
    pub const COLLECTION: &'static str = "memberships";

    pub fn is_active(&self) -> bool {
        self.status == MembershipStatus::Active
    }
}

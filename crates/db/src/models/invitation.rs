use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub tenant_id: ObjectId,
    pub email: String,
    pub role: String,
    /// Opaque single-use token; unique-indexed, never regenerated (resend
    /// re-arms the expiry clock on the same token).
    pub token: String,
    #[serde(default)]
    pub status: InvitationStatus,
    pub invited_by: ObjectId,
    pub expires_at: DateTime,
    pub accepted_at: Option<DateTime>,
    pub revoked_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
    Expired,
    Revoked,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Declined => "declined",
            InvitationStatus::Expired => "expired",
            InvitationStatus::Revoked => "revoked",
        }
    }

    pub fn is_terminal(&self) -> bool {
        *self != InvitationStatus::Pending
    }
}

impl Invitation {
    pub const COLLECTION: &'static str = "invitations";

    /// Lazy expiry: the status an invitation *is* at `now`, regardless of
    /// what the store last wrote. A stored `pending` past its `expires_at`
    /// is expired; terminal states are immune to the clock. Readers persist
    /// the transition back as a best-effort cache fill -- correctness never
    /// depends on the write-back landing.
    pub fn effective_status(&self, now: DateTime) -> InvitationStatus {
        if self.status == InvitationStatus::Pending && self.expires_at <= now {
            InvitationStatus::Expired
        } else {
            self.status
        }
    }

    pub fn is_expired(&self, now: DateTime) -> bool {
        self.effective_status(now) == InvitationStatus::Expired
    }
}

use bson::{DateTime, doc, oid::ObjectId};
use mongodb::{ClientSession, Database};
use nanoid::nanoid;
use serde::Serialize;
use sitedesk_config::InvitationSettings;
use sitedesk_db::models::{
    Invitation, InvitationStatus, Membership, MembershipStatus, Tenant, User,
};
use tracing::{debug, warn};

use super::base::{BaseDao, DaoError, DaoResult, finish_txn, start_txn};
use crate::rbac::roles;

/// Invitation token length. 32 characters over nanoid's 64-symbol alphabet
/// is ~190 bits -- guessing is infeasible.
pub const TOKEN_LENGTH: usize = 32;

/// What an unauthenticated holder of a token may learn about it.
#[derive(Debug, Serialize)]
pub struct InvitationPreview {
    pub tenant_name: String,
    pub email: String,
    pub role: String,
    pub status: InvitationStatus,
    pub is_expired: bool,
}

#[derive(Debug, Serialize)]
pub struct AcceptOutcome {
    pub status: InvitationStatus,
    pub already_member: bool,
}

pub struct InvitationDao {
    db: Database,
    pub base: BaseDao<Invitation>,
    pub tenants: BaseDao<Tenant>,
    pub memberships: BaseDao<Membership>,
    pub users: BaseDao<User>,
    ttl_secs: u64,
}

impl InvitationDao {
    pub fn new(db: &Database, settings: &InvitationSettings) -> Self {
        Self {
            db: db.clone(),
            base: BaseDao::new(db, Invitation::COLLECTION),
            tenants: BaseDao::new(db, Tenant::COLLECTION),
            memberships: BaseDao::new(db, Membership::COLLECTION),
            users: BaseDao::new(db, User::COLLECTION),
            ttl_secs: settings.ttl_secs,
        }
    }

    pub async fn create(
        &self,
        tenant_id: ObjectId,
        email: String,
        role: String,
        invited_by: ObjectId,
    ) -> DaoResult<Invitation> {
        if !roles::is_valid(&role) {
            return Err(DaoError::InvalidRole(role));
        }

        // The invitee may already hold an account; if that account is an
        // active member here, there is nothing to invite them to.
        if let Some(user) = self
            .users
            .find_one(doc! { "email": email.as_str(), "deleted_at": null })
            .await?
        {
            let member_count = self
                .memberships
                .count(doc! {
                    "tenant_id": tenant_id,
                    "user_id": user.id.unwrap(),
                    "status": "active",
                })
                .await?;
            if member_count > 0 {
                return Err(DaoError::InviteAlreadyMember);
            }
        }

        if let Some(pending) = self
            .base
            .find_one(doc! { "tenant_id": tenant_id, "email": email.as_str(), "status": "pending" })
            .await?
        {
            let pending = self.apply_lazy_expiry(pending).await;
            if pending.status == InvitationStatus::Pending {
                return Err(DaoError::InviteAlreadyPending);
            }
            // The stored pending row lapsed; it has just been marked expired
            // and no longer blocks a fresh invitation.
        }

        let now = DateTime::now();
        let invitation = Invitation {
            id: None,
            tenant_id,
            email,
            role,
            token: nanoid!(TOKEN_LENGTH),
            status: InvitationStatus::Pending,
            invited_by,
            expires_at: self.expiry_from(now),
            accepted_at: None,
            revoked_at: None,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&invitation).await?;
        debug!(%tenant_id, "Invitation created");
        self.base.find_by_id(id).await
    }

    /// Token lookup with lazy expiry applied. An unknown token is a plain
    /// not-found; nothing about other tenants' invitations leaks through it.
    pub async fn find_by_token(&self, token: &str) -> DaoResult<Invitation> {
        let invitation = self
            .base
            .find_one(doc! { "token": token })
            .await?
            .ok_or(DaoError::InviteInvalidToken)?;
        Ok(self.apply_lazy_expiry(invitation).await)
    }

    /// Public, unauthenticated preview: the minimal fields a link-holder
    /// needs to decide whether to sign in and accept.
    pub async fn preview(&self, token: &str) -> DaoResult<InvitationPreview> {
        let invitation = self.find_by_token(token).await?;
        let tenant = self.tenants.find_by_id(invitation.tenant_id).await?;
        Ok(InvitationPreview {
            tenant_name: tenant.name,
            email: invitation.email,
            role: invitation.role,
            status: invitation.status,
            is_expired: invitation.status == InvitationStatus::Expired,
        })
    }

    /// Accept on behalf of the authenticated user. The invitation flip and
    /// the membership insert commit together; accepting twice, or accepting
    /// while already a member, converges on `accepted` without a second
    /// membership row.
    pub async fn accept(
        &self,
        token: &str,
        user_id: ObjectId,
        user_email: &str,
    ) -> DaoResult<AcceptOutcome> {
        let invitation = self.find_by_token(token).await?;

        // Wrong account is a distinct failure from a bad link.
        if invitation.email != user_email {
            return Err(DaoError::InviteEmailMismatch);
        }
        if invitation.status.is_terminal() {
            return Err(status_error(invitation.status));
        }

        let mut session = start_txn(&self.db).await?;
        let result = self.accept_in_txn(&mut session, &invitation, user_id).await;
        finish_txn(session, result).await
    }

    async fn accept_in_txn(
        &self,
        session: &mut ClientSession,
        invitation: &Invitation,
        user_id: ObjectId,
    ) -> DaoResult<AcceptOutcome> {
        let invitation_id = invitation.id.unwrap();
        let now = DateTime::now();

        // Re-read under the session: a concurrent accept/revoke loses here.
        let current = self
            .base
            .find_one_with(doc! { "_id": invitation_id }, session)
            .await?
            .ok_or(DaoError::InviteInvalidToken)?;
        let effective = current.effective_status(now);
        if effective != InvitationStatus::Pending {
            return Err(status_error(effective));
        }

        let existing = self
            .memberships
            .find_one_with(
                doc! { "tenant_id": current.tenant_id, "user_id": user_id, "status": "active" },
                session,
            )
            .await?;
        let already_member = existing.is_some();

        if !already_member {
            let active_elsewhere = self
                .memberships
                .count_with(doc! { "user_id": user_id, "status": "active" }, session)
                .await?;

            let membership = Membership {
                id: None,
                tenant_id: current.tenant_id,
                user_id,
                role: current.role.clone(),
                is_default: active_elsewhere == 0,
                status: MembershipStatus::Active,
                invited_by: Some(current.invited_by),
                created_at: now,
                updated_at: now,
                removed_at: None,
            };
            self.memberships.insert_one_with(&membership, session).await?;
        }

        self.base
            .update_one_with(
                doc! { "_id": invitation_id, "status": "pending" },
                doc! { "$set": { "status": "accepted", "accepted_at": now } },
                session,
            )
            .await?;

        debug!(tenant_id = %current.tenant_id, %user_id, already_member, "Invitation accepted");
        Ok(AcceptOutcome {
            status: InvitationStatus::Accepted,
            already_member,
        })
    }

    pub async fn decline(&self, token: &str, user_email: &str) -> DaoResult<InvitationStatus> {
        let invitation = self.find_by_token(token).await?;

        if invitation.email != user_email {
            return Err(DaoError::InviteEmailMismatch);
        }
        if invitation.status.is_terminal() {
            return Err(status_error(invitation.status));
        }

        let invitation_id = invitation.id.unwrap();
        let modified = self
            .base
            .update_one(
                doc! { "_id": invitation_id, "status": "pending" },
                doc! { "$set": { "status": "declined" } },
            )
            .await?;

        if !modified {
            // Lost a race against another transition; report where it went.
            let current = self.base.find_by_id(invitation_id).await?;
            return Err(status_error(current.effective_status(DateTime::now())));
        }

        Ok(InvitationStatus::Declined)
    }

    /// Re-arm a pending invitation's expiry clock. The token is unchanged:
    /// the original link keeps working, only for longer.
    pub async fn resend(
        &self,
        tenant_id: ObjectId,
        invitation_id: ObjectId,
    ) -> DaoResult<Invitation> {
        let invitation = self.require_in_tenant(tenant_id, invitation_id).await?;
        if invitation.status.is_terminal() {
            return Err(status_error(invitation.status));
        }

        let modified = self
            .base
            .update_one(
                doc! { "_id": invitation_id, "status": "pending" },
                doc! { "$set": { "expires_at": self.expiry_from(DateTime::now()) } },
            )
            .await?;

        if !modified {
            let current = self.base.find_by_id(invitation_id).await?;
            return Err(status_error(current.effective_status(DateTime::now())));
        }

        self.base.find_by_id(invitation_id).await
    }

    pub async fn revoke(
        &self,
        tenant_id: ObjectId,
        invitation_id: ObjectId,
    ) -> DaoResult<Invitation> {
        let invitation = self.require_in_tenant(tenant_id, invitation_id).await?;
        if invitation.status.is_terminal() {
            return Err(status_error(invitation.status));
        }

        let modified = self
            .base
            .update_one(
                doc! { "_id": invitation_id, "status": "pending" },
                doc! { "$set": { "status": "revoked", "revoked_at": DateTime::now() } },
            )
            .await?;

        if !modified {
            let current = self.base.find_by_id(invitation_id).await?;
            return Err(status_error(current.effective_status(DateTime::now())));
        }

        self.base.find_by_id(invitation_id).await
    }

    /// Management listing. Lapsed pending rows are expired in bulk first so
    /// the listing never shows a stale `pending`.
    pub async fn list_by_tenant(&self, tenant_id: ObjectId) -> DaoResult<Vec<Invitation>> {
        self.base
            .update_many(
                doc! {
                    "tenant_id": tenant_id,
                    "status": "pending",
                    "expires_at": { "$lte": DateTime::now() },
                },
                doc! { "$set": { "status": "expired" } },
            )
            .await?;

        self.base
            .find_many(
                doc! { "tenant_id": tenant_id },
                Some(doc! { "created_at": -1 }),
            )
            .await
    }

    /// Tenant-scoped id lookup: a foreign tenant's invitation id resolves
    /// exactly like a nonexistent one.
    async fn require_in_tenant(
        &self,
        tenant_id: ObjectId,
        invitation_id: ObjectId,
    ) -> DaoResult<Invitation> {
        let invitation = self
            .base
            .find_one(doc! { "_id": invitation_id, "tenant_id": tenant_id })
            .await?
            .ok_or(DaoError::NotFound)?;
        Ok(self.apply_lazy_expiry(invitation).await)
    }

    /// Persist the pending->expired transition observed at read time. The
    /// write-back is a cache fill: callers already hold the effective
    /// status, so a lost race or failed write changes nothing for them.
    async fn apply_lazy_expiry(&self, mut invitation: Invitation) -> Invitation {
        let now = DateTime::now();
        if invitation.status == InvitationStatus::Pending
            && invitation.effective_status(now) == InvitationStatus::Expired
        {
            let write_back = self
                .base
                .update_one(
                    doc! { "_id": invitation.id.unwrap(), "status": "pending" },
                    doc! { "$set": { "status": "expired" } },
                )
                .await;
            if let Err(e) = write_back {
                warn!(error = %e, "Lazy-expiry write-back failed");
            }
            invitation.status = InvitationStatus::Expired;
        }
        invitation
    }

    fn expiry_from(&self, now: DateTime) -> DateTime {
        DateTime::from_millis(now.timestamp_millis() + (self.ttl_secs as i64) * 1000)
    }
}

fn status_error(status: InvitationStatus) -> DaoError {
    match status {
        InvitationStatus::Accepted => DaoError::InviteAlreadyAccepted,
        InvitationStatus::Declined => DaoError::InviteAlreadyDeclined,
        InvitationStatus::Revoked => DaoError::InviteAlreadyRevoked,
        InvitationStatus::Expired => DaoError::InviteExpired,
        InvitationStatus::Pending => {
            DaoError::Validation("invitation is still pending".to_string())
        }
    }
}

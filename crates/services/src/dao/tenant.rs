use bson::{DateTime, doc, oid::ObjectId};
use mongodb::{ClientSession, Database};
use sitedesk_db::models::{Membership, MembershipStatus, Tenant};
use tracing::debug;

use super::base::{BaseDao, DaoError, DaoResult, finish_txn, start_txn};
use crate::rbac::roles;

/// Membership store. Every mutation that can touch the owner-count or
/// default-tenant invariants runs inside a single transaction; the loser of
/// a concurrent race re-reads committed state and fails its precondition
/// instead of corrupting an invariant.
pub struct TenantDao {
    db: Database,
    pub base: BaseDao<Tenant>,
    pub memberships: BaseDao<Membership>,
}

impl TenantDao {
    pub fn new(db: &Database) -> Self {
        Self {
            db: db.clone(),
            base: BaseDao::new(db, Tenant::COLLECTION),
            memberships: BaseDao::new(db, Membership::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        name: String,
        slug: String,
        created_by: ObjectId,
    ) -> DaoResult<Tenant> {
        let now = DateTime::now();
        let tenant = Tenant {
            id: None,
            name,
            slug,
            created_by,
            created_at: now,
            updated_at: now,
        };

        let tenant_id = self.base.insert_one(&tenant).await?;

        // The creator becomes the first owner. Their new membership is the
        // default iff they hold no other active membership.
        let existing = self
            .memberships
            .count(doc! { "user_id": created_by, "status": "active" })
            .await?;

        let membership = Membership {
            id: None,
            tenant_id,
            user_id: created_by,
            role: roles::OWNER.to_string(),
            is_default: existing == 0,
            status: MembershipStatus::Active,
            invited_by: None,
            created_at: now,
            updated_at: now,
            removed_at: None,
        };
        self.memberships.insert_one(&membership).await?;

        self.base.find_by_id(tenant_id).await
    }

    pub async fn find_by_slug(&self, slug: &str) -> DaoResult<Tenant> {
        self.base
            .find_one(doc! { "slug": slug })
            .await?
            .ok_or(DaoError::NotFound)
    }

    /// Tenants the user actively belongs to, for the tenant-switcher listing.
    pub async fn find_user_tenants(&self, user_id: ObjectId) -> DaoResult<Vec<Tenant>> {
        let memberships = self
            .memberships
            .find_many(doc! { "user_id": user_id, "status": "active" }, None)
            .await?;

        let tenant_ids: Vec<ObjectId> = memberships.iter().map(|m| m.tenant_id).collect();

        if tenant_ids.is_empty() {
            return Ok(Vec::new());
        }

        self.base
            .find_many(
                doc! { "_id": { "$in": tenant_ids } },
                Some(doc! { "name": 1 }),
            )
            .await
    }

    pub async fn find_active_membership(
        &self,
        tenant_id: ObjectId,
        user_id: ObjectId,
    ) -> DaoResult<Option<Membership>> {
        self.memberships
            .find_one(doc! {
                "tenant_id": tenant_id,
                "user_id": user_id,
                "status": "active",
            })
            .await
    }

    /// Active members only, in join order. Removed rows are history and
    /// never surface here.
    pub async fn list_active_members(
        &self,
        tenant_id: ObjectId,
    ) -> DaoResult<Vec<Membership>> {
        self.memberships
            .find_many(
                doc! { "tenant_id": tenant_id, "status": "active" },
                Some(doc! { "created_at": 1, "_id": 1 }),
            )
            .await
    }

    /// Change a member's role. Demoting the tenant's sole owner is refused;
    /// the owner-count check and the write commit together.
    pub async fn update_role(
        &self,
        tenant_id: ObjectId,
        target_user_id: ObjectId,
        new_role: &str,
    ) -> DaoResult<Membership> {
        if !roles::is_valid(new_role) {
            return Err(DaoError::InvalidRole(new_role.to_string()));
        }

        let mut session = start_txn(&self.db).await?;
        let result = self
            .update_role_in_txn(&mut session, tenant_id, target_user_id, new_role)
            .await;
        finish_txn(session, result).await
    }

    async fn update_role_in_txn(
        &self,
        session: &mut ClientSession,
        tenant_id: ObjectId,
        target_user_id: ObjectId,
        new_role: &str,
    ) -> DaoResult<Membership> {
        let membership = self
            .require_active_membership(session, tenant_id, target_user_id)
            .await?;
        let membership_id = membership.id.unwrap();

        if membership.role == roles::OWNER && new_role != roles::OWNER {
            self.require_another_owner(session, tenant_id).await?;
        }

        self.memberships
            .update_one_with(
                doc! { "_id": membership_id },
                doc! { "$set": { "role": new_role } },
                session,
            )
            .await?;

        debug!(%tenant_id, user_id = %target_user_id, role = new_role, "Member role updated");

        self.memberships
            .find_one_with(doc! { "_id": membership_id }, session)
            .await?
            .ok_or(DaoError::NotFound)
    }

    /// Soft-remove a member (admin-initiated). The row is retained with
    /// `removed` status; the user's default flag is re-pointed if needed.
    pub async fn remove_member(
        &self,
        tenant_id: ObjectId,
        target_user_id: ObjectId,
    ) -> DaoResult<()> {
        let mut session = start_txn(&self.db).await?;
        let result = self
            .remove_member_in_txn(&mut session, tenant_id, target_user_id)
            .await;
        finish_txn(session, result).await
    }

    async fn remove_member_in_txn(
        &self,
        session: &mut ClientSession,
        tenant_id: ObjectId,
        target_user_id: ObjectId,
    ) -> DaoResult<()> {
        let membership = self
            .require_active_membership(session, tenant_id, target_user_id)
            .await?;

        if membership.role == roles::OWNER {
            self.require_another_owner(session, tenant_id).await?;
        }

        self.soft_remove_in_txn(session, &membership).await
    }

    /// Voluntary exit. Same last-owner protection as removal, but the
    /// missing-membership case is the caller's own, so it reads as a
    /// field-level validation failure rather than a lookup miss.
    pub async fn self_leave(&self, tenant_id: ObjectId, user_id: ObjectId) -> DaoResult<()> {
        let mut session = start_txn(&self.db).await?;
        let result = self.self_leave_in_txn(&mut session, tenant_id, user_id).await;
        finish_txn(session, result).await
    }

    async fn self_leave_in_txn(
        &self,
        session: &mut ClientSession,
        tenant_id: ObjectId,
        user_id: ObjectId,
    ) -> DaoResult<()> {
        let membership = self
            .memberships
            .find_one_with(
                doc! { "tenant_id": tenant_id, "user_id": user_id, "status": "active" },
                session,
            )
            .await?
            .ok_or_else(|| {
                DaoError::Validation("member: no active membership in this tenant".to_string())
            })?;

        if membership.role == roles::OWNER {
            self.require_another_owner(session, tenant_id).await?;
        }

        self.soft_remove_in_txn(session, &membership).await
    }

    /// Promote `target_user_id` to owner; optionally demote the acting
    /// owner to admin in the same transaction. Because promotion lands
    /// before (or with) the demotion, the >=1-owner invariant holds by
    /// construction even when the acting user is the sole owner.
    pub async fn make_owner(
        &self,
        tenant_id: ObjectId,
        target_user_id: ObjectId,
        acting_user_id: ObjectId,
        demote_self: bool,
    ) -> DaoResult<Membership> {
        let mut session = start_txn(&self.db).await?;
        let result = self
            .make_owner_in_txn(&mut session, tenant_id, target_user_id, acting_user_id, demote_self)
            .await;
        finish_txn(session, result).await
    }

    async fn make_owner_in_txn(
        &self,
        session: &mut ClientSession,
        tenant_id: ObjectId,
        target_user_id: ObjectId,
        acting_user_id: ObjectId,
        demote_self: bool,
    ) -> DaoResult<Membership> {
        // Literal-role gate, stricter than the manage_members capability:
        // admins may manage members but never mint owners.
        let acting = self
            .memberships
            .find_one_with(
                doc! { "tenant_id": tenant_id, "user_id": acting_user_id, "status": "active" },
                session,
            )
            .await?;
        let acting = match acting {
            Some(m) if m.role == roles::OWNER => m,
            _ => return Err(DaoError::OwnerOnly),
        };

        let target = self
            .require_active_membership(session, tenant_id, target_user_id)
            .await?;
        if target.role == roles::OWNER {
            return Err(DaoError::AlreadyOwner);
        }
        let target_id = target.id.unwrap();

        self.memberships
            .update_one_with(
                doc! { "_id": target_id },
                doc! { "$set": { "role": roles::OWNER } },
                session,
            )
            .await?;

        if demote_self {
            self.memberships
                .update_one_with(
                    doc! { "_id": acting.id.unwrap() },
                    doc! { "$set": { "role": roles::ADMIN } },
                    session,
                )
                .await?;
        }

        debug!(%tenant_id, target = %target_user_id, demote_self, "Ownership transferred");

        self.memberships
            .find_one_with(doc! { "_id": target_id }, session)
            .await?
            .ok_or(DaoError::NotFound)
    }

    /// Target lookup is tenant-scoped in the query itself: an id that lives
    /// in another tenant is indistinguishable from one that does not exist.
    async fn require_active_membership(
        &self,
        session: &mut ClientSession,
        tenant_id: ObjectId,
        user_id: ObjectId,
    ) -> DaoResult<Membership> {
        self.memberships
            .find_one_with(
                doc! { "tenant_id": tenant_id, "user_id": user_id, "status": "active" },
                session,
            )
            .await?
            .ok_or_else(|| {
                DaoError::Validation("member: not found in this tenant".to_string())
            })
    }

    async fn require_another_owner(
        &self,
        session: &mut ClientSession,
        tenant_id: ObjectId,
    ) -> DaoResult<()> {
        let owners = self
            .memberships
            .count_with(
                doc! { "tenant_id": tenant_id, "role": roles::OWNER, "status": "active" },
                session,
            )
            .await?;
        if owners <= 1 {
            return Err(DaoError::LastOwnerProtected);
        }
        Ok(())
    }

    /// Flip the row to `removed` and re-point the user's default membership
    /// if the removed one held it. Heir selection is deterministic: earliest
    /// `created_at`, then ascending `_id` (insert order).
    async fn soft_remove_in_txn(
        &self,
        session: &mut ClientSession,
        membership: &Membership,
    ) -> DaoResult<()> {
        self.memberships
            .update_one_with(
                doc! { "_id": membership.id.unwrap() },
                doc! { "$set": {
                    "status": "removed",
                    "removed_at": DateTime::now(),
                    "is_default": false,
                } },
                session,
            )
            .await?;

        if membership.is_default {
            let heir = self
                .memberships
                .collection()
                .find_one(doc! { "user_id": membership.user_id, "status": "active" })
                .sort(doc! { "created_at": 1, "_id": 1 })
                .session(&mut *session)
                .await?;

            if let Some(heir) = heir {
                self.memberships
                    .update_one_with(
                        doc! { "_id": heir.id.unwrap() },
                        doc! { "$set": { "is_default": true } },
                        session,
                    )
                    .await?;
            }
        }

        debug!(tenant_id = %membership.tenant_id, user_id = %membership.user_id, "Membership removed");
        Ok(())
    }
}

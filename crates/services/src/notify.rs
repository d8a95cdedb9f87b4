use async_trait::async_trait;
use sitedesk_db::models::{Invitation, Tenant};
use tracing::info;

/// Delivery seam for membership-lifecycle notifications. Actual transport
/// (mail, broadcast) lives outside this workspace; handlers talk to this
/// trait and nothing else.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn invitation_created(&self, tenant: &Tenant, invitation: &Invitation);
    async fn invitation_resent(&self, tenant: &Tenant, invitation: &Invitation);
}

/// Default transport: structured log events only.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn invitation_created(&self, tenant: &Tenant, invitation: &Invitation) {
        info!(
            tenant = %tenant.slug,
            email = %invitation.email,
            role = %invitation.role,
            "Invitation notification dispatched"
        );
    }

    async fn invitation_resent(&self, tenant: &Tenant, invitation: &Invitation) {
        info!(
            tenant = %tenant.slug,
            email = %invitation.email,
            "Invitation re-sent"
        );
    }
}

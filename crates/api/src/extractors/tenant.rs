use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use bson::oid::ObjectId;
use sitedesk_db::models::Membership;
use sitedesk_services::dao::base::DaoError;

use crate::{
    error::ApiError,
    extractors::auth::{AuthUser, FromRef},
    state::AppState,
};

/// Resolved tenant context for a `/tenant/{tenant_id}/...` request: the
/// path tenant plus the caller's active membership within it, if any.
///
/// Context is explicit and per-request -- core operations never consult
/// ambient "current tenant" state, so every cross-tenant check is visible
/// at the call site.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: ObjectId,
    pub user_id: ObjectId,
    pub email: String,
    pub membership: Option<Membership>,
}

impl TenantContext {
    /// Role name fed to the permission guard. A caller with no active
    /// membership presents the empty role, which holds no capabilities --
    /// the deny path needs no special casing.
    pub fn role(&self) -> &str {
        self.membership
            .as_ref()
            .map(|m| m.role.as_str())
            .unwrap_or("")
    }

    pub fn require_membership(&self) -> Result<&Membership, ApiError> {
        self.membership.as_ref().ok_or_else(|| {
            ApiError::from(DaoError::PermissionDenied {
                role: String::new(),
            })
        })
    }
}

impl<S> FromRequestParts<S> for TenantContext
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;

        let Path(params): Path<std::collections::HashMap<String, String>> =
            Path::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::bad_request("Missing path parameters"))?;

        let tid_str = params
            .get("tenant_id")
            .ok_or_else(|| ApiError::bad_request("Missing tenant_id parameter"))?;

        let tenant_id = ObjectId::parse_str(tid_str)
            .map_err(|_| ApiError::bad_request("Invalid tenant_id format"))?;

        let app_state = AppState::from_ref(state);
        let membership = app_state
            .tenants
            .find_active_membership(tenant_id, auth.user_id)
            .await?;

        Ok(TenantContext {
            tenant_id,
            user_id: auth.user_id,
            email: auth.email,
            membership,
        })
    }
}

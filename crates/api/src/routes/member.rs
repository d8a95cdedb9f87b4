use axum::{
    Json,
    extract::{Path, State},
};
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use sitedesk_db::models::Membership;
use sitedesk_services::rbac::{self, capabilities};

use crate::{
    error::ApiError,
    extractors::tenant::TenantContext,
    response::{Envelope, ok},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct MakeOwnerRequest {
    #[serde(default)]
    pub demote_self: bool,
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub id: String,
    pub user_id: String,
    pub role: String,
    pub is_default: bool,
    pub created_at: String,
}

impl From<Membership> for MemberResponse {
    fn from(m: Membership) -> Self {
        Self {
            id: m.id.unwrap().to_hex(),
            user_id: m.user_id.to_hex(),
            role: m.role,
            is_default: m.is_default,
            created_at: m.created_at.try_to_rfc3339_string().unwrap_or_default(),
        }
    }
}

pub async fn list(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> Result<Json<Envelope<Vec<MemberResponse>>>, ApiError> {
    rbac::authorize(ctx.role(), capabilities::VIEW_MEMBERS)?;

    let members = state.tenants.list_active_members(ctx.tenant_id).await?;
    Ok(ok(members.into_iter().map(MemberResponse::from).collect()))
}

pub async fn update_role(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path((_, user_id)): Path<(String, String)>,
    Json(body): Json<UpdateRoleRequest>,
) -> Result<Json<Envelope<MemberResponse>>, ApiError> {
    rbac::authorize(ctx.role(), capabilities::MANAGE_MEMBERS)?;

    let target = parse_user_id(&user_id)?;
    let membership = state
        .tenants
        .update_role(ctx.tenant_id, target, &body.role)
        .await?;

    Ok(ok(MemberResponse::from(membership)))
}

pub async fn remove(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path((_, user_id)): Path<(String, String)>,
) -> Result<Json<Envelope<serde_json::Value>>, ApiError> {
    rbac::authorize(ctx.role(), capabilities::MANAGE_MEMBERS)?;

    let target = parse_user_id(&user_id)?;
    state.tenants.remove_member(ctx.tenant_id, target).await?;

    Ok(ok(serde_json::json!({ "removed": true })))
}

/// No capability pre-check here: the store's owner-literal gate is stricter
/// than `manage_members` and must be the check that answers, so admins get
/// FORBIDDEN rather than a generic permission denial.
pub async fn make_owner(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path((_, user_id)): Path<(String, String)>,
    Json(body): Json<MakeOwnerRequest>,
) -> Result<Json<Envelope<MemberResponse>>, ApiError> {
    let target = parse_user_id(&user_id)?;
    let membership = state
        .tenants
        .make_owner(ctx.tenant_id, target, ctx.user_id, body.demote_self)
        .await?;

    Ok(ok(MemberResponse::from(membership)))
}

pub async fn leave(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> Result<Json<Envelope<serde_json::Value>>, ApiError> {
    state.tenants.self_leave(ctx.tenant_id, ctx.user_id).await?;
    Ok(ok(serde_json::json!({ "left": true })))
}

fn parse_user_id(raw: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::validation("member: invalid user id"))
}

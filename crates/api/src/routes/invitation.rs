use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use sitedesk_db::models::Invitation;
use sitedesk_services::dao::invitation::InvitationPreview;
use sitedesk_services::rbac::{self, capabilities};
use validator::Validate;

use crate::{
    error::ApiError,
    extractors::{auth::AuthUser, tenant::TenantContext},
    response::{Envelope, ok},
    state::AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvitationRequest {
    #[validate(email)]
    pub email: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct InvitationResponse {
    pub id: String,
    pub email: String,
    pub role: String,
    pub status: String,
    pub expires_at: String,
    pub created_at: String,
}

impl From<Invitation> for InvitationResponse {
    fn from(i: Invitation) -> Self {
        Self {
            id: i.id.unwrap().to_hex(),
            email: i.email,
            role: i.role,
            status: i.status.as_str().to_string(),
            expires_at: i.expires_at.try_to_rfc3339_string().unwrap_or_default(),
            created_at: i.created_at.try_to_rfc3339_string().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AcceptResponse {
    pub invitation_status: String,
    pub already_member: bool,
}

#[derive(Debug, Serialize)]
pub struct DeclineResponse {
    pub invitation_status: String,
}

// --- Public, token-addressed surface ---

pub async fn preview(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Envelope<InvitationPreview>>, ApiError> {
    let preview = state.invitations.preview(&token).await?;
    Ok(ok(preview))
}

pub async fn accept(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(token): Path<String>,
) -> Result<Json<Envelope<AcceptResponse>>, ApiError> {
    let outcome = state
        .invitations
        .accept(&token, auth.user_id, &auth.email)
        .await?;

    Ok(ok(AcceptResponse {
        invitation_status: outcome.status.as_str().to_string(),
        already_member: outcome.already_member,
    }))
}

pub async fn decline(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(token): Path<String>,
) -> Result<Json<Envelope<DeclineResponse>>, ApiError> {
    let status = state.invitations.decline(&token, &auth.email).await?;

    Ok(ok(DeclineResponse {
        invitation_status: status.as_str().to_string(),
    }))
}

// --- Tenant-scoped management surface ---

pub async fn list(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> Result<Json<Envelope<Vec<InvitationResponse>>>, ApiError> {
    rbac::authorize(ctx.role(), capabilities::VIEW_MEMBERS)?;

    let invitations = state.invitations.list_by_tenant(ctx.tenant_id).await?;
    Ok(ok(invitations
        .into_iter()
        .map(InvitationResponse::from)
        .collect()))
}

pub async fn create(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(body): Json<CreateInvitationRequest>,
) -> Result<(StatusCode, Json<Envelope<InvitationResponse>>), ApiError> {
    rbac::authorize(ctx.role(), capabilities::MANAGE_MEMBERS)?;
    body.validate()
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let invitation = state
        .invitations
        .create(ctx.tenant_id, body.email, body.role, ctx.user_id)
        .await?;

    let tenant = state.tenants.base.find_by_id(ctx.tenant_id).await?;
    state
        .notifier
        .invitation_created(&tenant, &invitation)
        .await;

    Ok((StatusCode::CREATED, ok(InvitationResponse::from(invitation))))
}

pub async fn revoke(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path((_, invitation_id)): Path<(String, String)>,
) -> Result<Json<Envelope<InvitationResponse>>, ApiError> {
    rbac::authorize(ctx.role(), capabilities::MANAGE_MEMBERS)?;

    let id = parse_invitation_id(&invitation_id)?;
    let invitation = state.invitations.revoke(ctx.tenant_id, id).await?;

    Ok(ok(InvitationResponse::from(invitation)))
}

pub async fn resend(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path((_, invitation_id)): Path<(String, String)>,
) -> Result<Json<Envelope<InvitationResponse>>, ApiError> {
    rbac::authorize(ctx.role(), capabilities::MANAGE_MEMBERS)?;

    let id = parse_invitation_id(&invitation_id)?;
    let invitation = state.invitations.resend(ctx.tenant_id, id).await?;

    let tenant = state.tenants.base.find_by_id(ctx.tenant_id).await?;
    state
        .notifier
        .invitation_resent(&tenant, &invitation)
        .await;

    Ok(ok(InvitationResponse::from(invitation)))
}

fn parse_invitation_id(raw: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::validation("invitation: invalid id"))
}

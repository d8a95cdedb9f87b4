use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use sitedesk_db::models::Tenant;
use validator::Validate;

use crate::{
    error::ApiError,
    extractors::{auth::AuthUser, tenant::TenantContext},
    response::{Envelope, ok},
    state::AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTenantRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 2, max = 50))]
    pub slug: String,
}

#[derive(Debug, Serialize)]
pub struct TenantResponse {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub created_at: String,
}

impl From<Tenant> for TenantResponse {
    fn from(t: Tenant) -> Self {
        Self {
            id: t.id.unwrap().to_hex(),
            name: t.name,
            slug: t.slug,
            created_at: t.created_at.try_to_rfc3339_string().unwrap_or_default(),
        }
    }
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Envelope<Vec<TenantResponse>>>, ApiError> {
    let tenants = state.tenants.find_user_tenants(auth.user_id).await?;
    Ok(ok(tenants.into_iter().map(TenantResponse::from).collect()))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateTenantRequest>,
) -> Result<(StatusCode, Json<Envelope<TenantResponse>>), ApiError> {
    body.validate()
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let tenant = state
        .tenants
        .create(body.name, body.slug, auth.user_id)
        .await?;

    Ok((StatusCode::CREATED, ok(TenantResponse::from(tenant))))
}

pub async fn get(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> Result<Json<Envelope<TenantResponse>>, ApiError> {
    ctx.require_membership()?;

    let tenant = state.tenants.base.find_by_id(ctx.tenant_id).await?;
    Ok(ok(TenantResponse::from(tenant)))
}

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};
use sitedesk_db::models::{Project, ProjectStatus};
use sitedesk_services::rbac::{self, capabilities};
use validator::Validate;

use crate::{
    error::ApiError,
    extractors::tenant::TenantContext,
    response::{Envelope, ok},
    state::AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 20))]
    pub code: String,
    pub client_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub status: Option<ProjectStatus>,
    pub client_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub id: String,
    pub name: String,
    pub code: String,
    pub status: ProjectStatus,
    pub client_name: Option<String>,
    pub created_at: String,
}

impl From<Project> for ProjectResponse {
    fn from(p: Project) -> Self {
        Self {
            id: p.id.unwrap().to_hex(),
            name: p.name,
            code: p.code,
            status: p.status,
            client_name: p.client_name,
            created_at: p.created_at.try_to_rfc3339_string().unwrap_or_default(),
        }
    }
}

pub async fn list(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> Result<Json<Envelope<Vec<ProjectResponse>>>, ApiError> {
    rbac::authorize(ctx.role(), capabilities::VIEW_PROJECTS)?;

    let projects = state.projects.find_by_tenant(ctx.tenant_id).await?;
    Ok(ok(projects.into_iter().map(ProjectResponse::from).collect()))
}

pub async fn create(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(body): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Envelope<ProjectResponse>>), ApiError> {
    rbac::authorize(ctx.role(), capabilities::MANAGE_PROJECTS)?;
    body.validate()
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let project = state
        .projects
        .create(
            ctx.tenant_id,
            body.name,
            body.code,
            body.client_name,
            ctx.user_id,
        )
        .await?;

    Ok((StatusCode::CREATED, ok(ProjectResponse::from(project))))
}

pub async fn get(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path((_, project_id)): Path<(String, String)>,
) -> Result<Json<Envelope<ProjectResponse>>, ApiError> {
    rbac::authorize(ctx.role(), capabilities::VIEW_PROJECTS)?;

    let project = find_in_tenant(&state, ctx.tenant_id, &project_id).await?;
    Ok(ok(ProjectResponse::from(project)))
}

pub async fn update(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path((_, project_id)): Path<(String, String)>,
    Json(body): Json<UpdateProjectRequest>,
) -> Result<Json<Envelope<ProjectResponse>>, ApiError> {
    rbac::authorize(ctx.role(), capabilities::MANAGE_PROJECTS)?;

    let project = find_in_tenant(&state, ctx.tenant_id, &project_id).await?;
    let project_id = project.id.unwrap();

    state
        .projects
        .update(
            ctx.tenant_id,
            project_id,
            body.name,
            body.status,
            body.client_name,
        )
        .await?;

    let updated = state.projects.base.find_by_id(project_id).await?;
    Ok(ok(ProjectResponse::from(updated)))
}

pub async fn delete(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path((_, project_id)): Path<(String, String)>,
) -> Result<Json<Envelope<serde_json::Value>>, ApiError> {
    rbac::authorize(ctx.role(), capabilities::MANAGE_PROJECTS)?;

    let project = find_in_tenant(&state, ctx.tenant_id, &project_id).await?;
    state
        .projects
        .soft_delete(ctx.tenant_id, project.id.unwrap())
        .await?;

    Ok(ok(serde_json::json!({ "deleted": true })))
}

/// Tenant-scoped lookup: a project id belonging to another tenant resolves
/// to the same NOT_FOUND as a nonexistent one.
async fn find_in_tenant(
    state: &AppState,
    tenant_id: ObjectId,
    raw_id: &str,
) -> Result<Project, ApiError> {
    let id = ObjectId::parse_str(raw_id)
        .map_err(|_| ApiError::validation("project: invalid id"))?;

    state
        .projects
        .base
        .find_one(doc! { "_id": id, "tenant_id": tenant_id, "deleted_at": null })
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))
}

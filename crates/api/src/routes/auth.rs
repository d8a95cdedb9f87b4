use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    error::ApiError,
    extractors::auth::AuthUser,
    response::{Envelope, ok},
    state::AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub display_name: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub tenant_name: Option<String>,
    pub tenant_slug: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub display_name: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Envelope<AuthResponse>>), ApiError> {
    body.validate()
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let password_hash = state.auth.hash_password(&body.password)?;

    let user = state
        .users
        .create(body.email.clone(), body.display_name.clone(), password_hash)
        .await?;

    let user_id = user.id.unwrap();

    // Optionally bootstrap a tenant with the new user as its first owner.
    if let (Some(tenant_name), Some(tenant_slug)) = (body.tenant_name, body.tenant_slug) {
        state
            .tenants
            .create(tenant_name, tenant_slug, user_id)
            .await?;
    }

    let tokens = state.auth.generate_tokens(user_id, &user.email)?;

    let response = AuthResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
        user: UserResponse {
            id: user_id.to_hex(),
            email: user.email,
            display_name: user.display_name,
        },
    };

    Ok((StatusCode::CREATED, ok(response)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Envelope<AuthResponse>>, ApiError> {
    let user = state
        .users
        .find_by_email(&body.email)
        .await
        .map_err(|_| ApiError::unauthorized("Invalid credentials"))?;

    let password_hash = user
        .password_hash
        .as_ref()
        .ok_or_else(|| ApiError::unauthorized("No password set"))?;

    let valid = state.auth.verify_password(&body.password, password_hash)?;
    if !valid {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let user_id = user.id.unwrap();
    let tokens = state.auth.generate_tokens(user_id, &user.email)?;

    Ok(ok(AuthResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
        user: UserResponse {
            id: user_id.to_hex(),
            email: user.email,
            display_name: user.display_name,
        },
    }))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<Envelope<AuthResponse>>, ApiError> {
    let claims = state.auth.verify_refresh_token(&body.refresh_token)?;

    let user_id = bson::oid::ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::unauthorized("Invalid user ID"))?;

    let user = state.users.base.find_by_id(user_id).await?;
    let tokens = state.auth.generate_tokens(user_id, &user.email)?;

    Ok(ok(AuthResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
        user: UserResponse {
            id: user_id.to_hex(),
            email: user.email,
            display_name: user.display_name,
        },
    }))
}

pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Envelope<UserResponse>>, ApiError> {
    let user = state.users.base.find_by_id(auth.user_id).await?;

    Ok(ok(UserResponse {
        id: user.id.unwrap().to_hex(),
        email: user.email,
        display_name: user.display_name,
    }))
}

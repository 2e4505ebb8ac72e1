use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::{RequireAdmin, generate_token, hash_token};
use crate::server::AppState;
use crate::server::dto::{CreateUserRequest, CreateUserResponse, UpdateUserRequest};
use crate::server::response::{ApiError, ApiResponse};
use crate::types::{Role, UserProfile};

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user))
        .route("/users/{id}", patch(update_user))
        .route("/users/{id}/token", post(rotate_token))
}

pub async fn create_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::bad_request("a valid email is required"));
    }

    if state.store.get_profile_by_email(&email)?.is_some() {
        return Err(ApiError::conflict("a user with this email already exists"));
    }

    let token = generate_token();
    let now = Utc::now();
    let profile = UserProfile {
        user_id: Uuid::new_v4().to_string(),
        email,
        full_name: normalize_name(req.full_name),
        role: req.role,
        is_active: true,
        token_hash: hash_token(&token),
        created_at: now,
        updated_at: now,
    };

    state.store.create_profile(&profile)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreateUserResponse { token, profile })),
    ))
}

pub async fn list_users(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let profiles = state.store.list_profiles()?;

    Ok(Json(ApiResponse::success(profiles)))
}

pub async fn get_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .store
        .get_profile(&id)?
        .ok_or_else(|| ApiError::not_found("profile not found"))?;

    Ok(Json(ApiResponse::success(profile)))
}

pub async fn update_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut profile = state
        .store
        .get_profile(&id)?
        .ok_or_else(|| ApiError::not_found("profile not found"))?;

    // admins cannot lock themselves out through this endpoint
    if profile.user_id == admin.user_id {
        let demotes = req.role.is_some_and(|r| r != Role::Admin);
        let deactivates = req.is_active == Some(false);
        if demotes || deactivates {
            return Err(ApiError::bad_request(
                "cannot demote or deactivate your own account",
            ));
        }
    }

    if let Some(role) = req.role {
        profile.role = role;
    }
    if let Some(is_active) = req.is_active {
        profile.is_active = is_active;
    }
    if let Some(full_name) = req.full_name {
        profile.full_name = normalize_name(full_name);
    }
    profile.updated_at = Utc::now();

    state.store.update_profile(&profile)?;

    Ok(Json(ApiResponse::success(profile)))
}

/// Replaces the user's token. The previous token stops working immediately.
pub async fn rotate_token(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let mut profile = state
        .store
        .get_profile(&id)?
        .ok_or_else(|| ApiError::not_found("profile not found"))?;

    let token = generate_token();
    profile.token_hash = hash_token(&token);
    profile.updated_at = Utc::now();

    state.store.update_profile(&profile)?;

    Ok(Json(ApiResponse::success(CreateUserResponse {
        token,
        profile,
    })))
}

fn normalize_name(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

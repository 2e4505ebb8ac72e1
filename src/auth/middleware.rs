use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::token::hash_token;
use crate::server::AppState;
use crate::types::{Role, UserProfile};

/// Extractor that requires a valid token belonging to an active user.
pub struct RequireUser(pub UserProfile);

/// Extractor that additionally requires the admin role.
pub struct RequireAdmin(pub UserProfile);

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidToken,
    Inactive,
    NotAdmin,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthError::Inactive => (StatusCode::FORBIDDEN, "Account is deactivated"),
            AuthError::NotAdmin => (StatusCode::FORBIDDEN, "Admin access required"),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "data": null, "error": message });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                "WWW-Authenticate",
                "Bearer realm=\"casefile\"".parse().unwrap(),
            );
        }

        response
    }
}

impl FromRequestParts<Arc<AppState>> for RequireUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let profile = authenticate(parts, state)?;
        Ok(RequireUser(profile))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let profile = authenticate(parts, state)?;

        if profile.role != Role::Admin {
            return Err(AuthError::NotAdmin);
        }

        Ok(RequireAdmin(profile))
    }
}

fn authenticate(parts: &Parts, state: &Arc<AppState>) -> Result<UserProfile, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let raw_token = match header {
        None => return Err(AuthError::MissingAuth),
        Some(header) => match header.strip_prefix("Bearer ") {
            Some(token) => token.trim(),
            None => return Err(AuthError::InvalidScheme),
        },
    };

    let profile = state
        .store
        .get_profile_by_token_hash(&hash_token(raw_token))
        .map_err(|_| AuthError::InternalError)?
        .ok_or(AuthError::InvalidToken)?;

    if !profile.is_active {
        return Err(AuthError::Inactive);
    }

    Ok(profile)
}

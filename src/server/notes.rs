use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::CreateNoteRequest;
use crate::server::response::{ApiError, ApiResponse};

pub fn notes_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cases/{id}/notes", post(create_note))
        .route("/cases/{id}/notes", get(list_notes))
}

pub async fn create_note(
    RequireUser(profile): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CreateNoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let note = state.cases.add_note(&id, &req.note, req.is_private, &profile)?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(note))))
}

pub async fn list_notes(
    RequireUser(profile): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let notes = state.cases.list_notes(&id, &profile)?;

    Ok(Json(ApiResponse::success(notes)))
}

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use chrono::Utc;

use crate::analytics::CaseFilter;
use crate::auth::RequireUser;
use crate::report::{self, Dossier};
use crate::server::AppState;
use crate::server::dto::{CreateCaseRequest, UpdateCaseRequest};
use crate::server::response::{ApiError, ApiResponse};

pub fn cases_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cases", post(create_case))
        .route("/cases", get(list_cases))
        .route("/cases/export.csv", get(export_cases_csv))
        .route("/cases/{id}", get(get_case))
        .route("/cases/{id}", patch(update_case))
        .route("/cases/{id}", delete(delete_case))
        .route("/cases/{id}/activity", get(list_activity))
        .route("/cases/{id}/export", get(export_case))
}

pub async fn create_case(
    RequireUser(profile): RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCaseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (case, events) = state.cases.create(req.into(), &profile)?;
    state.dispatcher.spawn(events);

    Ok((StatusCode::CREATED, Json(ApiResponse::success(case))))
}

pub async fn list_cases(
    RequireUser(profile): RequireUser,
    State(state): State<Arc<AppState>>,
    Query(filter): Query<CaseFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let cases = state.cases.list(&profile)?;
    let cases = filter.apply(cases, &profile.user_id);

    Ok(Json(ApiResponse::success(cases)))
}

pub async fn get_case(
    RequireUser(profile): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let case = state.cases.get(&id, &profile)?;

    Ok(Json(ApiResponse::success(case)))
}

pub async fn update_case(
    RequireUser(profile): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCaseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (case, events) = state.cases.update(&id, req.into(), &profile)?;
    state.dispatcher.spawn(events);

    Ok(Json(ApiResponse::success(case)))
}

pub async fn delete_case(
    RequireUser(profile): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    // the metadata rows cascade with the case; blobs are cleaned up after
    let documents = state.cases.delete(&id, &profile)?;
    state.documents.purge_blobs(&documents).await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_activity(
    RequireUser(profile): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state.cases.list_activity(&id, &profile)?;

    Ok(Json(ApiResponse::success(entries)))
}

pub async fn export_case(
    RequireUser(profile): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let dossier = Dossier::assemble(state.store.as_ref(), &id, &profile)?;

    let headers = [
        (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", dossier.file_name()),
        ),
    ];

    Ok((headers, dossier.to_string()))
}

pub async fn export_cases_csv(
    RequireUser(profile): RequireUser,
    State(state): State<Arc<AppState>>,
    Query(filter): Query<CaseFilter>,
) -> Result<impl IntoResponse, ApiError> {
    if !profile.role.can_export_cases() {
        return Err(ApiError::forbidden("this role cannot export cases"));
    }

    let cases = state.cases.list(&profile)?;
    let cases = filter.apply(cases, &profile.user_id);
    let csv = report::cases_csv(&cases);

    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{}\"",
                report::csv_file_name(&Utc::now())
            ),
        ),
    ];

    Ok((headers, csv))
}

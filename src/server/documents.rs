use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::IntoResponse,
    routing::{delete, get, post},
};
use bytes::Bytes;

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse};

const MAX_UPLOAD_SIZE: usize = 25 * 1024 * 1024;

pub fn documents_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cases/{id}/documents", post(upload_document))
        .route("/cases/{id}/documents", get(list_documents))
        .route("/documents/{id}", get(download_document))
        .route("/documents/{id}", delete(delete_document))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE + 1024))
}

struct Upload {
    file_name: String,
    mime_type: String,
    data: Bytes,
}

async fn parse_multipart_upload(multipart: &mut Multipart) -> Result<Upload, ApiError> {
    let mut upload: Option<Upload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read multipart: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;

        if data.len() > MAX_UPLOAD_SIZE {
            return Err(ApiError::payload_too_large(format!(
                "File size ({} bytes) exceeds maximum allowed size ({MAX_UPLOAD_SIZE} bytes)",
                data.len()
            )));
        }

        upload = Some(Upload {
            file_name,
            mime_type,
            data,
        });
    }

    upload.ok_or_else(|| ApiError::bad_request("File field is required"))
}

pub async fn upload_document(
    RequireUser(profile): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let upload = parse_multipart_upload(&mut multipart).await?;

    let doc = state
        .documents
        .upload(&id, &upload.file_name, &upload.mime_type, upload.data, &profile)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(doc))))
}

pub async fn list_documents(
    RequireUser(profile): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let documents = state.documents.list(&id, &profile)?;

    Ok(Json(ApiResponse::success(documents)))
}

pub async fn download_document(
    RequireUser(profile): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (doc, data) = state.documents.download(&id, &profile).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&doc.mime_type)
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );

    let safe_filename: String = doc
        .file_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_' || *c == '.')
        .collect();
    let safe_filename = if safe_filename.is_empty() {
        "document".to_string()
    } else {
        safe_filename
    };

    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{safe_filename}\"")) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    } else {
        headers.insert(
            header::CONTENT_DISPOSITION,
            HeaderValue::from_static("attachment; filename=\"document\""),
        );
    }

    Ok((StatusCode::OK, headers, data))
}

pub async fn delete_document(
    RequireUser(profile): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.documents.delete(&id, &profile).await?;

    Ok(StatusCode::NO_CONTENT)
}

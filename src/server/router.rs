use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Json, Router, routing::get};

use super::admin::admin_router;
use super::cases::cases_router;
use super::documents::documents_router;
use super::notes::notes_router;
use super::response::ApiResponse;
use super::stats::stats_router;
use crate::auth::RequireUser;
use crate::cases::CaseService;
use crate::documents::DocumentIndex;
use crate::notify::Dispatcher;
use crate::store::Store;
use crate::types::UserProfile;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub cases: CaseService,
    pub documents: DocumentIndex,
    pub dispatcher: Arc<Dispatcher>,
}

async fn health() -> &'static str {
    "OK"
}

async fn me(RequireUser(profile): RequireUser) -> Json<ApiResponse<UserProfile>> {
    Json(ApiResponse::success(profile))
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/me", get(me))
        .nest("/api/v1/admin", admin_router())
        .nest("/api/v1", cases_router())
        .nest("/api/v1", notes_router())
        .nest("/api/v1", documents_router())
        .nest("/api/v1", stats_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

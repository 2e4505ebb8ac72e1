use std::sync::Arc;

use axum::{
    Json, Router, extract::State, response::IntoResponse, routing::get,
};
use chrono::Utc;

use crate::analytics::{CaseAnalytics, DashboardStats};
use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse};

pub fn stats_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(dashboard_stats))
        .route("/analytics", get(case_analytics))
}

pub async fn dashboard_stats(
    RequireUser(profile): RequireUser,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let cases = state.cases.list(&profile)?;
    let stats = DashboardStats::compute(&cases, &profile.user_id, Utc::now());

    Ok(Json(ApiResponse::success(stats)))
}

pub async fn case_analytics(
    RequireUser(profile): RequireUser,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let cases = state.cases.list(&profile)?;
    let analytics = CaseAnalytics::compute(&cases);

    Ok(Json(ApiResponse::success(analytics)))
}

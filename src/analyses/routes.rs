// src/analyses/routes.rs

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Admin-only CV analysis endpoints
pub fn analyses_routes() -> Router {
    Router::new()
        // NOTE: Specific routes must come BEFORE parameterized routes (:id)
        .route(
            "/api/cv-analysis",
            get(handlers::list_analyses).post(handlers::create_analysis),
        )
        .route("/api/cv-analysis/statistics", get(handlers::analysis_statistics))
        .route("/api/cv-analysis/provider-status", get(handlers::provider_status))
        .route("/api/cv-analysis/batch", post(handlers::batch_analyze))
        .route("/api/cv-analysis/analyze-text", post(handlers::analyze_text))
        .route(
            "/api/cv-analysis/:id",
            get(handlers::get_analysis).delete(handlers::delete_analysis),
        )
        .route("/api/cv-analysis/:id/analyze", post(handlers::trigger_analysis))
}

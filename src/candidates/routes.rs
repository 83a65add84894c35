// src/candidates/routes.rs

use crate::candidates::handlers;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
    Router,
};

/// Multipart overhead allowed on top of the two documents.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Public intake plus admin application management. `max_upload_bytes` is the
/// per-document limit; the request body may carry a CV and a cover letter.
pub fn candidates_routes(max_upload_bytes: usize) -> Router {
    Router::new()
        // File serving routes
        .route("/storage/*path", get(handlers::serve_stored_file))
        // Public application intake
        .route(
            "/api/candidates",
            post(handlers::submit_application)
                .layer(DefaultBodyLimit::max(max_upload_bytes * 2 + FORM_OVERHEAD_BYTES)),
        )
        // Admin application routes
        // NOTE: Specific routes must come BEFORE parameterized routes (:id)
        .route("/api/admin/applications", get(handlers::list_applications))
        .route(
            "/api/admin/applications/statistics",
            get(handlers::application_statistics),
        )
        .route(
            "/api/admin/applications/:id",
            get(handlers::get_application).delete(handlers::delete_application),
        )
        .route(
            "/api/admin/applications/:id/status",
            patch(handlers::update_application_status),
        )
        .route(
            "/api/admin/applications/:id/purge",
            delete(handlers::purge_application),
        )
        .route(
            "/api/admin/applications/:id/files/:kind",
            get(handlers::get_application_file),
        )
}

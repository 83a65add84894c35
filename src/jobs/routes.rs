// src/jobs/routes.rs

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Public job-offer browsing plus admin CRUD
pub fn jobs_routes() -> Router {
    Router::new()
        // Public routes
        .route("/api/job-offers", get(handlers::list_public_job_offers))
        .route("/api/job-offers/:id", get(handlers::get_public_job_offer))
        // Admin job offer management routes
        // NOTE: Specific routes must come BEFORE parameterized routes (:id)
        .route(
            "/api/admin/job-offers",
            get(handlers::admin_list_job_offers).post(handlers::admin_create_job_offer),
        )
        .route(
            "/api/admin/job-offers/cache/clear",
            post(handlers::admin_clear_job_offer_cache),
        )
        .route(
            "/api/admin/job-offers/:id",
            get(handlers::admin_get_job_offer)
                .put(handlers::admin_update_job_offer)
                .delete(handlers::admin_delete_job_offer),
        )
}

// src/jobs/handlers/public.rs

use axum::extract::{Extension, Path};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;

use crate::common::{ApiError, ApiResponse, AppState};
use crate::jobs::models::*;

const PUBLIC_LISTING_LIMIT: i64 = 20;

async fn load_active_offers(db: &SqlitePool) -> Result<Vec<JobOffer>, ApiError> {
    let offers = sqlx::query_as::<_, JobOffer>(&format!(
        "SELECT {} FROM job_offers WHERE status = 'active' ORDER BY created_at DESC LIMIT ?",
        JOB_OFFER_COLUMNS
    ))
    .bind(PUBLIC_LISTING_LIMIT)
    .fetch_all(db)
    .await?;

    Ok(offers)
}

/// GET /api/job-offers - Latest active offers, served from the TTL cache
pub async fn list_public_job_offers(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<ApiResponse<PublicJobOffers>, ApiError> {
    let db = state.db.clone();
    let lookup = state
        .job_offer_cache
        .get_or_load(|| async move { load_active_offers(&db).await })
        .await?;

    debug!(
        count = lookup.offers.len(),
        cache_hit = lookup.hit,
        "Loaded public job offers"
    );

    Ok(ApiResponse::ok(
        "Offres d'emploi récupérées",
        PublicJobOffers {
            job_offers: lookup.offers.as_ref().clone(),
            cached: lookup.hit,
            cached_at: lookup.cached_at,
        },
    ))
}

/// GET /api/job-offers/:id - A single active offer
pub async fn get_public_job_offer(
    Extension(state): Extension<Arc<AppState>>,
    Path(offer_id): Path<String>,
) -> Result<ApiResponse<JobOffer>, ApiError> {
    let offer = sqlx::query_as::<_, JobOffer>(&format!(
        "SELECT {} FROM job_offers WHERE id = ? AND status = 'active'",
        JOB_OFFER_COLUMNS
    ))
    .bind(&offer_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Job offer not found: {}", offer_id)))?;

    Ok(ApiResponse::ok("Offre d'emploi récupérée", offer))
}

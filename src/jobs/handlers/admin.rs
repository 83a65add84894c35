// src/jobs/handlers/admin.rs

use axum::extract::{Extension, Path, Query};
use axum::Json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::AdminUser;
use crate::common::{
    generate_job_offer_id, now_rfc3339, ApiError, ApiResponse, AppState, Validator,
};
use crate::jobs::models::*;
use crate::jobs::validators::JobOfferValidator;

async fn fetch_offer(state: &AppState, offer_id: &str) -> Result<JobOffer, ApiError> {
    sqlx::query_as::<_, JobOffer>(&format!(
        "SELECT {} FROM job_offers WHERE id = ?",
        JOB_OFFER_COLUMNS
    ))
    .bind(offer_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Job offer not found: {}", offer_id)))
}

fn skills_json(skills: Option<&Vec<String>>) -> Option<String> {
    skills.map(|s| serde_json::to_string(s).unwrap_or_else(|_| "[]".to_string()))
}

/// GET /api/admin/job-offers - Filtered, paginated listing with application counts
pub async fn admin_list_job_offers(
    Extension(state): Extension<Arc<AppState>>,
    _admin: AdminUser,
    Query(params): Query<JobOfferQuery>,
) -> Result<ApiResponse<JobOfferPage>, ApiError> {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(15).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let offer_type = params
        .offer_type
        .as_deref()
        .and_then(normalize_offer_type);
    let location = params
        .location
        .as_deref()
        .map(|l| format!("%{}%", l.trim()));

    let filter = r#"
        (? IS NULL OR jo.offer_type = ?)
        AND (? IS NULL OR jo.location LIKE ?)
        AND (? IS NULL OR jo.experience_level = ?)
        AND (? IS NULL OR jo.status = ?)
    "#;

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM job_offers jo WHERE {}",
        filter
    ))
    .bind(offer_type)
    .bind(offer_type)
    .bind(location.as_deref())
    .bind(location.as_deref())
    .bind(params.experience_level.as_deref())
    .bind(params.experience_level.as_deref())
    .bind(params.status.as_deref())
    .bind(params.status.as_deref())
    .fetch_one(&state.db)
    .await?;

    let columns = JOB_OFFER_COLUMNS
        .split(',')
        .map(|c| format!("jo.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ");

    let job_offers = sqlx::query_as::<_, JobOfferWithCount>(&format!(
        r#"SELECT {},
            (SELECT COUNT(*) FROM applications a
             WHERE a.job_offer_id = jo.id AND a.deleted_at IS NULL) AS applications_count
        FROM job_offers jo
        WHERE {}
        ORDER BY jo.created_at DESC
        LIMIT ? OFFSET ?"#,
        columns, filter
    ))
    .bind(offer_type)
    .bind(offer_type)
    .bind(location.as_deref())
    .bind(location.as_deref())
    .bind(params.experience_level.as_deref())
    .bind(params.experience_level.as_deref())
    .bind(params.status.as_deref())
    .bind(params.status.as_deref())
    .bind(per_page)
    .bind(offset)
    .fetch_all(&state.db)
    .await?;

    Ok(ApiResponse::ok(
        "Offres d'emploi récupérées",
        JobOfferPage {
            job_offers,
            total,
            page,
            per_page,
        },
    ))
}

/// GET /api/admin/job-offers/:id - Any offer regardless of status
pub async fn admin_get_job_offer(
    Extension(state): Extension<Arc<AppState>>,
    _admin: AdminUser,
    Path(offer_id): Path<String>,
) -> Result<ApiResponse<JobOffer>, ApiError> {
    let offer = fetch_offer(&state, &offer_id).await?;
    Ok(ApiResponse::ok("Offre d'emploi récupérée", offer))
}

/// POST /api/admin/job-offers - Create a new job offer
pub async fn admin_create_job_offer(
    Extension(state): Extension<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<CreateJobOffer>,
) -> Result<ApiResponse<JobOffer>, ApiError> {
    JobOfferValidator::new().validate(&body).into_result()?;

    let id = generate_job_offer_id();
    let now = now_rfc3339();
    let offer_type = normalize_offer_type(&body.offer_type).unwrap_or("job");

    sqlx::query(
        r#"INSERT INTO job_offers (
            id, title, offer_type, description, requirements, location, contract_type,
            salary_range, company_name, company_description, experience_level, skills_required,
            application_deadline, status, positions_available, contact_email, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(body.title.trim())
    .bind(offer_type)
    .bind(&body.description)
    .bind(&body.requirements)
    .bind(body.location.trim())
    .bind(&body.contract_type)
    .bind(body.salary_range.as_deref())
    .bind(body.company_name.trim())
    .bind(body.company_description.as_deref())
    .bind(&body.experience_level)
    .bind(skills_json(body.skills_required.as_ref()))
    .bind(body.application_deadline.as_deref())
    .bind(body.status.as_deref().unwrap_or("active"))
    .bind(body.positions_available.unwrap_or(1))
    .bind(body.contact_email.as_deref())
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    state.job_offer_cache.invalidate().await;

    info!(job_offer_id = %id, admin = %admin.0.id, "Job offer created");

    let offer = fetch_offer(&state, &id).await?;
    Ok(ApiResponse::created("Offre d'emploi créée avec succès", offer))
}

/// PUT /api/admin/job-offers/:id - Partial update
pub async fn admin_update_job_offer(
    Extension(state): Extension<Arc<AppState>>,
    admin: AdminUser,
    Path(offer_id): Path<String>,
    Json(body): Json<UpdateJobOffer>,
) -> Result<ApiResponse<JobOffer>, ApiError> {
    fetch_offer(&state, &offer_id).await?;
    JobOfferValidator::new().validate(&body).into_result()?;

    let offer_type = body.offer_type.as_deref().and_then(normalize_offer_type);

    sqlx::query(
        r#"UPDATE job_offers SET
            title = COALESCE(?, title),
            offer_type = COALESCE(?, offer_type),
            description = COALESCE(?, description),
            requirements = COALESCE(?, requirements),
            location = COALESCE(?, location),
            contract_type = COALESCE(?, contract_type),
            salary_range = COALESCE(?, salary_range),
            company_name = COALESCE(?, company_name),
            company_description = COALESCE(?, company_description),
            experience_level = COALESCE(?, experience_level),
            skills_required = COALESCE(?, skills_required),
            application_deadline = COALESCE(?, application_deadline),
            status = COALESCE(?, status),
            positions_available = COALESCE(?, positions_available),
            contact_email = COALESCE(?, contact_email),
            updated_at = ?
        WHERE id = ?"#,
    )
    .bind(body.title.as_deref().map(str::trim))
    .bind(offer_type)
    .bind(body.description.as_deref())
    .bind(body.requirements.as_deref())
    .bind(body.location.as_deref().map(str::trim))
    .bind(body.contract_type.as_deref())
    .bind(body.salary_range.as_deref())
    .bind(body.company_name.as_deref().map(str::trim))
    .bind(body.company_description.as_deref())
    .bind(body.experience_level.as_deref())
    .bind(skills_json(body.skills_required.as_ref()))
    .bind(body.application_deadline.as_deref())
    .bind(body.status.as_deref())
    .bind(body.positions_available)
    .bind(body.contact_email.as_deref())
    .bind(now_rfc3339())
    .bind(&offer_id)
    .execute(&state.db)
    .await?;

    state.job_offer_cache.invalidate().await;

    info!(job_offer_id = %offer_id, admin = %admin.0.id, "Job offer updated");

    let offer = fetch_offer(&state, &offer_id).await?;
    Ok(ApiResponse::ok("Offre d'emploi mise à jour avec succès", offer))
}

/// DELETE /api/admin/job-offers/:id
///
/// Offers that still have applications are kept; close them instead.
pub async fn admin_delete_job_offer(
    Extension(state): Extension<Arc<AppState>>,
    admin: AdminUser,
    Path(offer_id): Path<String>,
) -> Result<ApiResponse<()>, ApiError> {
    fetch_offer(&state, &offer_id).await?;

    let applications: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM applications WHERE job_offer_id = ?")
            .bind(&offer_id)
            .fetch_one(&state.db)
            .await?;

    if applications > 0 {
        warn!(job_offer_id = %offer_id, applications = applications, "Refusing to delete job offer with applications");
        return Err(ApiError::Conflict(format!(
            "Job offer has {} application(s); close it instead of deleting it",
            applications
        )));
    }

    sqlx::query("DELETE FROM job_offers WHERE id = ?")
        .bind(&offer_id)
        .execute(&state.db)
        .await?;

    state.job_offer_cache.invalidate().await;

    info!(job_offer_id = %offer_id, admin = %admin.0.id, "Job offer deleted");
    Ok(ApiResponse::message("Offre d'emploi supprimée avec succès"))
}

/// POST /api/admin/job-offers/cache/clear - Explicit cache invalidation
pub async fn admin_clear_job_offer_cache(
    Extension(state): Extension<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<ApiResponse<()>, ApiError> {
    state.job_offer_cache.invalidate().await;
    Ok(ApiResponse::message("Cache des offres d'emploi vidé"))
}

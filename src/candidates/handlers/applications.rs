// src/candidates/handlers/applications.rs

use axum::extract::{Extension, Path, Query};
use axum::Json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::analyses::repository;
use crate::auth::AdminUser;
use crate::candidates::models::*;
use crate::candidates::validators::ApplicationStatusValidator;
use crate::common::{now_rfc3339, ApiError, ApiResponse, AppState, Validator};

async fn fetch_application(state: &AppState, application_id: &str) -> Result<Application, ApiError> {
    sqlx::query_as::<_, Application>(
        "SELECT * FROM applications WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(application_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Application not found: {}", application_id)))
}

async fn fetch_summary(
    state: &AppState,
    application_id: &str,
) -> Result<ApplicationSummary, ApiError> {
    sqlx::query_as::<_, ApplicationSummary>(&format!(
        "{} WHERE a.id = ? AND a.deleted_at IS NULL",
        APPLICATION_SUMMARY_SELECT
    ))
    .bind(application_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Application not found: {}", application_id)))
}

/// GET /api/admin/applications - Filtered, paginated listing
pub async fn list_applications(
    Extension(state): Extension<Arc<AppState>>,
    _admin: AdminUser,
    Query(params): Query<ApplicationQuery>,
) -> Result<ApiResponse<ApplicationPage>, ApiError> {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(15).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let status = params
        .status
        .as_deref()
        .and_then(ApplicationStatus::parse)
        .map(|s| s.as_str());
    let search = params
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s.to_lowercase()));

    let filter = r#"
        a.deleted_at IS NULL
        AND (? IS NULL OR a.status = ?)
        AND (? IS NULL OR a.job_offer_id = ?)
        AND (? IS NULL OR lower(p.first_name) LIKE ? OR lower(p.last_name) LIKE ? OR p.email LIKE ?)
    "#;

    let total: i64 = sqlx::query_scalar(&format!(
        r#"SELECT COUNT(*) FROM applications a
           JOIN applicants p ON p.id = a.applicant_id
           WHERE {}"#,
        filter
    ))
    .bind(status)
    .bind(status)
    .bind(params.job_offer_id.as_deref())
    .bind(params.job_offer_id.as_deref())
    .bind(search.as_deref())
    .bind(search.as_deref())
    .bind(search.as_deref())
    .bind(search.as_deref())
    .fetch_one(&state.db)
    .await?;

    let applications = sqlx::query_as::<_, ApplicationSummary>(&format!(
        "{} WHERE {} ORDER BY a.submitted_at DESC, a.id DESC LIMIT ? OFFSET ?",
        APPLICATION_SUMMARY_SELECT, filter
    ))
    .bind(status)
    .bind(status)
    .bind(params.job_offer_id.as_deref())
    .bind(params.job_offer_id.as_deref())
    .bind(search.as_deref())
    .bind(search.as_deref())
    .bind(search.as_deref())
    .bind(search.as_deref())
    .bind(per_page)
    .bind(offset)
    .fetch_all(&state.db)
    .await?;

    Ok(ApiResponse::ok(
        "Candidatures récupérées",
        ApplicationPage {
            applications,
            total,
            page,
            per_page,
        },
    ))
}

/// GET /api/admin/applications/statistics
pub async fn application_statistics(
    Extension(state): Extension<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<ApiResponse<ApplicationStatistics>, ApiError> {
    let week_ago = (chrono::Utc::now() - chrono::Duration::days(7)).to_rfc3339();

    let (total, pending, processing, analyzed, rejected, this_week): (i64, i64, i64, i64, i64, i64) =
        sqlx::query_as(
            r#"SELECT COUNT(*),
                COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'processing' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'analyzed' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'rejected' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN submitted_at >= ? THEN 1 ELSE 0 END), 0)
               FROM applications WHERE deleted_at IS NULL"#,
        )
        .bind(&week_ago)
        .fetch_one(&state.db)
        .await?;

    Ok(ApiResponse::ok(
        "Statistiques des candidatures",
        ApplicationStatistics {
            total,
            pending,
            processing,
            analyzed,
            rejected,
            this_week,
        },
    ))
}

/// GET /api/admin/applications/:id - Applicant, opening, document links and analyses
pub async fn get_application(
    Extension(state): Extension<Arc<AppState>>,
    _admin: AdminUser,
    Path(application_id): Path<String>,
) -> Result<ApiResponse<ApplicationDetail>, ApiError> {
    let application = fetch_application(&state, &application_id).await?;
    let summary = fetch_summary(&state, &application_id).await?;
    let analyses = repository::list_for_application(&state.db, &application_id).await?;

    Ok(ApiResponse::ok(
        "Candidature récupérée",
        ApplicationDetail {
            summary,
            cv_url: state.storage.url(&application.cv_path),
            cover_letter_url: application
                .cover_letter_path
                .as_deref()
                .map(|p| state.storage.url(p)),
            analyses,
        },
    ))
}

/// PATCH /api/admin/applications/:id/status
///
/// `analyzed` stamps `analyzed_at` (keeping an existing stamp); any other status clears it.
pub async fn update_application_status(
    Extension(state): Extension<Arc<AppState>>,
    admin: AdminUser,
    Path(application_id): Path<String>,
    Json(body): Json<UpdateApplicationStatus>,
) -> Result<ApiResponse<ApplicationSummary>, ApiError> {
    ApplicationStatusValidator.validate(&body).into_result()?;
    fetch_application(&state, &application_id).await?;

    let status = ApplicationStatus::parse(&body.status)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown status: {}", body.status)))?;
    let now = now_rfc3339();

    sqlx::query(
        r#"UPDATE applications SET
            status = ?,
            analyzed_at = CASE WHEN ? = 'analyzed' THEN COALESCE(analyzed_at, ?) ELSE NULL END,
            admin_notes = COALESCE(?, admin_notes),
            updated_at = ?
           WHERE id = ?"#,
    )
    .bind(status.as_str())
    .bind(status.as_str())
    .bind(&now)
    .bind(body.admin_notes.as_deref())
    .bind(&now)
    .bind(&application_id)
    .execute(&state.db)
    .await
    .map_err(|e| match e.as_database_error() {
        Some(db) if db.is_unique_violation() => ApiError::Conflict(
            "The applicant already has an active application for this job offer".to_string(),
        ),
        _ => ApiError::from(e),
    })?;

    info!(
        application_id = %application_id,
        status = %status.as_str(),
        admin = %admin.0.id,
        "Application status updated"
    );

    let summary = fetch_summary(&state, &application_id).await?;
    Ok(ApiResponse::ok("Statut de la candidature mis à jour", summary))
}

/// DELETE /api/admin/applications/:id - Soft delete; documents are kept
pub async fn delete_application(
    Extension(state): Extension<Arc<AppState>>,
    admin: AdminUser,
    Path(application_id): Path<String>,
) -> Result<ApiResponse<()>, ApiError> {
    fetch_application(&state, &application_id).await?;

    let now = now_rfc3339();
    sqlx::query("UPDATE applications SET deleted_at = ?, updated_at = ? WHERE id = ?")
        .bind(&now)
        .bind(&now)
        .bind(&application_id)
        .execute(&state.db)
        .await?;

    info!(application_id = %application_id, admin = %admin.0.id, "Application soft-deleted");
    Ok(ApiResponse::message("Candidature supprimée"))
}

/// DELETE /api/admin/applications/:id/purge - Hard delete with documents and analyses
pub async fn purge_application(
    Extension(state): Extension<Arc<AppState>>,
    admin: AdminUser,
    Path(application_id): Path<String>,
) -> Result<ApiResponse<()>, ApiError> {
    let application = sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = ?")
        .bind(&application_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Application not found: {}", application_id)))?;

    let running: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM cv_analyses WHERE application_id = ? AND analysis_status = 'processing'",
    )
    .bind(&application_id)
    .fetch_one(&state.db)
    .await?;
    if running > 0 {
        return Err(ApiError::Conflict(
            "An analysis is in progress for this application".to_string(),
        ));
    }

    // Analyses and their processing logs cascade
    sqlx::query("DELETE FROM applications WHERE id = ?")
        .bind(&application_id)
        .execute(&state.db)
        .await?;

    let paths = std::iter::once(application.cv_path.as_str())
        .chain(application.cover_letter_path.as_deref());
    for path in paths {
        if let Err(e) = state.storage.delete(path).await {
            warn!(application_id = %application_id, path = %path, error = %e, "Failed to delete document");
        }
    }

    info!(application_id = %application_id, admin = %admin.0.id, "Application purged");
    Ok(ApiResponse::message("Candidature définitivement supprimée"))
}

/// GET /api/admin/applications/:id/files/:kind - Download link for `cv` or `cover_letter`
pub async fn get_application_file(
    Extension(state): Extension<Arc<AppState>>,
    _admin: AdminUser,
    Path((application_id, kind)): Path<(String, String)>,
) -> Result<ApiResponse<FileLink>, ApiError> {
    let file_kind = FileKind::parse(&kind)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown file kind: {}", kind)))?;
    let application = fetch_application(&state, &application_id).await?;

    let path = match file_kind {
        FileKind::Cv => Some(application.cv_path),
        FileKind::CoverLetter => application.cover_letter_path,
    }
    .ok_or_else(|| ApiError::NotFound("No cover letter for this application".to_string()))?;

    let exists = state
        .storage
        .exists(&path)
        .await
        .map_err(|e| ApiError::Storage(e.to_string()))?;
    if !exists {
        warn!(application_id = %application_id, path = %path, "Document missing from storage");
        return Err(ApiError::NotFound("File not found in storage".to_string()));
    }

    Ok(ApiResponse::ok(
        "Lien du fichier",
        FileLink {
            kind,
            url: state.storage.url(&path),
            path,
        },
    ))
}

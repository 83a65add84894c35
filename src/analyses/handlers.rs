// src/analyses/handlers.rs

use axum::extract::{Extension, Path, Query};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

use super::models::*;
use super::repository;
use super::worker;
use crate::auth::AdminUser;
use crate::common::{ApiError, ApiResponse, AppState};
use crate::services::openai::ProviderStatus;

/// GET /api/cv-analysis - Filtered listing with a status summary
pub async fn list_analyses(
    Extension(state): Extension<Arc<AppState>>,
    _admin: AdminUser,
    Query(params): Query<AnalysisQuery>,
) -> Result<ApiResponse<AnalysisPage>, ApiError> {
    let page = state.analyses.list(&params).await?;
    Ok(ApiResponse::ok("Analyses récupérées", page))
}

/// POST /api/cv-analysis - Create a pending analysis for an application
pub async fn create_analysis(
    Extension(state): Extension<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<CreateAnalysisRequest>,
) -> Result<ApiResponse<CvAnalysis>, ApiError> {
    let analysis = state.analyses.create(body.application_id.trim()).await?;
    info!(analysis_id = %analysis.id, admin = %admin.0.id, "Analysis requested");
    Ok(ApiResponse::created("Analyse créée", analysis))
}

/// GET /api/cv-analysis/:id
pub async fn get_analysis(
    Extension(state): Extension<Arc<AppState>>,
    _admin: AdminUser,
    Path(analysis_id): Path<String>,
) -> Result<ApiResponse<CvAnalysis>, ApiError> {
    let analysis = state.analyses.get(&analysis_id).await?;
    Ok(ApiResponse::ok("Analyse récupérée", analysis))
}

/// DELETE /api/cv-analysis/:id
pub async fn delete_analysis(
    Extension(state): Extension<Arc<AppState>>,
    admin: AdminUser,
    Path(analysis_id): Path<String>,
) -> Result<ApiResponse<()>, ApiError> {
    state.analyses.delete(&analysis_id).await?;
    info!(analysis_id = %analysis_id, admin = %admin.0.id, "Analysis deleted by admin");
    Ok(ApiResponse::message("Analyse supprimée"))
}

/// POST /api/cv-analysis/:id/analyze - Claim and queue; 202 with the processing record
pub async fn trigger_analysis(
    Extension(state): Extension<Arc<AppState>>,
    _admin: AdminUser,
    Path(analysis_id): Path<String>,
) -> Result<ApiResponse<CvAnalysis>, ApiError> {
    let analysis = worker::trigger(&state.analyses, &state.analysis_queue, &analysis_id).await?;
    Ok(ApiResponse::accepted("Analyse en cours", analysis))
}

/// POST /api/cv-analysis/batch - Sweep every pending analysis in the background
pub async fn batch_analyze(
    Extension(state): Extension<Arc<AppState>>,
    admin: AdminUser,
) -> Result<ApiResponse<Value>, ApiError> {
    let pending = repository::list_pending_ids(&state.db).await?.len();

    info!(pending = pending, admin = %admin.0.id, "Batch analysis requested");

    let service = state.analyses.clone();
    tokio::spawn(async move {
        if let Err(e) = service.sweep_pending().await {
            error!(error = %e, "Batch analysis aborted");
        }
    });

    Ok(ApiResponse::accepted(
        "Analyse par lot démarrée",
        json!({ "pending": pending }),
    ))
}

/// POST /api/cv-analysis/analyze-text - Evaluate raw text without storing anything
pub async fn analyze_text(
    Extension(state): Extension<Arc<AppState>>,
    _admin: AdminUser,
    Json(body): Json<AnalyzeTextRequest>,
) -> Result<ApiResponse<TextAnalysisResult>, ApiError> {
    let result = state.analyses.analyze_text(&body).await?;
    Ok(ApiResponse::ok("Analyse du texte terminée", result))
}

/// GET /api/cv-analysis/statistics
pub async fn analysis_statistics(
    Extension(state): Extension<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<ApiResponse<AnalysisStatistics>, ApiError> {
    let stats = state.analyses.statistics().await?;
    Ok(ApiResponse::ok("Statistiques des analyses", stats))
}

/// GET /api/cv-analysis/provider-status
pub async fn provider_status(
    Extension(state): Extension<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<ApiResponse<ProviderStatus>, ApiError> {
    let status = state.provider.health_check().await;
    Ok(ApiResponse::ok(status.message.clone(), status))
}

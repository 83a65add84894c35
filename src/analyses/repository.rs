// src/analyses/repository.rs
//! Row-level access to `cv_analyses` and `ai_processing_logs`.

use sqlx::SqlitePool;

use super::models::{CvAnalysis, ANALYSIS_COLUMNS};
use crate::common::{generate_analysis_id, generate_processing_log_id, now_rfc3339};

/// Inserts a pending analysis unless a live one already exists for the pair.
/// Returns the new id, or `None` when the unique index swallowed the insert.
pub async fn insert_if_absent(
    db: &SqlitePool,
    application_id: &str,
    job_offer_id: &str,
) -> Result<Option<String>, sqlx::Error> {
    let id = generate_analysis_id();
    let now = now_rfc3339();

    let result = sqlx::query(
        r#"INSERT OR IGNORE INTO cv_analyses
           (id, application_id, job_offer_id, analysis_status, created_at, updated_at)
           VALUES (?, ?, ?, 'pending', ?, ?)"#,
    )
    .bind(&id)
    .bind(application_id)
    .bind(job_offer_id)
    .bind(&now)
    .bind(&now)
    .execute(db)
    .await?;

    Ok((result.rows_affected() == 1).then_some(id))
}

pub async fn find(db: &SqlitePool, id: &str) -> Result<Option<CvAnalysis>, sqlx::Error> {
    sqlx::query_as::<_, CvAnalysis>(&format!(
        "SELECT {} FROM cv_analyses WHERE id = ?",
        ANALYSIS_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn list_for_application(
    db: &SqlitePool,
    application_id: &str,
) -> Result<Vec<CvAnalysis>, sqlx::Error> {
    sqlx::query_as::<_, CvAnalysis>(&format!(
        "SELECT {} FROM cv_analyses WHERE application_id = ? ORDER BY created_at DESC",
        ANALYSIS_COLUMNS
    ))
    .bind(application_id)
    .fetch_all(db)
    .await
}

/// Oldest first so a batch sweep works through the backlog in arrival order.
/// Analyses of soft-deleted applications are never picked up.
pub async fn list_pending_ids(db: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        r#"SELECT c.id FROM cv_analyses c
           JOIN applications a ON a.id = c.application_id AND a.deleted_at IS NULL
           WHERE c.analysis_status = 'pending'
           ORDER BY c.created_at ASC, c.id ASC"#,
    )
    .fetch_all(db)
    .await
}

pub struct ProcessingLogEntry<'a> {
    pub cv_analysis_id: &'a str,
    pub api_provider: &'a str,
    pub model: &'a str,
    pub tokens_used: Option<i64>,
    pub processing_time_ms: i64,
    pub error_message: Option<&'a str>,
}

pub async fn record_processing_log(
    db: &SqlitePool,
    entry: ProcessingLogEntry<'_>,
) -> Result<(), sqlx::Error> {
    let status = if entry.error_message.is_some() {
        "failed"
    } else {
        "success"
    };

    sqlx::query(
        r#"INSERT INTO ai_processing_logs
           (id, cv_analysis_id, api_provider, model, tokens_used, processing_time_ms,
            status, error_message, processed_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(generate_processing_log_id())
    .bind(entry.cv_analysis_id)
    .bind(entry.api_provider)
    .bind(entry.model)
    .bind(entry.tokens_used)
    .bind(entry.processing_time_ms)
    .bind(status)
    .bind(entry.error_message)
    .bind(now_rfc3339())
    .execute(db)
    .await?;

    Ok(())
}

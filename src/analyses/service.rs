// src/analyses/service.rs
//! Analysis lifecycle: creation, atomic claim, provider call and terminal write.

use serde_json::json;
use sqlx::{FromRow, SqlitePool};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use super::models::*;
use super::prompt::{build_user_prompt, job_description, SYSTEM_PROMPT};
use super::repository::{self, ProcessingLogEntry};
use crate::common::{now_rfc3339, ApiError, ValidationResult};
use crate::services::email::AnalysisEmailData;
use crate::services::openai::{CompletionError, CompletionRequest, Usage};
use crate::services::{CompletionProvider, NotificationDispatcher, PricingStrategy};

pub const MIN_CV_TEXT_CHARS: usize = 50;

/// Everything the provider call and the completion email need, loaded in one query.
#[derive(FromRow, Debug)]
struct AnalysisContext {
    application_id: String,
    cv_text: Option<String>,
    cover_letter_text: Option<String>,
    job_title: String,
    job_description: String,
    job_requirements: String,
    first_name: String,
    last_name: String,
    email: String,
}

pub struct AnalysisService {
    db: SqlitePool,
    provider: Arc<dyn CompletionProvider>,
    pricing: Arc<dyn PricingStrategy>,
    notifications: Arc<NotificationDispatcher>,
    max_tokens: u32,
    temperature: f32,
}

impl AnalysisService {
    pub fn new(
        db: SqlitePool,
        provider: Arc<dyn CompletionProvider>,
        pricing: Arc<dyn PricingStrategy>,
        notifications: Arc<NotificationDispatcher>,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            db,
            provider,
            pricing,
            notifications,
            max_tokens,
            temperature,
        }
    }

    // ------------------------------------------------------------------------
    // Creation and claim
    // ------------------------------------------------------------------------

    pub async fn create(&self, application_id: &str) -> Result<CvAnalysis, ApiError> {
        let job_offer_id: String = sqlx::query_scalar(
            "SELECT job_offer_id FROM applications WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(application_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Application not found: {}", application_id)))?;

        let id = repository::insert_if_absent(&self.db, application_id, &job_offer_id)
            .await?
            .ok_or_else(|| {
                ApiError::Conflict("An analysis already exists for this application".to_string())
            })?;

        info!(analysis_id = %id, application_id = %application_id, "Analysis created");
        self.get(&id).await
    }

    /// Atomic `pending → processing`. Only the caller whose update hits the row
    /// may run the analysis. Analyses of soft-deleted applications cannot be claimed.
    pub async fn claim(&self, id: &str) -> Result<CvAnalysis, ApiError> {
        let now = now_rfc3339();
        let mut tx = self.db.begin().await?;

        let claimed = sqlx::query(
            r#"UPDATE cv_analyses SET analysis_status = 'processing', updated_at = ?
               WHERE id = ? AND analysis_status = 'pending'
                 AND EXISTS (SELECT 1 FROM applications a
                             WHERE a.id = cv_analyses.application_id AND a.deleted_at IS NULL)"#,
        )
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            tx.rollback().await?;
            let current = repository::find(&self.db, id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("Analysis not found: {}", id)))?;

            return Err(match current.status() {
                Some(AnalysisStatus::Processing) => {
                    ApiError::Conflict("Analysis already in progress".to_string())
                }
                // Still pending, so the application guard is what refused the claim
                Some(status) if status.can_transition(AnalysisStatus::Processing) => {
                    ApiError::NotFound(format!(
                        "Application not found for analysis: {}",
                        current.application_id
                    ))
                }
                _ => ApiError::Conflict(format!(
                    "Analysis is not pending (status: {})",
                    current.analysis_status
                )),
            });
        }

        sqlx::query(
            r#"UPDATE applications SET status = 'processing', updated_at = ?
               WHERE id = (SELECT application_id FROM cv_analyses WHERE id = ?)
                 AND status = 'pending'"#,
        )
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(analysis_id = %id, "Analysis claimed");
        self.get(id).await
    }

    /// Undoes a claim that never reached a worker: `processing → pending` for
    /// the analysis and its application. No-op once a terminal state is written.
    pub async fn release(&self, id: &str) -> Result<(), ApiError> {
        let now = now_rfc3339();
        let mut tx = self.db.begin().await?;

        let released = sqlx::query(
            r#"UPDATE cv_analyses SET analysis_status = 'pending', updated_at = ?
               WHERE id = ? AND analysis_status = 'processing'"#,
        )
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if released.rows_affected() == 1 {
            sqlx::query(
                r#"UPDATE applications SET status = 'pending', updated_at = ?
                   WHERE id = (SELECT application_id FROM cv_analyses WHERE id = ?)
                     AND status = 'processing'"#,
            )
            .bind(&now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(analysis_id = %id, "Analysis claim released");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------------

    /// Runs an analysis that is already `processing`. Provider and parse
    /// failures end on the record as `failed`; only storage errors come back as `Err`.
    /// Any other status is returned untouched without calling the provider.
    pub async fn run_claimed(&self, id: &str) -> Result<CvAnalysis, ApiError> {
        let current = self.get(id).await?;
        let runnable = current
            .status()
            .map(|s| s.can_transition(AnalysisStatus::Completed))
            .unwrap_or(false);
        if !runnable {
            warn!(
                analysis_id = %id,
                status = %current.analysis_status,
                "Analysis is not processing, run skipped"
            );
            return Ok(current);
        }

        let context = sqlx::query_as::<_, AnalysisContext>(
            r#"SELECT a.id AS application_id, a.cv_text, a.cover_letter_text,
                      jo.title AS job_title, jo.description AS job_description,
                      jo.requirements AS job_requirements,
                      p.first_name, p.last_name, p.email
               FROM cv_analyses c
               JOIN applications a ON a.id = c.application_id
               JOIN job_offers jo ON jo.id = c.job_offer_id
               JOIN applicants p ON p.id = a.applicant_id
               WHERE c.id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        let Some(context) = context else {
            return Err(ApiError::NotFound(format!("Analysis not found: {}", id)));
        };

        let request = CompletionRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_prompt: build_user_prompt(
                context.cv_text.as_deref(),
                context.cover_letter_text.as_deref(),
                Some(&job_description(
                    &context.job_title,
                    &context.job_description,
                    &context.job_requirements,
                )),
            ),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            json_response: true,
        };

        match self.call_provider(id, &request).await {
            Ok((outcome, raw, usage)) => {
                self.complete(id, &context, outcome, raw, usage).await
            }
            Err(message) => self.fail(id, &context.application_id, &message).await,
        }
    }

    /// Claim and run inline.
    pub async fn analyze_now(&self, id: &str) -> Result<CvAnalysis, ApiError> {
        self.claim(id).await?;
        self.run_claimed(id).await
    }

    /// Runs every pending analysis in turn. One bad item never stops the sweep.
    pub async fn sweep_pending(&self) -> Result<SweepReport, ApiError> {
        let ids = repository::list_pending_ids(&self.db).await?;
        let mut report = SweepReport {
            examined: ids.len(),
            ..SweepReport::default()
        };

        for id in ids {
            match self.claim(&id).await {
                Ok(_) => {}
                Err(ApiError::Conflict(_)) | Err(ApiError::NotFound(_)) => {
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    error!(analysis_id = %id, error = %e, "Batch claim failed");
                    report.failed += 1;
                    continue;
                }
            }

            match self.run_claimed(&id).await {
                Ok(analysis) if analysis.status() == Some(AnalysisStatus::Completed) => {
                    report.completed += 1
                }
                Ok(_) => report.failed += 1,
                Err(e) => {
                    error!(analysis_id = %id, error = %e, "Batch analysis failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            examined = report.examined,
            completed = report.completed,
            failed = report.failed,
            skipped = report.skipped,
            "Batch analysis finished"
        );

        Ok(report)
    }

    /// Direct evaluation of raw text; nothing is stored.
    pub async fn analyze_text(
        &self,
        request: &AnalyzeTextRequest,
    ) -> Result<TextAnalysisResult, ApiError> {
        let mut validation = ValidationResult::new();
        if request.cv_text.trim().chars().count() < MIN_CV_TEXT_CHARS {
            validation.add_error(
                "cv_text",
                &format!("The CV text must be at least {} characters", MIN_CV_TEXT_CHARS),
            );
        }
        validation.into_result()?;

        let completion = self
            .provider
            .complete(&CompletionRequest {
                system_prompt: SYSTEM_PROMPT.to_string(),
                user_prompt: build_user_prompt(
                    Some(&request.cv_text),
                    request.cover_letter_text.as_deref(),
                    request.job_description.as_deref(),
                ),
                max_tokens: self.max_tokens,
                temperature: self.temperature,
                json_response: true,
            })
            .await
            .map_err(|e| match e {
                CompletionError::NotConfigured => {
                    ApiError::ServiceUnavailable("AI provider is not configured".to_string())
                }
                other => ApiError::ServiceUnavailable(format!("AI analysis failed: {}", other)),
            })?;

        let (_, analysis) =
            AnalysisOutcome::parse(&completion.content).map_err(ApiError::InternalServer)?;

        Ok(TextAnalysisResult {
            analysis,
            tokens_used: completion.usage.total_tokens,
            cost_estimate: self.pricing.estimate(&completion.usage),
        })
    }

    async fn call_provider(
        &self,
        id: &str,
        request: &CompletionRequest,
    ) -> Result<(AnalysisOutcome, serde_json::Value, Usage), String> {
        let started = Instant::now();
        let result = self.provider.complete(request).await;
        let elapsed_ms = started.elapsed().as_millis() as i64;

        let (tokens, outcome) = match result {
            Ok(completion) => (
                Some(i64::from(completion.usage.total_tokens)),
                AnalysisOutcome::parse(&completion.content)
                    .map(|(outcome, raw)| (outcome, raw, completion.usage)),
            ),
            Err(e) => (None, Err(e.to_string())),
        };

        let entry = ProcessingLogEntry {
            cv_analysis_id: id,
            api_provider: self.provider.provider_name(),
            model: self.provider.model(),
            tokens_used: tokens,
            processing_time_ms: elapsed_ms,
            error_message: outcome.as_ref().err().map(String::as_str),
        };
        if let Err(e) = repository::record_processing_log(&self.db, entry).await {
            warn!(analysis_id = %id, error = %e, "Failed to record processing log");
        }

        outcome
    }

    async fn complete(
        &self,
        id: &str,
        context: &AnalysisContext,
        outcome: AnalysisOutcome,
        raw: serde_json::Value,
        usage: Usage,
    ) -> Result<CvAnalysis, ApiError> {
        let now = now_rfc3339();
        let cost = self.pricing.estimate(&usage);
        let list = |items: &Vec<serde_json::Value>| {
            serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
        };

        let mut tx = self.db.begin().await?;

        let written = sqlx::query(
            r#"UPDATE cv_analyses SET
                analysis_status = 'completed',
                profile_summary = ?, key_skills = ?, education = ?, experience = ?,
                languages = ?, strengths = ?, weaknesses = ?, job_match_score = ?,
                job_match_analysis = ?, recommendations = ?, overall_rating = ?, next_steps = ?,
                raw_ai_response = ?, tokens_used = ?, cost_estimate = ?, error_message = NULL,
                analyzed_at = ?, failed_at = NULL, updated_at = ?
               WHERE id = ? AND analysis_status = 'processing'"#,
        )
        .bind(&outcome.profile_summary)
        .bind(list(&outcome.key_skills))
        .bind(list(&outcome.education))
        .bind(list(&outcome.experience))
        .bind(list(&outcome.languages))
        .bind(list(&outcome.strengths))
        .bind(list(&outcome.weaknesses))
        .bind(outcome.job_match_score)
        .bind(&outcome.job_match_analysis)
        .bind(list(&outcome.recommendations))
        .bind(&outcome.overall_rating)
        .bind(list(&outcome.next_steps))
        .bind(raw.to_string())
        .bind(i64::from(usage.total_tokens))
        .bind(cost)
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if written.rows_affected() == 0 {
            tx.rollback().await?;
            warn!(analysis_id = %id, "Analysis left processing before completion; result dropped");
            return self.get(id).await;
        }

        sqlx::query(
            r#"UPDATE applications SET status = 'analyzed', analyzed_at = ?, updated_at = ?
               WHERE id = ? AND status IN ('pending', 'processing') AND deleted_at IS NULL"#,
        )
        .bind(&now)
        .bind(&now)
        .bind(&context.application_id)
        .execute(&mut *tx)
        .await?;

        // Deleted while the provider was running: keep the result, skip the email
        let application_live: bool = sqlx::query_scalar(
            "SELECT COUNT(*) > 0 FROM applications WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(&context.application_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            analysis_id = %id,
            score = ?outcome.job_match_score,
            rating = ?outcome.overall_rating,
            tokens = usage.total_tokens,
            "Analysis completed"
        );

        if !application_live {
            warn!(analysis_id = %id, "Application was deleted, completion email skipped");
            return self.get(id).await;
        }

        self.notifications
            .analysis_completed(
                &context.email,
                &AnalysisEmailData {
                    first_name: context.first_name.clone(),
                    last_name: context.last_name.clone(),
                    job_title: context.job_title.clone(),
                    job_match_score: outcome.job_match_score,
                    overall_rating: outcome.overall_rating.clone(),
                    profile_summary: outcome.profile_summary.clone(),
                    analyzed_at: now,
                },
            )
            .await;

        self.get(id).await
    }

    async fn fail(
        &self,
        id: &str,
        application_id: &str,
        message: &str,
    ) -> Result<CvAnalysis, ApiError> {
        let now = now_rfc3339();
        let mut tx = self.db.begin().await?;

        let written = sqlx::query(
            r#"UPDATE cv_analyses SET
                analysis_status = 'failed',
                profile_summary = NULL, key_skills = NULL, education = NULL, experience = NULL,
                languages = NULL, strengths = NULL, weaknesses = NULL, job_match_score = NULL,
                job_match_analysis = NULL, recommendations = NULL, overall_rating = NULL,
                next_steps = NULL, tokens_used = NULL, cost_estimate = NULL,
                raw_ai_response = ?, error_message = ?,
                analyzed_at = NULL, failed_at = ?, updated_at = ?
               WHERE id = ? AND analysis_status = 'processing'"#,
        )
        .bind(json!({ "error": message }).to_string())
        .bind(message)
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if written.rows_affected() == 0 {
            tx.rollback().await?;
            warn!(analysis_id = %id, "Analysis left processing before failure was recorded");
            return self.get(id).await;
        }

        sqlx::query(
            r#"UPDATE applications SET status = 'pending', updated_at = ?
               WHERE id = ? AND status = 'processing' AND deleted_at IS NULL"#,
        )
        .bind(&now)
        .bind(application_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        warn!(analysis_id = %id, error = %message, "Analysis failed");
        self.get(id).await
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub async fn get(&self, id: &str) -> Result<CvAnalysis, ApiError> {
        repository::find(&self.db, id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Analysis not found: {}", id)))
    }

    /// Processing rows belong to a running worker and cannot be removed.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let analysis = self.get(id).await?;
        if analysis.status() == Some(AnalysisStatus::Processing) {
            return Err(ApiError::Conflict(
                "Analysis is in progress and cannot be deleted".to_string(),
            ));
        }

        sqlx::query("DELETE FROM cv_analyses WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;

        info!(analysis_id = %id, "Analysis deleted");
        Ok(())
    }

    pub async fn list(&self, query: &AnalysisQuery) -> Result<AnalysisPage, ApiError> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(15).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let status = query.status.as_deref().map(str::trim).filter(|s| !s.is_empty());
        if let Some(raw) = status {
            if AnalysisStatus::parse(raw).is_none() {
                return Err(ApiError::BadRequest(format!("Unknown analysis status: {}", raw)));
            }
        }
        let rating = query
            .rating
            .as_deref()
            .map(|r| r.trim().to_uppercase())
            .filter(|r| !r.is_empty());

        let filter = r#"
            (? IS NULL OR analysis_status = ?)
            AND (? IS NULL OR job_offer_id = ?)
            AND (? IS NULL OR overall_rating = ?)
            AND (? IS NULL OR job_match_score >= ?)
        "#;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM cv_analyses WHERE {}",
            filter
        ))
        .bind(status)
        .bind(status)
        .bind(query.job_offer_id.as_deref())
        .bind(query.job_offer_id.as_deref())
        .bind(rating.as_deref())
        .bind(rating.as_deref())
        .bind(query.min_score)
        .bind(query.min_score)
        .fetch_one(&self.db)
        .await?;

        let analyses = sqlx::query_as::<_, CvAnalysis>(&format!(
            "SELECT {} FROM cv_analyses WHERE {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            ANALYSIS_COLUMNS, filter
        ))
        .bind(status)
        .bind(status)
        .bind(query.job_offer_id.as_deref())
        .bind(query.job_offer_id.as_deref())
        .bind(rating.as_deref())
        .bind(rating.as_deref())
        .bind(query.min_score)
        .bind(query.min_score)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        Ok(AnalysisPage {
            analyses,
            total,
            page,
            per_page,
            summary: self.status_counts().await?,
        })
    }

    async fn status_counts(&self) -> Result<StatusCounts, ApiError> {
        let (total, pending, processing, completed, failed): (i64, i64, i64, i64, i64) =
            sqlx::query_as(
                r#"SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN analysis_status = 'pending' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN analysis_status = 'processing' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN analysis_status = 'completed' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN analysis_status = 'failed' THEN 1 ELSE 0 END), 0)
                   FROM cv_analyses"#,
            )
            .fetch_one(&self.db)
            .await?;

        Ok(StatusCounts {
            total,
            pending,
            processing,
            completed,
            failed,
        })
    }

    pub async fn statistics(&self) -> Result<AnalysisStatistics, ApiError> {
        let counts = self.status_counts().await?;

        let (average_score, total_tokens, total_cost): (Option<f64>, i64, f64) = sqlx::query_as(
            r#"SELECT
                (SELECT AVG(job_match_score) FROM cv_analyses
                 WHERE analysis_status = 'completed' AND job_match_score IS NOT NULL),
                COALESCE(SUM(tokens_used), 0),
                COALESCE(SUM(cost_estimate), 0.0)
               FROM cv_analyses"#,
        )
        .fetch_one(&self.db)
        .await?;

        let ratings: Vec<(String, i64)> = sqlx::query_as(
            r#"SELECT overall_rating, COUNT(*) FROM cv_analyses
               WHERE analysis_status = 'completed' AND overall_rating IS NOT NULL
               GROUP BY overall_rating"#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(AnalysisStatistics {
            counts,
            average_score: average_score.map(|s| (s * 100.0).round() / 100.0),
            total_tokens,
            total_cost: (total_cost * 10_000.0).round() / 10_000.0,
            rating_distribution: ratings.into_iter().collect::<BTreeMap<_, _>>(),
        })
    }
}

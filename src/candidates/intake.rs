// src/candidates/intake.rs
//! Public application intake.
//!
//! Every check runs before anything is written. Blobs go first; any later
//! failure removes the blobs already written so no orphan documents remain.

use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};

use super::models::*;
use super::validators::SubmissionValidator;
use crate::analyses::repository;
use crate::common::{
    generate_applicant_id, generate_application_id, now_rfc3339, safe_email_log, ApiError,
    ValidationResult, Validator,
};
use crate::services::email::SubmissionEmailData;
use crate::services::pdf::extract_text;
use crate::services::{BlobCategory, BlobStore, NotificationDispatcher};

const DUPLICATE_APPLICATION_MESSAGE: &str = "You have already applied for this job offer";

fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

pub struct IntakeService {
    db: SqlitePool,
    storage: Arc<dyn BlobStore>,
    notifications: Arc<NotificationDispatcher>,
    max_upload_bytes: usize,
}

struct PersistedApplication {
    applicant_id: String,
    application_id: String,
    submitted_at: String,
}

impl IntakeService {
    pub fn new(
        db: SqlitePool,
        storage: Arc<dyn BlobStore>,
        notifications: Arc<NotificationDispatcher>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            db,
            storage,
            notifications,
            max_upload_bytes,
        }
    }

    pub async fn submit(&self, submission: Submission) -> Result<SubmissionReceipt, ApiError> {
        let job_title = self.validate(&submission).await?;

        let email = submission.email.trim().to_lowercase();
        let job_offer_id = submission.job_offer_id.trim().to_string();

        let Some(cv_file) = submission.cv_file.as_ref() else {
            return Err(ApiError::BadRequest("The CV file is required".to_string()));
        };

        // 1. Blobs
        let mut written = Vec::with_capacity(2);
        let cv_path = self
            .storage
            .store(cv_file.data.clone(), BlobCategory::CvFiles)
            .await
            .map_err(|e| ApiError::Storage(e.to_string()))?;
        written.push(cv_path.clone());

        let cover_letter_path = match submission.cover_letter.as_ref() {
            Some(file) => {
                match self
                    .storage
                    .store(file.data.clone(), BlobCategory::CoverLetters)
                    .await
                {
                    Ok(path) => {
                        written.push(path.clone());
                        Some(path)
                    }
                    Err(e) => {
                        self.discard_blobs(&written).await;
                        return Err(ApiError::Storage(e.to_string()));
                    }
                }
            }
            None => None,
        };

        // 2. Text extraction, failures become None
        let cv_text = extract_text(cv_file.data.clone()).await;
        let cover_letter_text = match submission.cover_letter.as_ref() {
            Some(file) => extract_text(file.data.clone()).await,
            None => None,
        };

        // 3. Applicant + application
        let persisted = match self
            .persist(
                &submission,
                &email,
                &job_offer_id,
                &cv_path,
                cover_letter_path.as_deref(),
                cv_text.as_deref(),
                cover_letter_text.as_deref(),
            )
            .await
        {
            Ok(p) => p,
            Err(e) => {
                self.discard_blobs(&written).await;
                // A concurrent submission for the same pair won the race
                if is_unique_violation(&e) {
                    let mut result = ValidationResult::new();
                    result.add_error("email", DUPLICATE_APPLICATION_MESSAGE);
                    return Err(ApiError::Validation(result));
                }
                return Err(e.into());
            }
        };

        info!(
            application_id = %persisted.application_id,
            job_offer_id = %job_offer_id,
            email = %safe_email_log(&email),
            "Application submitted"
        );

        // 4. Confirmation email, best effort
        let notification_sent = self
            .notifications
            .submission_confirmed(&SubmissionEmailData {
                first_name: submission.first_name.trim().to_string(),
                last_name: submission.last_name.trim().to_string(),
                email: email.clone(),
                phone: submission.phone.trim().to_string(),
                linkedin_url: submission
                    .linkedin_url
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from),
                job_title,
                submitted_at: persisted.submitted_at.clone(),
            })
            .await;

        // 5. Pending analysis, best effort
        let analysis_id =
            match repository::insert_if_absent(&self.db, &persisted.application_id, &job_offer_id)
                .await
            {
                Ok(id) => id,
                Err(e) => {
                    warn!(
                        application_id = %persisted.application_id,
                        error = %e,
                        "Could not create the pending analysis"
                    );
                    None
                }
            };

        Ok(SubmissionReceipt {
            application_id: persisted.application_id,
            applicant_id: persisted.applicant_id,
            job_offer_id,
            status: ApplicationStatus::Pending.as_str().to_string(),
            submitted_at: persisted.submitted_at,
            analysis_id,
            notification_sent,
        })
    }

    /// Structural checks plus the ones that need the database, merged into a
    /// single result. Returns the job title on success.
    async fn validate(&self, submission: &Submission) -> Result<String, ApiError> {
        let mut result = SubmissionValidator {
            max_upload_bytes: self.max_upload_bytes,
        }
        .validate(submission);

        let job_offer_id = submission.job_offer_id.trim();
        let mut job_title = None;

        if !job_offer_id.is_empty() {
            job_title = sqlx::query_scalar::<_, String>("SELECT title FROM job_offers WHERE id = ?")
                .bind(job_offer_id)
                .fetch_optional(&self.db)
                .await?;

            if job_title.is_none() {
                result.add_error("job_offer_id", "The selected job offer does not exist");
            }
        }

        if job_title.is_some() && !result.has_error("email") {
            let live: i64 = sqlx::query_scalar(
                r#"SELECT COUNT(*) FROM applications a
                   JOIN applicants p ON p.id = a.applicant_id
                   WHERE p.email = ? AND a.job_offer_id = ?
                     AND a.deleted_at IS NULL
                     AND a.status IN ('pending', 'processing', 'analyzed')"#,
            )
            .bind(submission.email.trim().to_lowercase())
            .bind(job_offer_id)
            .fetch_one(&self.db)
            .await?;

            if live > 0 {
                result.add_error("email", DUPLICATE_APPLICATION_MESSAGE);
            }
        }

        result.into_result()?;
        Ok(job_title.unwrap_or_default())
    }

    #[allow(clippy::too_many_arguments)]
    async fn persist(
        &self,
        submission: &Submission,
        email: &str,
        job_offer_id: &str,
        cv_path: &str,
        cover_letter_path: Option<&str>,
        cv_text: Option<&str>,
        cover_letter_text: Option<&str>,
    ) -> Result<PersistedApplication, sqlx::Error> {
        let now = now_rfc3339();
        let linkedin_url = submission
            .linkedin_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let mut tx = self.db.begin().await?;

        // Applicants are immutable once created; a known email reuses the row
        sqlx::query(
            r#"INSERT INTO applicants (id, first_name, last_name, email, phone, linkedin_url, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(email) DO NOTHING"#,
        )
        .bind(generate_applicant_id())
        .bind(submission.first_name.trim())
        .bind(submission.last_name.trim())
        .bind(email)
        .bind(submission.phone.trim())
        .bind(linkedin_url)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let applicant_id: String = sqlx::query_scalar("SELECT id FROM applicants WHERE email = ?")
            .bind(email)
            .fetch_one(&mut *tx)
            .await?;

        let application_id = generate_application_id();
        sqlx::query(
            r#"INSERT INTO applications
               (id, applicant_id, job_offer_id, cv_path, cover_letter_path, cv_text,
                cover_letter_text, status, submitted_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?)"#,
        )
        .bind(&application_id)
        .bind(&applicant_id)
        .bind(job_offer_id)
        .bind(cv_path)
        .bind(cover_letter_path)
        .bind(cv_text)
        .bind(cover_letter_text)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(PersistedApplication {
            applicant_id,
            application_id,
            submitted_at: now,
        })
    }

    async fn discard_blobs(&self, paths: &[String]) {
        for path in paths {
            if let Err(e) = self.storage.delete(path).await {
                warn!(path = %path, error = %e, "Failed to remove orphaned upload");
            }
        }
    }
}

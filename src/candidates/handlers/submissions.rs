// src/candidates/handlers/submissions.rs

use axum::extract::{Extension, Multipart};
use std::sync::Arc;
use tracing::{info, warn};

use crate::candidates::models::{Submission, SubmissionReceipt, UploadedFile};
use crate::common::{ApiError, ApiResponse, AppState};

/// Reads the public application form. Unknown fields are ignored; empty file
/// parts count as absent.
pub async fn read_submission(mut multipart: Multipart) -> Result<Submission, ApiError> {
    let mut submission = Submission::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!(error = %e, "Malformed multipart body");
        ApiError::BadRequest("Invalid multipart form data".to_string())
    })? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "cv_file" | "lettre_motivation_file" | "cover_letter" => {
                let file_name = field.file_name().map(String::from);
                let content_type = field.content_type().map(String::from);
                let data = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::BadRequest("Invalid file".to_string()))?;

                if data.is_empty() && file_name.as_deref().unwrap_or("").is_empty() {
                    continue;
                }

                let file = UploadedFile {
                    file_name,
                    content_type,
                    data,
                };
                if name == "cv_file" {
                    submission.cv_file = Some(file);
                } else {
                    submission.cover_letter = Some(file);
                }
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|_| ApiError::BadRequest(format!("Invalid value for {}", name)))?;

                match name.as_str() {
                    "prenom" | "first_name" => submission.first_name = value,
                    "nom" | "last_name" => submission.last_name = value,
                    "email" => submission.email = value,
                    "telephone" | "phone" => submission.phone = value,
                    "linkedin_url" => submission.linkedin_url = Some(value),
                    "job_offer_id" => submission.job_offer_id = value,
                    _ => {}
                }
            }
        }
    }

    Ok(submission)
}

/// POST /api/candidates - Public application with CV and optional cover letter
pub async fn submit_application(
    Extension(state): Extension<Arc<AppState>>,
    multipart: Multipart,
) -> Result<ApiResponse<SubmissionReceipt>, ApiError> {
    let submission = read_submission(multipart).await?;

    info!(
        job_offer_id = %submission.job_offer_id,
        has_cover_letter = submission.cover_letter.is_some(),
        "Application received"
    );

    let receipt = state.intake.submit(submission).await?;

    Ok(ApiResponse::created(
        "Votre candidature a été envoyée avec succès",
        receipt,
    ))
}

// src/candidates/validators.rs

use super::models::*;
use crate::common::validation::{check_required, is_valid_email, is_valid_http_url};
use crate::common::{ValidationResult, Validator};
use crate::services::pdf::{is_pdf, PDF_MIME};

// ============================================================================
// Submission Validator
// ============================================================================

/// Structural checks on a submission. Checks that need the database (job offer
/// exists, duplicate application) run in the intake service and merge into the
/// same result.
pub struct SubmissionValidator {
    pub max_upload_bytes: usize,
}

fn megabytes(bytes: usize) -> String {
    let mb = bytes as f64 / (1024.0 * 1024.0);
    if mb.fract() == 0.0 {
        format!("{} MB", mb as u64)
    } else {
        format!("{:.1} MB", mb)
    }
}

/// Declared type (when sent) must be PDF, content must sniff as PDF, and size
/// must stay within the limit.
pub fn check_pdf_upload(
    result: &mut ValidationResult,
    field: &str,
    file: &UploadedFile,
    max_bytes: usize,
) {
    if file.data.is_empty() {
        result.add_error(field, "The uploaded file is empty");
        return;
    }

    let declared_ok = match file.content_type.as_deref() {
        None => true,
        Some(ct) => {
            let mime = ct.split(';').next().unwrap_or("").trim().to_lowercase();
            mime.is_empty() || mime == PDF_MIME || mime == "application/x-pdf"
        }
    };

    if !declared_ok || !is_pdf(&file.data) {
        result.add_error(field, "The file must be a PDF document");
    }

    if file.data.len() > max_bytes {
        result.add_error(
            field,
            &format!("The file must not exceed {}", megabytes(max_bytes)),
        );
    }
}

impl Validator<Submission> for SubmissionValidator {
    fn validate(&self, data: &Submission) -> ValidationResult {
        let mut result = ValidationResult::new();

        check_required(&mut result, "prenom", &data.first_name, 255);
        check_required(&mut result, "nom", &data.last_name, 255);
        check_required(&mut result, "telephone", &data.phone, 20);

        if data.email.trim().is_empty() {
            result.add_error("email", "The email field is required");
        } else if !is_valid_email(&data.email) {
            result.add_error("email", "The email must be a valid email address");
        }

        if let Some(url) = data.linkedin_url.as_deref() {
            if !url.trim().is_empty() && !is_valid_http_url(url) {
                result.add_error("linkedin_url", "The LinkedIn URL must be a valid URL");
            }
        }

        if data.job_offer_id.trim().is_empty() {
            result.add_error("job_offer_id", "The job offer field is required");
        }

        match &data.cv_file {
            Some(file) => check_pdf_upload(&mut result, "cv_file", file, self.max_upload_bytes),
            None => result.add_error("cv_file", "The CV file is required"),
        }

        if let Some(file) = &data.cover_letter {
            check_pdf_upload(
                &mut result,
                "lettre_motivation_file",
                file,
                self.max_upload_bytes,
            );
        }

        result
    }
}

// ============================================================================
// Admin Status Update Validator
// ============================================================================

pub const MAX_ADMIN_NOTES: usize = 1000;

pub struct ApplicationStatusValidator;

impl Validator<UpdateApplicationStatus> for ApplicationStatusValidator {
    fn validate(&self, data: &UpdateApplicationStatus) -> ValidationResult {
        let mut result = ValidationResult::new();

        if ApplicationStatus::parse(&data.status).is_none() {
            result.add_error(
                "status",
                "The status must be one of: pending, processing, analyzed, rejected",
            );
        }

        if let Some(notes) = &data.admin_notes {
            if notes.chars().count() > MAX_ADMIN_NOTES {
                result.add_error(
                    "admin_notes",
                    &format!("Admin notes must not exceed {} characters", MAX_ADMIN_NOTES),
                );
            }
        }

        result
    }
}

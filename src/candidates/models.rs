// src/candidates/models.rs

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::analyses::models::CvAnalysis;

// ============================================================================
// Application status
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Processing,
    Analyzed,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Processing => "processing",
            ApplicationStatus::Analyzed => "analyzed",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "pending" => Some(ApplicationStatus::Pending),
            "processing" => Some(ApplicationStatus::Processing),
            "analyzed" => Some(ApplicationStatus::Analyzed),
            "rejected" => Some(ApplicationStatus::Rejected),
            _ => None,
        }
    }
}

// ============================================================================
// Stored records
// ============================================================================

#[derive(FromRow, Serialize, Debug, Clone)]
pub struct Applicant {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub linkedin_url: Option<String>,
    pub created_at: String,
}

#[derive(FromRow, Serialize, Debug, Clone)]
pub struct Application {
    pub id: String,
    pub applicant_id: String,
    pub job_offer_id: String,
    pub cv_path: String,
    pub cover_letter_path: Option<String>,
    #[serde(skip)]
    pub cv_text: Option<String>,
    #[serde(skip)]
    pub cover_letter_text: Option<String>,
    pub status: String,
    pub admin_notes: Option<String>,
    pub submitted_at: String,
    pub analyzed_at: Option<String>,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

/// Application joined with its applicant and job title, for admin listings
#[derive(FromRow, Serialize, Debug, Clone)]
pub struct ApplicationSummary {
    pub id: String,
    pub status: String,
    pub admin_notes: Option<String>,
    pub submitted_at: String,
    pub analyzed_at: Option<String>,
    pub job_offer_id: String,
    pub job_title: String,
    pub applicant_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub linkedin_url: Option<String>,
    pub has_cover_letter: bool,
}

pub const APPLICATION_SUMMARY_SELECT: &str = r#"
    SELECT a.id, a.status, a.admin_notes, a.submitted_at, a.analyzed_at,
           a.job_offer_id, jo.title AS job_title,
           a.applicant_id, p.first_name, p.last_name, p.email, p.phone, p.linkedin_url,
           (a.cover_letter_path IS NOT NULL) AS has_cover_letter
    FROM applications a
    JOIN applicants p ON p.id = a.applicant_id
    JOIN job_offers jo ON jo.id = a.job_offer_id
"#;

#[derive(Serialize, Debug)]
pub struct ApplicationDetail {
    #[serde(flatten)]
    pub summary: ApplicationSummary,
    pub cv_url: String,
    pub cover_letter_url: Option<String>,
    pub analyses: Vec<CvAnalysis>,
}

#[derive(Serialize, Debug)]
pub struct ApplicationPage {
    pub applications: Vec<ApplicationSummary>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

// ============================================================================
// Submission
// ============================================================================

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// A public application submission as read from the multipart form
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub linkedin_url: Option<String>,
    pub job_offer_id: String,
    pub cv_file: Option<UploadedFile>,
    pub cover_letter: Option<UploadedFile>,
}

#[derive(Serialize, Debug, Clone)]
pub struct SubmissionReceipt {
    pub application_id: String,
    pub applicant_id: String,
    pub job_offer_id: String,
    pub status: String,
    pub submitted_at: String,
    pub analysis_id: Option<String>,
    pub notification_sent: bool,
}

// ============================================================================
// Admin requests
// ============================================================================

#[derive(Deserialize, Debug, Clone)]
pub struct UpdateApplicationStatus {
    pub status: String,
    pub admin_notes: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ApplicationQuery {
    pub status: Option<String>,
    pub job_offer_id: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Serialize, Debug, Default, PartialEq, Eq)]
pub struct ApplicationStatistics {
    pub total: i64,
    pub pending: i64,
    pub processing: i64,
    pub analyzed: i64,
    pub rejected: i64,
    pub this_week: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Cv,
    CoverLetter,
}

impl FileKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "cv" => Some(FileKind::Cv),
            "cover_letter" => Some(FileKind::CoverLetter),
            _ => None,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct FileLink {
    pub kind: String,
    pub path: String,
    pub url: String,
}

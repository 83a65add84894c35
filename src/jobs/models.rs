// src/jobs/models.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::common::helpers::serialize_json_list;

// ============================================================================
// Job Offer Models
// ============================================================================

pub const OFFER_TYPES: [&str; 2] = ["job", "internship"];
pub const CONTRACT_TYPES: [&str; 5] = ["CDI", "CDD", "Stage", "Freelance", "Alternance"];
pub const EXPERIENCE_LEVELS: [&str; 4] = ["junior", "intermediate", "senior", "expert"];
pub const OFFER_STATUSES: [&str; 3] = ["active", "inactive", "closed"];

/// Maps the French wire values (`emploi`, `stage`) onto stored offer types.
pub fn normalize_offer_type(raw: &str) -> Option<&'static str> {
    match raw.trim().to_lowercase().as_str() {
        "job" | "emploi" => Some("job"),
        "internship" | "stage" => Some("internship"),
        _ => None,
    }
}

#[derive(FromRow, Serialize, Debug, Clone)]
pub struct JobOffer {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub offer_type: String,
    pub description: String,
    pub requirements: String,
    pub location: String,
    pub contract_type: String,
    pub salary_range: Option<String>,
    pub company_name: String,
    pub company_description: Option<String>,
    pub experience_level: String,
    #[serde(serialize_with = "serialize_json_list")]
    pub skills_required: Option<String>, // JSON array in DB
    pub application_deadline: Option<String>,
    pub status: String,
    pub positions_available: i64,
    pub contact_email: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub const JOB_OFFER_COLUMNS: &str = r#"id, title, offer_type, description, requirements, location,
    contract_type, salary_range, company_name, company_description, experience_level,
    skills_required, application_deadline, status, positions_available, contact_email,
    created_at, updated_at"#;

#[derive(Deserialize, Debug, Clone)]
pub struct CreateJobOffer {
    pub title: String,
    #[serde(rename = "type", alias = "offer_type")]
    pub offer_type: String,
    pub description: String,
    pub requirements: String,
    pub location: String,
    pub contract_type: String,
    pub salary_range: Option<String>,
    pub company_name: String,
    pub company_description: Option<String>,
    pub experience_level: String,
    pub skills_required: Option<Vec<String>>,
    pub application_deadline: Option<String>,
    pub status: Option<String>,
    pub positions_available: Option<i64>,
    pub contact_email: Option<String>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct UpdateJobOffer {
    pub title: Option<String>,
    #[serde(rename = "type", alias = "offer_type")]
    pub offer_type: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub location: Option<String>,
    pub contract_type: Option<String>,
    pub salary_range: Option<String>,
    pub company_name: Option<String>,
    pub company_description: Option<String>,
    pub experience_level: Option<String>,
    pub skills_required: Option<Vec<String>>,
    pub application_deadline: Option<String>,
    pub status: Option<String>,
    pub positions_available: Option<i64>,
    pub contact_email: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct JobOfferQuery {
    #[serde(rename = "type")]
    pub offer_type: Option<String>,
    pub location: Option<String>,
    pub experience_level: Option<String>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(FromRow, Serialize, Debug)]
pub struct JobOfferWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub offer: JobOffer,
    pub applications_count: i64,
}

#[derive(Serialize, Debug)]
pub struct JobOfferPage {
    pub job_offers: Vec<JobOfferWithCount>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

#[derive(Serialize, Debug)]
pub struct PublicJobOffers {
    pub job_offers: Vec<JobOffer>,
    pub cached: bool,
    pub cached_at: String,
}

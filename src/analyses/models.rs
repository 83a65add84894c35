// src/analyses/models.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::collections::BTreeMap;

use crate::common::helpers::{serialize_json_list, serialize_json_text};

// ============================================================================
// Analysis status state machine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Processing => "processing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(AnalysisStatus::Pending),
            "processing" => Some(AnalysisStatus::Processing),
            "completed" => Some(AnalysisStatus::Completed),
            "failed" => Some(AnalysisStatus::Failed),
            _ => None,
        }
    }

    /// pending → processing → completed | failed; nothing leaves a terminal state.
    pub fn can_transition(&self, to: AnalysisStatus) -> bool {
        matches!(
            (self, to),
            (AnalysisStatus::Pending, AnalysisStatus::Processing)
                | (AnalysisStatus::Processing, AnalysisStatus::Completed)
                | (AnalysisStatus::Processing, AnalysisStatus::Failed)
        )
    }
}

// ============================================================================
// Stored record
// ============================================================================

#[derive(FromRow, Serialize, Debug, Clone)]
pub struct CvAnalysis {
    pub id: String,
    pub application_id: String,
    pub job_offer_id: String,
    pub analysis_status: String,
    pub profile_summary: Option<String>,
    #[serde(serialize_with = "serialize_json_list")]
    pub key_skills: Option<String>,
    #[serde(serialize_with = "serialize_json_list")]
    pub education: Option<String>,
    #[serde(serialize_with = "serialize_json_list")]
    pub experience: Option<String>,
    #[serde(serialize_with = "serialize_json_list")]
    pub languages: Option<String>,
    #[serde(serialize_with = "serialize_json_list")]
    pub strengths: Option<String>,
    #[serde(serialize_with = "serialize_json_list")]
    pub weaknesses: Option<String>,
    pub job_match_score: Option<i64>,
    pub job_match_analysis: Option<String>,
    #[serde(serialize_with = "serialize_json_list")]
    pub recommendations: Option<String>,
    pub overall_rating: Option<String>,
    #[serde(serialize_with = "serialize_json_list")]
    pub next_steps: Option<String>,
    #[serde(serialize_with = "serialize_json_text")]
    pub raw_ai_response: Option<String>,
    pub tokens_used: Option<i64>,
    pub cost_estimate: Option<f64>,
    pub error_message: Option<String>,
    pub analyzed_at: Option<String>,
    pub failed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl CvAnalysis {
    pub fn status(&self) -> Option<AnalysisStatus> {
        AnalysisStatus::parse(&self.analysis_status)
    }
}

pub const ANALYSIS_COLUMNS: &str = r#"id, application_id, job_offer_id, analysis_status,
    profile_summary, key_skills, education, experience, languages, strengths, weaknesses,
    job_match_score, job_match_analysis, recommendations, overall_rating, next_steps,
    raw_ai_response, tokens_used, cost_estimate, error_message, analyzed_at, failed_at,
    created_at, updated_at"#;

// ============================================================================
// Parsed provider output
// ============================================================================

/// Result fields read from the provider's JSON object. Missing or mistyped keys
/// become `None` / empty lists; only a non-object payload is rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisOutcome {
    pub profile_summary: Option<String>,
    pub key_skills: Vec<Value>,
    pub education: Vec<Value>,
    pub experience: Vec<Value>,
    pub languages: Vec<Value>,
    pub strengths: Vec<Value>,
    pub weaknesses: Vec<Value>,
    pub job_match_score: Option<i64>,
    pub job_match_analysis: Option<String>,
    pub recommendations: Vec<Value>,
    pub overall_rating: Option<String>,
    pub next_steps: Vec<Value>,
}

fn text_field(object: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Null) | None => None,
        Some(Value::String(_)) => None,
        Some(other) => Some(other.to_string()),
    }
}

fn list_field(object: &serde_json::Map<String, Value>, key: &str) -> Vec<Value> {
    match object.get(key) {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![Value::String(s.clone())],
        _ => Vec::new(),
    }
}

fn score_field(object: &serde_json::Map<String, Value>) -> Option<i64> {
    let raw = match object.get("job_match_score")? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    Some(raw.round().clamp(0.0, 100.0) as i64)
}

/// A single grade letter A-E, optionally followed by `+` or `-`. Words such as
/// "Excellent" are not grades.
fn rating_field(object: &serde_json::Map<String, Value>) -> Option<String> {
    let raw = object.get("overall_rating")?.as_str()?.trim();
    let mut chars = raw.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    let suffix = chars.as_str().trim();

    if !('A'..='E').contains(&letter) || !matches!(suffix, "" | "+" | "-") {
        return None;
    }
    Some(letter.to_string())
}

impl AnalysisOutcome {
    /// Parses the completion content. Anything that is not a JSON object fails
    /// the whole analysis.
    pub fn parse(content: &str) -> Result<(Self, Value), String> {
        let value: Value = serde_json::from_str(content.trim())
            .map_err(|e| format!("Invalid JSON response from AI: {}", e))?;

        let object = value
            .as_object()
            .ok_or_else(|| "Invalid JSON response from AI: expected an object".to_string())?;

        let outcome = AnalysisOutcome {
            profile_summary: text_field(object, "profile_summary"),
            key_skills: list_field(object, "key_skills"),
            education: list_field(object, "education"),
            experience: list_field(object, "experience"),
            languages: list_field(object, "languages"),
            strengths: list_field(object, "strengths"),
            weaknesses: list_field(object, "weaknesses"),
            job_match_score: score_field(object),
            job_match_analysis: text_field(object, "job_match_analysis"),
            recommendations: list_field(object, "recommendations"),
            overall_rating: rating_field(object),
            next_steps: list_field(object, "next_steps"),
        };

        Ok((outcome, value))
    }
}

// ============================================================================
// Requests and reports
// ============================================================================

#[derive(Deserialize, Debug)]
pub struct CreateAnalysisRequest {
    pub application_id: String,
}

#[derive(Deserialize, Debug)]
pub struct AnalyzeTextRequest {
    pub cv_text: String,
    pub cover_letter_text: Option<String>,
    pub job_description: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct TextAnalysisResult {
    pub analysis: Value,
    pub tokens_used: u32,
    pub cost_estimate: f64,
}

#[derive(Deserialize, Debug, Default)]
pub struct AnalysisQuery {
    pub status: Option<String>,
    pub job_offer_id: Option<String>,
    pub rating: Option<String>,
    pub min_score: Option<i64>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Serialize, Debug, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub total: i64,
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
}

#[derive(Serialize, Debug)]
pub struct AnalysisPage {
    pub analyses: Vec<CvAnalysis>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub summary: StatusCounts,
}

#[derive(Serialize, Debug)]
pub struct AnalysisStatistics {
    #[serde(flatten)]
    pub counts: StatusCounts,
    pub average_score: Option<f64>,
    pub total_tokens: i64,
    pub total_cost: f64,
    pub rating_distribution: BTreeMap<String, i64>,
}

#[derive(Serialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

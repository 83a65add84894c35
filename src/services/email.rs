// src/services/email.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::common::safe_email_log;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail transport not configured: {0}")]
    NotConfigured(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Send timed out")]
    Timeout,
}

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

/// Writes the message to the log instead of delivering it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        info!(
            to = %safe_email_log(&email.to),
            subject = %email.subject,
            body_len = email.html_body.len(),
            "Email not delivered (no transport configured)"
        );
        Ok(())
    }
}

pub const SUBMISSION_CONFIRMED_SUBJECT: &str = "✅ Confirmation de réception de votre candidature";
pub const ANALYSIS_COMPLETED_SUBJECT: &str = "🤖 Analyse IA de votre CV terminée";

/// Data rendered into the submission confirmation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionEmailData {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub linkedin_url: Option<String>,
    pub job_title: String,
    pub submitted_at: String,
}

/// Data rendered into the analysis completion notice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisEmailData {
    pub first_name: String,
    pub last_name: String,
    pub job_title: String,
    pub job_match_score: Option<i64>,
    pub overall_rating: Option<String>,
    pub profile_summary: Option<String>,
    pub analyzed_at: String,
}

/// "18/10/2026 à 14:05" from an RFC 3339 timestamp; passes anything else through.
pub fn format_french_datetime(timestamp: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.format("%d/%m/%Y à %H:%M").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

/// Minimal HTML escaping for user-supplied values.
fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const STYLE: &str = r#"
        body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; }
        .container { max-width: 600px; margin: 0 auto; padding: 20px; }
        .header { background-color: #4F46E5; color: white; padding: 20px; text-align: center; }
        .content { padding: 20px; background-color: #f9f9f9; }
        .score { font-size: 28px; font-weight: bold; color: #4F46E5; }
        .footer { padding: 20px; text-align: center; font-size: 12px; color: #666; }
"#;

pub fn generate_submission_confirmed_email(data: &SubmissionEmailData) -> String {
    let linkedin = data
        .linkedin_url
        .as_deref()
        .map(|url| format!("<li>LinkedIn : {}</li>", escape(url)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <style>{}</style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>Candidature reçue</h1>
        </div>
        <div class="content">
            <p>Bonjour {} {},</p>

            <p>Nous avons bien reçu votre candidature pour le poste <strong>{}</strong>.</p>

            <ul>
                <li>Email : {}</li>
                <li>Téléphone : {}</li>
                {}
                <li>Date de soumission : {}</li>
            </ul>

            <p>Votre CV va être analysé. Nous reviendrons vers vous rapidement.</p>

            <p>Cordialement,<br>
            L'équipe recrutement</p>
        </div>
        <div class="footer">
            <p>Ceci est un message automatique, merci de ne pas y répondre.</p>
        </div>
    </div>
</body>
</html>"#,
        STYLE,
        escape(&data.first_name),
        escape(&data.last_name),
        escape(&data.job_title),
        escape(&data.email),
        escape(&data.phone),
        linkedin,
        format_french_datetime(&data.submitted_at),
    )
}

pub fn generate_analysis_completed_email(data: &AnalysisEmailData) -> String {
    let score = data
        .job_match_score
        .map(|s| format!("{}/100", s))
        .unwrap_or_else(|| "non disponible".to_string());
    let rating = data.overall_rating.as_deref().unwrap_or("-");
    let summary = data
        .profile_summary
        .as_deref()
        .map(|s| format!("<p><strong>Résumé du profil :</strong><br>{}</p>", escape(s)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <style>{}</style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>Analyse de votre CV terminée</h1>
        </div>
        <div class="content">
            <p>Bonjour {} {},</p>

            <p>L'analyse de votre candidature pour le poste <strong>{}</strong> est terminée.</p>

            <p>Score d'adéquation : <span class="score">{}</span></p>
            <p>Note globale : <strong>{}</strong></p>

            {}

            <p>Analyse effectuée le {}.</p>

            <p>Cordialement,<br>
            L'équipe recrutement</p>
        </div>
        <div class="footer">
            <p>Ceci est un message automatique, merci de ne pas y répondre.</p>
        </div>
    </div>
</body>
</html>"#,
        STYLE,
        escape(&data.first_name),
        escape(&data.last_name),
        escape(&data.job_title),
        score,
        escape(rating),
        summary,
        format_french_datetime(&data.analyzed_at),
    )
}

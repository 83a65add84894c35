// src/services/notifications.rs
//! Best-effort transactional email keyed off lifecycle events.
//!
//! Delivery failures are logged and dropped; callers never see them.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::common::safe_email_log;
use crate::services::email::{
    generate_analysis_completed_email, generate_submission_confirmed_email, AnalysisEmailData,
    Mailer, OutgoingEmail, SubmissionEmailData, ANALYSIS_COMPLETED_SUBJECT,
    SUBMISSION_CONFIRMED_SUBJECT,
};

const SEND_TIMEOUT: Duration = Duration::from_secs(15);

pub struct NotificationDispatcher {
    mailer: Arc<dyn Mailer>,
}

impl NotificationDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    /// Returns whether the mail transport accepted the message.
    pub async fn submission_confirmed(&self, data: &SubmissionEmailData) -> bool {
        let email = OutgoingEmail {
            to: data.email.clone(),
            subject: SUBMISSION_CONFIRMED_SUBJECT.to_string(),
            html_body: generate_submission_confirmed_email(data),
        };
        self.dispatch("submission_confirmed", email).await
    }

    pub async fn analysis_completed(&self, to: &str, data: &AnalysisEmailData) -> bool {
        let email = OutgoingEmail {
            to: to.to_string(),
            subject: ANALYSIS_COMPLETED_SUBJECT.to_string(),
            html_body: generate_analysis_completed_email(data),
        };
        self.dispatch("analysis_completed", email).await
    }

    async fn dispatch(&self, kind: &str, email: OutgoingEmail) -> bool {
        let recipient = safe_email_log(&email.to);

        match tokio::time::timeout(SEND_TIMEOUT, self.mailer.send(&email)).await {
            Ok(Ok(())) => {
                info!(kind = %kind, to = %recipient, "Notification sent");
                true
            }
            Ok(Err(e)) => {
                warn!(kind = %kind, to = %recipient, error = %e, "Notification failed");
                false
            }
            Err(_) => {
                warn!(kind = %kind, to = %recipient, "Notification timed out");
                false
            }
        }
    }
}

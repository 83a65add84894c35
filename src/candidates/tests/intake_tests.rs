// src/candidates/tests/intake_tests.rs

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use crate::candidates::models::*;
    use crate::common::test_support::{
        count_rows, insert_job_offer, pdf_bytes, FakeProvider, Harness, MemoryBlobStore,
    };
    use crate::common::ApiError;
    use crate::services::email::SUBMISSION_CONFIRMED_SUBJECT;

    fn pdf(name: &str, size: usize) -> UploadedFile {
        UploadedFile {
            file_name: Some(name.to_string()),
            content_type: Some("application/pdf".to_string()),
            data: pdf_bytes(size),
        }
    }

    fn scenario_a() -> Submission {
        Submission {
            first_name: "Jean".to_string(),
            last_name: "Dupont".to_string(),
            email: "jean@x.com".to_string(),
            phone: "0102030405".to_string(),
            linkedin_url: None,
            job_offer_id: "7".to_string(),
            cv_file: Some(pdf("cv.pdf", 2 * 1024 * 1024)),
            cover_letter: Some(pdf("lettre.pdf", 1024 * 1024)),
        }
    }

    #[tokio::test]
    async fn test_valid_submission_creates_pending_application_and_analysis() {
        let harness = Harness::new().await;
        insert_job_offer(&harness.db, "7").await;

        let receipt = harness.state.intake.submit(scenario_a()).await.unwrap();

        assert_eq!(receipt.status, "pending");
        assert!(receipt.notification_sent);
        assert!(receipt.analysis_id.is_some());

        assert_eq!(count_rows(&harness.db, "applications").await, 1);
        assert_eq!(count_rows(&harness.db, "cv_analyses").await, 1);

        let (status, cover): (String, Option<String>) = sqlx::query_as(
            "SELECT status, cover_letter_path FROM applications WHERE id = ?",
        )
        .bind(&receipt.application_id)
        .fetch_one(&harness.db)
        .await
        .unwrap();
        assert_eq!(status, "pending");
        assert!(cover.unwrap().starts_with("cover_letters/"));

        let analysis_status: String =
            sqlx::query_scalar("SELECT analysis_status FROM cv_analyses WHERE id = ?")
                .bind(receipt.analysis_id.as_deref())
                .fetch_one(&harness.db)
                .await
                .unwrap();
        assert_eq!(analysis_status, "pending");

        assert_eq!(harness.storage.len(), 2);
        let sent = harness.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "jean@x.com");
        assert_eq!(sent[0].subject, SUBMISSION_CONFIRMED_SUBJECT);
    }

    #[tokio::test]
    async fn test_text_plain_cv_writes_nothing() {
        let harness = Harness::new().await;
        insert_job_offer(&harness.db, "7").await;

        let mut submission = scenario_a();
        submission.cv_file = Some(UploadedFile {
            file_name: Some("cv.txt".to_string()),
            content_type: Some("text/plain".to_string()),
            data: Bytes::from_static(b"Jean Dupont - CV"),
        });

        let err = harness.state.intake.submit(submission).await.unwrap_err();
        match err {
            ApiError::Validation(result) => assert!(result.has_error("cv_file")),
            other => panic!("expected validation error, got {:?}", other),
        }

        assert_eq!(count_rows(&harness.db, "applications").await, 0);
        assert_eq!(count_rows(&harness.db, "applicants").await, 0);
        assert_eq!(count_rows(&harness.db, "cv_analyses").await, 0);
        assert_eq!(harness.storage.len(), 0);
        assert!(harness.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_missing_field_and_unknown_offer_are_reported_together() {
        let harness = Harness::new().await;

        let mut submission = scenario_a();
        submission.first_name = String::new();
        submission.job_offer_id = "404".to_string();

        let err = harness.state.intake.submit(submission).await.unwrap_err();
        let ApiError::Validation(result) = err else {
            panic!("expected validation error");
        };
        assert!(result.has_error("prenom"));
        assert!(result.has_error("job_offer_id"));
        assert_eq!(count_rows(&harness.db, "applications").await, 0);
        assert_eq!(harness.storage.len(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_live_application_is_rejected() {
        let harness = Harness::new().await;
        insert_job_offer(&harness.db, "7").await;

        harness.state.intake.submit(scenario_a()).await.unwrap();

        let mut again = scenario_a();
        again.email = "JEAN@x.com".to_string();
        let err = harness.state.intake.submit(again).await.unwrap_err();
        let ApiError::Validation(result) = err else {
            panic!("expected validation error");
        };
        assert!(result.has_error("email"));
        assert_eq!(count_rows(&harness.db, "applications").await, 1);
        assert_eq!(harness.storage.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_duplicate_submissions_keep_one_application() {
        let harness = Harness::new().await;
        insert_job_offer(&harness.db, "7").await;

        let (first, second) = tokio::join!(
            harness.state.intake.submit(scenario_a()),
            harness.state.intake.submit(scenario_a())
        );

        let (accepted, refused) = match (first, second) {
            (Ok(receipt), Err(err)) | (Err(err), Ok(receipt)) => (receipt, err),
            (Ok(_), Ok(_)) => panic!("both duplicate submissions were accepted"),
            (Err(a), Err(b)) => panic!("both submissions failed: {} / {}", a, b),
        };
        let ApiError::Validation(result) = refused else {
            panic!("expected validation error, got {}", refused);
        };
        assert!(result.has_error("email"));

        assert_eq!(count_rows(&harness.db, "applications").await, 1);
        assert_eq!(count_rows(&harness.db, "cv_analyses").await, 1);
        // The losing submission's documents are removed
        assert_eq!(harness.storage.len(), 2);
        assert!(accepted.analysis_id.is_some());
    }

    #[tokio::test]
    async fn test_rejected_application_allows_reapplying() {
        let harness = Harness::new().await;
        insert_job_offer(&harness.db, "7").await;

        let first = harness.state.intake.submit(scenario_a()).await.unwrap();
        sqlx::query("UPDATE applications SET status = 'rejected' WHERE id = ?")
            .bind(&first.application_id)
            .execute(&harness.db)
            .await
            .unwrap();

        let mut again = scenario_a();
        again.phone = "0607080910".to_string();
        let second = harness.state.intake.submit(again).await.unwrap();
        assert_eq!(second.applicant_id, first.applicant_id);
        assert_eq!(count_rows(&harness.db, "applicants").await, 1);
        assert_eq!(count_rows(&harness.db, "applications").await, 2);

        // The applicant row is never rewritten by a later submission
        let phone: String = sqlx::query_scalar("SELECT phone FROM applicants WHERE id = ?")
            .bind(&first.applicant_id)
            .fetch_one(&harness.db)
            .await
            .unwrap();
        assert_eq!(phone, "0102030405");
    }

    #[tokio::test]
    async fn test_cover_letter_store_failure_removes_cv_blob() {
        let harness =
            Harness::with(FakeProvider::default(), MemoryBlobStore::failing_after(1)).await;
        insert_job_offer(&harness.db, "7").await;

        let err = harness.state.intake.submit(scenario_a()).await.unwrap_err();
        assert!(matches!(err, ApiError::Storage(_)));
        assert_eq!(harness.storage.len(), 0);
        assert_eq!(count_rows(&harness.db, "applications").await, 0);
    }

    #[tokio::test]
    async fn test_cover_letter_is_optional() {
        let harness = Harness::new().await;
        insert_job_offer(&harness.db, "7").await;

        let mut submission = scenario_a();
        submission.cover_letter = None;
        harness.state.intake.submit(submission).await.unwrap();

        assert_eq!(harness.storage.len(), 1);
        assert!(harness.storage.paths()[0].starts_with("cv_files/"));
    }
}

// src/analyses/tests/handlers_tests.rs

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::analyses::repository;
    use crate::common::test_support::{
        admin_bearer, insert_application, insert_job_offer, user_bearer, Harness,
    };

    async fn send(harness: &Harness, request: Request<Body>) -> (StatusCode, Value) {
        let response = harness.app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn admin(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, admin_bearer());
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn seeded() -> (Harness, String) {
        let harness = Harness::new().await;
        insert_job_offer(&harness.db, "7").await;
        insert_application(&harness.db, "A_1", "7", "pending").await;
        let id = repository::insert_if_absent(&harness.db, "A_1", "7")
            .await
            .unwrap()
            .unwrap();
        (harness, id)
    }

    #[tokio::test]
    async fn test_double_trigger_yields_one_outcome() {
        let (mut harness, id) = seeded().await;
        let uri = format!("/api/cv-analysis/{}/analyze", id);

        let (status, first) = send(&harness, admin("POST", &uri, None)).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(first["data"]["analysis_status"], "processing");

        let (status, second) = send(&harness, admin("POST", &uri, None)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(second["code"], "CONFLICT");

        harness.start_workers();
        assert_eq!(harness.wait_for_terminal(&id).await, "completed");
        assert_eq!(harness.provider.calls(), 1);

        let (status, body) = send(
            &harness,
            admin("GET", &format!("/api/cv-analysis/{}", id), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["job_match_score"], 85);
        assert_eq!(body["data"]["key_skills"][0], "Rust");
        assert_eq!(body["data"]["raw_ai_response"]["overall_rating"], "A");
        assert!(body["data"]["analyzed_at"].is_string());
    }

    #[tokio::test]
    async fn test_create_then_conflict() {
        let harness = Harness::new().await;
        insert_job_offer(&harness.db, "7").await;
        insert_application(&harness.db, "A_1", "7", "pending").await;

        let body = json!({ "application_id": "A_1" });
        let (status, created) =
            send(&harness, admin("POST", "/api/cv-analysis", Some(body.clone()))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["data"]["analysis_status"], "pending");
        assert!(created["data"]["key_skills"].is_null());

        let (status, _) = send(&harness, admin("POST", "/api/cv-analysis", Some(body))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_processing_analysis_cannot_be_deleted() {
        let (harness, id) = seeded().await;
        harness.state.analyses.claim(&id).await.unwrap();

        let uri = format!("/api/cv-analysis/{}", id);
        let (status, _) = send(&harness, admin("DELETE", &uri, None)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(&harness, admin("DELETE", "/api/cv-analysis/CV_nope", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_statistics_and_provider_status() {
        let (harness, _) = seeded().await;

        let (status, body) = send(&harness, admin("GET", "/api/cv-analysis?status=pending", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["data"]["summary"]["pending"], 1);

        let (status, body) = send(&harness, admin("GET", "/api/cv-analysis/statistics", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 1);
        assert!(body["data"]["average_score"].is_null());

        let (status, body) =
            send(&harness, admin("GET", "/api/cv-analysis/provider-status", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["configured"], true);
    }

    #[tokio::test]
    async fn test_batch_runs_in_background() {
        let (harness, id) = seeded().await;

        let (status, body) = send(&harness, admin("POST", "/api/cv-analysis/batch", None)).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["data"]["pending"], 1);

        assert_eq!(harness.wait_for_terminal(&id).await, "completed");
    }

    #[tokio::test]
    async fn test_analysis_routes_are_admin_only() {
        let (harness, _) = seeded().await;

        let request = Request::builder()
            .uri("/api/cv-analysis")
            .header(header::AUTHORIZATION, user_bearer())
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&harness, request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_soft_deleted_application_is_left_alone() {
        let (harness, id) = seeded().await;

        let (status, _) =
            send(&harness, admin("DELETE", "/api/admin/applications/A_1", None)).await;
        assert_eq!(status, StatusCode::OK);

        let uri = format!("/api/cv-analysis/{}/analyze", id);
        let (status, body) = send(&harness, admin("POST", &uri, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");

        let (status, body) = send(&harness, admin("POST", "/api/cv-analysis/batch", None)).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["data"]["pending"], 0);

        let report = harness.state.analyses.sweep_pending().await.unwrap();
        assert_eq!(report.examined, 0);
        assert_eq!(harness.provider.calls(), 0);
        assert!(harness.mailer.sent().is_empty());
    }
}

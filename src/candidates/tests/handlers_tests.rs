// src/candidates/tests/handlers_tests.rs

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::common::test_support::{
        admin_bearer, insert_application, insert_job_offer, pdf_bytes, user_bearer, Harness,
    };

    const BOUNDARY: &str = "cvfilterboundary";

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a str, Vec<u8>),
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(name, file_name, content_type, data) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                            name, file_name, content_type
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(data);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn submission_request(cv_content_type: &str, cv: Vec<u8>) -> Request<Body> {
        let body = multipart_body(&[
            Part::Text("nom", "Dupont"),
            Part::Text("prenom", "Jean"),
            Part::Text("email", "jean@x.com"),
            Part::Text("telephone", "0102030405"),
            Part::Text("job_offer_id", "7"),
            Part::File("cv_file", "cv.pdf", cv_content_type, cv),
            Part::File(
                "lettre_motivation_file",
                "lettre.pdf",
                "application/pdf",
                pdf_bytes(1024 * 1024).to_vec(),
            ),
        ]);

        Request::builder()
            .method("POST")
            .uri("/api/candidates")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn admin_get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, admin_bearer())
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_multipart_submission_is_created() {
        let harness = Harness::new().await;
        insert_job_offer(&harness.db, "7").await;

        let response = harness
            .app()
            .oneshot(submission_request(
                "application/pdf",
                pdf_bytes(2 * 1024 * 1024).to_vec(),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "pending");
        assert!(body["data"]["analysis_id"].is_string());
    }

    #[tokio::test]
    async fn test_text_plain_cv_yields_422_envelope() {
        let harness = Harness::new().await;
        insert_job_offer(&harness.db, "7").await;

        let response = harness
            .app()
            .oneshot(submission_request("text/plain", b"Jean Dupont".to_vec()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["errors"]["cv_file"].is_array());
        assert_eq!(harness.storage.len(), 0);
    }

    #[tokio::test]
    async fn test_admin_routes_require_admin() {
        let harness = Harness::new().await;

        let anonymous = harness
            .app()
            .oneshot(
                Request::builder()
                    .uri("/api/admin/applications")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let viewer = harness
            .app()
            .oneshot(
                Request::builder()
                    .uri("/api/admin/applications")
                    .header(header::AUTHORIZATION, user_bearer())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(viewer.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_list_detail_and_statistics() {
        let harness = Harness::new().await;
        insert_job_offer(&harness.db, "7").await;
        insert_application(&harness.db, "A_1", "7", "pending").await;
        insert_application(&harness.db, "A_2", "7", "rejected").await;

        let response = harness
            .app()
            .oneshot(admin_get("/api/admin/applications?status=pending"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["data"]["applications"][0]["id"], "A_1");
        assert_eq!(body["data"]["applications"][0]["job_title"], "Développeur Backend");

        let detail = json_body(
            harness
                .app()
                .oneshot(admin_get("/api/admin/applications/A_1"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(
            detail["data"]["cv_url"],
            "http://localhost:8080/storage/cv_files/test.pdf"
        );
        assert!(detail["data"]["analyses"].as_array().unwrap().is_empty());

        let stats = json_body(
            harness
                .app()
                .oneshot(admin_get("/api/admin/applications/statistics"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(stats["data"]["total"], 2);
        assert_eq!(stats["data"]["pending"], 1);
        assert_eq!(stats["data"]["rejected"], 1);
        assert_eq!(stats["data"]["this_week"], 2);
    }

    #[tokio::test]
    async fn test_status_update_keeps_analyzed_at_consistent() {
        let harness = Harness::new().await;
        insert_job_offer(&harness.db, "7").await;
        insert_application(&harness.db, "A_1", "7", "pending").await;

        let patch = |status: &str| {
            Request::builder()
                .method("PATCH")
                .uri("/api/admin/applications/A_1/status")
                .header(header::AUTHORIZATION, admin_bearer())
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "status": status, "admin_notes": "Revu" }).to_string(),
                ))
                .unwrap()
        };

        let response = harness.app().oneshot(patch("analyzed")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"]["status"], "analyzed");
        assert!(body["data"]["analyzed_at"].is_string());
        assert_eq!(body["data"]["admin_notes"], "Revu");

        let body = json_body(harness.app().oneshot(patch("rejected")).await.unwrap()).await;
        assert_eq!(body["data"]["status"], "rejected");
        assert!(body["data"]["analyzed_at"].is_null());

        let response = harness.app().oneshot(patch("hired")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_soft_delete_hides_application() {
        let harness = Harness::new().await;
        insert_job_offer(&harness.db, "7").await;
        insert_application(&harness.db, "A_1", "7", "pending").await;

        let response = harness
            .app()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/admin/applications/A_1")
                    .header(header::AUTHORIZATION, admin_bearer())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = harness
            .app()
            .oneshot(admin_get("/api/admin/applications/A_1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let kept: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM applications")
            .fetch_one(&harness.db)
            .await
            .unwrap();
        assert_eq!(kept, 1);
    }

    #[tokio::test]
    async fn test_purge_removes_rows_and_documents() {
        let harness = Harness::new().await;
        insert_job_offer(&harness.db, "7").await;

        let response = harness
            .app()
            .oneshot(submission_request(
                "application/pdf",
                pdf_bytes(4096).to_vec(),
            ))
            .await
            .unwrap();
        let body = json_body(response).await;
        let application_id = body["data"]["application_id"].as_str().unwrap().to_string();
        assert_eq!(harness.storage.len(), 2);

        let response = harness
            .app()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/admin/applications/{}/purge", application_id))
                    .header(header::AUTHORIZATION, admin_bearer())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(harness.storage.len(), 0);
        let analyses: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cv_analyses")
            .fetch_one(&harness.db)
            .await
            .unwrap();
        assert_eq!(analyses, 0);
    }

    #[tokio::test]
    async fn test_file_link_is_404_when_document_missing() {
        let harness = Harness::new().await;
        insert_job_offer(&harness.db, "7").await;
        insert_application(&harness.db, "A_1", "7", "pending").await;

        let response = harness
            .app()
            .oneshot(admin_get("/api/admin/applications/A_1/files/cv"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = harness
            .app()
            .oneshot(admin_get("/api/admin/applications/A_1/files/photo"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

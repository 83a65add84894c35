// Shared fixtures and fakes for unit and router tests

use async_trait::async_trait;
use axum::Router;
use bytes::Bytes;
use jsonwebtoken::{encode, EncodingKey, Header};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::analyses::{spawn_workers, AnalysisQueue, AnalysisService};
use crate::auth::Claims;
use crate::candidates::intake::IntakeService;
use crate::common::config::{AppConfig, AwsSettings, StorageKind, DEFAULT_MAX_UPLOAD_BYTES};
use crate::common::migrations::run_migrations;
use crate::common::{now_rfc3339, AppState};
use crate::jobs::JobOfferCache;
use crate::services::email::{MailError, Mailer, OutgoingEmail};
use crate::services::openai::{
    Completion, CompletionError, CompletionProvider, CompletionRequest, OpenAIConfig,
    ProviderStatus, Usage,
};
use crate::services::storage::{new_blob_path, BlobCategory, BlobStore, StorageError};
use crate::services::{FlatSplitPricing, NotificationDispatcher};

pub const TEST_JWT_SECRET: &str = "test_secret_key";
pub const ADMIN_EMAIL: &str = "rh@example.com";

// ============================================================================
// Database
// ============================================================================

/// Single-connection in-memory pool so every query sees the same database.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    run_migrations(&pool).await.expect("migrations");
    pool
}

pub async fn insert_job_offer(pool: &SqlitePool, id: &str) {
    let now = now_rfc3339();
    sqlx::query(
        r#"INSERT INTO job_offers (
            id, title, offer_type, description, requirements, location, contract_type,
            company_name, experience_level, status, positions_available, created_at, updated_at
        ) VALUES (?, 'Développeur Backend', 'job', 'Services Rust et SQL', '3 ans d''expérience',
                  'Paris', 'CDI', 'Acme', 'senior', 'active', 1, ?, ?)"#,
    )
    .bind(id)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .expect("insert job offer");
}

/// Creates an applicant (one per application) and the application itself.
pub async fn insert_application(pool: &SqlitePool, id: &str, job_offer_id: &str, status: &str) {
    let now = now_rfc3339();
    let applicant_id = format!("C_{}", id);

    sqlx::query(
        r#"INSERT INTO applicants (id, first_name, last_name, email, phone, created_at)
           VALUES (?, 'Jean', 'Dupont', ?, '0102030405', ?)"#,
    )
    .bind(&applicant_id)
    .bind(format!("{}@example.com", id.to_lowercase()))
    .bind(&now)
    .execute(pool)
    .await
    .expect("insert applicant");

    let analyzed_at = (status == "analyzed").then(|| now.clone());
    sqlx::query(
        r#"INSERT INTO applications
           (id, applicant_id, job_offer_id, cv_path, cv_text, status, submitted_at, analyzed_at, updated_at)
           VALUES (?, ?, ?, 'cv_files/test.pdf', 'Ingénieur logiciel, 5 ans de Rust', ?, ?, ?, ?)"#,
    )
    .bind(id)
    .bind(&applicant_id)
    .bind(job_offer_id)
    .bind(status)
    .bind(&now)
    .bind(analyzed_at)
    .bind(&now)
    .execute(pool)
    .await
    .expect("insert application");
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .expect("count rows")
}

/// A buffer that sniffs as PDF, padded to `size` bytes.
pub fn pdf_bytes(size: usize) -> Bytes {
    let header = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n";
    let mut data = Vec::with_capacity(size.max(header.len()));
    data.extend_from_slice(header);
    data.resize(size.max(header.len()), b' ');
    Bytes::from(data)
}

// ============================================================================
// Mailer
// ============================================================================

#[derive(Default)]
pub struct FakeMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail: bool,
}

impl FakeMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::SendFailed("smtp unavailable".to_string()));
        }
        self.sent.lock().expect("mailer lock").push(email.clone());
        Ok(())
    }
}

// ============================================================================
// Completion provider
// ============================================================================

#[derive(Debug, Clone)]
pub enum Reply {
    Content(String),
    Timeout,
    Http(String),
}

pub const GOOD_ANALYSIS: &str = r#"{
    "profile_summary": "Ingénieur backend expérimenté.",
    "key_skills": ["Rust", "SQL", "AWS"],
    "education": [{"degree": "Master", "institution": "INSA Lyon", "year": "2018"}],
    "experience": [{"position": "Backend", "company": "Acme", "duration": "5 ans", "description": "API"}],
    "languages": [{"language": "Anglais", "level": "C1"}],
    "strengths": ["Rigueur"],
    "weaknesses": ["Peu de frontend"],
    "job_match_score": 85,
    "job_match_analysis": "Très bonne adéquation",
    "recommendations": ["Entretien technique"],
    "overall_rating": "A",
    "next_steps": ["Planifier un entretien"]
}"#;

/// Plays scripted replies in order, then repeats `GOOD_ANALYSIS`.
pub struct FakeProvider {
    replies: Mutex<VecDeque<Reply>>,
    calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl CompletionProvider for FakeProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        "gpt-4o-mini"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<Completion, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .replies
            .lock()
            .expect("provider lock")
            .pop_front()
            .unwrap_or_else(|| Reply::Content(GOOD_ANALYSIS.to_string()));

        match next {
            Reply::Content(content) => Ok(Completion {
                content,
                usage: Usage {
                    prompt_tokens: 700,
                    completion_tokens: 300,
                    total_tokens: 1000,
                },
            }),
            Reply::Timeout => Err(CompletionError::Timeout(60)),
            Reply::Http(message) => Err(CompletionError::RequestFailed(message)),
        }
    }

    async fn health_check(&self) -> ProviderStatus {
        ProviderStatus {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            configured: true,
            reachable: true,
            message: "OpenAI API reachable".to_string(),
        }
    }
}

// ============================================================================
// Blob storage
// ============================================================================

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    /// Number of successful stores before every further store fails.
    fail_after: Option<usize>,
    stores: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn failing_after(successful_stores: usize) -> Self {
        Self {
            fail_after: Some(successful_stores),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().map(|b| b.len()).unwrap_or_default()
    }

    pub fn paths(&self) -> Vec<String> {
        self.blobs
            .lock()
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn store(&self, bytes: Bytes, category: BlobCategory) -> Result<String, StorageError> {
        let attempt = self.stores.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.map(|n| attempt >= n).unwrap_or(false) {
            return Err(StorageError::Io("disk full".to_string()));
        }
        let path = new_blob_path(category);
        self.blobs
            .lock()
            .expect("blob lock")
            .insert(path.clone(), bytes.to_vec());
        Ok(path)
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        Ok(self.blobs.lock().expect("blob lock").contains_key(path))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.blobs.lock().expect("blob lock").remove(path);
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("http://localhost:8080/storage/{}", path)
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.blobs
            .lock()
            .expect("blob lock")
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }
}

// ============================================================================
// Application state
// ============================================================================

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        port: 8080,
        cors_origins: vec!["http://localhost:4200".to_string()],
        jwt_secret: TEST_JWT_SECRET.to_string(),
        admin_emails: HashSet::from([ADMIN_EMAIL.to_string()]),
        storage_kind: StorageKind::Local,
        storage_dir: PathBuf::from("./storage"),
        public_base_url: "http://localhost:8080".to_string(),
        max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        openai: OpenAIConfig::default(),
        aws: AwsSettings {
            region: "eu-west-3".to_string(),
            s3_bucket_name: None,
            cloudfront_domain: None,
            ses_from_email: None,
        },
        analysis_workers: 1,
        analysis_queue_size: 8,
        analysis_enqueue_wait: Duration::from_millis(50),
        job_offers_cache_ttl: Duration::from_secs(300),
    }
}

pub struct Harness {
    pub state: Arc<AppState>,
    pub db: SqlitePool,
    pub mailer: Arc<FakeMailer>,
    pub provider: Arc<FakeProvider>,
    pub storage: Arc<MemoryBlobStore>,
    receiver: Option<mpsc::Receiver<String>>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with(FakeProvider::default(), MemoryBlobStore::default()).await
    }

    pub async fn with_provider(provider: FakeProvider) -> Self {
        Self::with(provider, MemoryBlobStore::default()).await
    }

    pub async fn with(provider: FakeProvider, storage: MemoryBlobStore) -> Self {
        let db = test_pool().await;
        let config = Arc::new(test_config());
        let mailer = Arc::new(FakeMailer::default());
        let provider = Arc::new(provider);
        let storage = Arc::new(storage);
        let notifications = Arc::new(NotificationDispatcher::new(mailer.clone()));

        let intake = Arc::new(IntakeService::new(
            db.clone(),
            storage.clone(),
            notifications.clone(),
            config.max_upload_bytes,
        ));
        let analyses = Arc::new(AnalysisService::new(
            db.clone(),
            provider.clone(),
            Arc::new(FlatSplitPricing::default()),
            notifications,
            config.openai.max_tokens,
            config.openai.temperature,
        ));
        let (analysis_queue, receiver) = AnalysisQueue::new(config.analysis_queue_size, config.analysis_enqueue_wait);

        let state = Arc::new(AppState {
            db: db.clone(),
            config: config.clone(),
            storage: storage.clone(),
            provider: provider.clone(),
            intake,
            analyses,
            analysis_queue,
            job_offer_cache: Arc::new(JobOfferCache::new(config.job_offers_cache_ttl)),
        });

        Self {
            state,
            db,
            mailer,
            provider,
            storage,
            receiver: Some(receiver),
        }
    }

    pub fn app(&self) -> Router {
        crate::build_app(self.state.clone())
    }

    /// Queued triggers stay `processing` until this is called.
    pub fn start_workers(&mut self) {
        if let Some(receiver) = self.receiver.take() {
            spawn_workers(self.state.analyses.clone(), receiver, 1);
        }
    }

    /// Polls until the analysis leaves `processing`.
    pub async fn wait_for_terminal(&self, analysis_id: &str) -> String {
        for _ in 0..200 {
            let status: String =
                sqlx::query_scalar("SELECT analysis_status FROM cv_analyses WHERE id = ?")
                    .bind(analysis_id)
                    .fetch_one(&self.db)
                    .await
                    .expect("analysis row");
            if status == "completed" || status == "failed" {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("analysis {} never reached a terminal state", analysis_id);
    }
}

// ============================================================================
// Tokens
// ============================================================================

fn token(sub: &str, email: &str, role: Option<&str>) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        email: Some(email.to_string()),
        role: role.map(String::from),
        exp: 9_999_999_999,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("encode token")
}

pub fn admin_bearer() -> String {
    format!("Bearer {}", token("admin-1", ADMIN_EMAIL, None))
}

pub fn user_bearer() -> String {
    format!("Bearer {}", token("user-1", "someone@example.com", Some("viewer")))
}

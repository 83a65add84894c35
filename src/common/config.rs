// src/common/config.rs
//! Environment-driven configuration, read once at startup

use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::openai::OpenAIConfig;

/// Single canonical upload limit for CVs and cover letters (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageKind {
    Local,
    S3,
}

#[derive(Debug, Clone)]
pub struct AwsSettings {
    pub region: String,
    pub s3_bucket_name: Option<String>,
    pub cloudfront_domain: Option<String>,
    pub ses_from_email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub jwt_secret: String,
    pub admin_emails: HashSet<String>,
    pub storage_kind: StorageKind,
    pub storage_dir: PathBuf,
    pub public_base_url: String,
    pub max_upload_bytes: usize,
    pub openai: OpenAIConfig,
    pub aws: AwsSettings,
    pub analysis_workers: usize,
    pub analysis_queue_size: usize,
    pub analysis_enqueue_wait: Duration,
    pub job_offers_cache_ttl: Duration,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Lowercased, comma-separated list with blanks dropped.
pub fn parse_admin_emails(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl AppConfig {
    pub fn from_env() -> Self {
        let storage_kind = if var_or("STORAGE_TYPE", "local").to_lowercase().starts_with("s3") {
            StorageKind::S3
        } else {
            StorageKind::Local
        };

        let port = parsed_var("PORT", 8080u16);

        Self {
            database_url: var_or("DATABASE_URL", "sqlite://cv_filter.db"),
            port,
            cors_origins: var_or(
                "CORS_ORIGINS",
                "http://localhost:4200,http://localhost:3000",
            )
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect(),
            jwt_secret: var_or("JWT_SECRET", "replace_with_strong_secret"),
            admin_emails: parse_admin_emails(&env::var("ADMIN_EMAILS").unwrap_or_default()),
            storage_kind,
            storage_dir: PathBuf::from(var_or("STORAGE_DIR", "./storage")),
            public_base_url: var_or("PUBLIC_BASE_URL", &format!("http://localhost:{}", port)),
            max_upload_bytes: parsed_var("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            openai: OpenAIConfig {
                api_key: optional_var("OPENAI_API_KEY"),
                base_url: var_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
                model: var_or("OPENAI_MODEL", "gpt-4o-mini"),
                max_tokens: parsed_var("OPENAI_MAX_TOKENS", 2000u32),
                temperature: parsed_var("OPENAI_TEMPERATURE", 0.3f32),
                timeout: Duration::from_secs(parsed_var("OPENAI_TIMEOUT_SECS", 60u64)),
            },
            aws: AwsSettings {
                region: var_or("AWS_REGION", "us-east-1"),
                s3_bucket_name: optional_var("AWS_S3_BUCKET_NAME"),
                cloudfront_domain: optional_var("AWS_CLOUDFRONT_DOMAIN"),
                ses_from_email: optional_var("AWS_SES_FROM_EMAIL"),
            },
            analysis_workers: parsed_var("ANALYSIS_WORKERS", 2usize).max(1),
            analysis_queue_size: parsed_var("ANALYSIS_QUEUE_SIZE", 64usize).max(1),
            analysis_enqueue_wait: Duration::from_millis(parsed_var(
                "ANALYSIS_ENQUEUE_WAIT_MS",
                2000u64,
            )),
            job_offers_cache_ttl: Duration::from_secs(parsed_var(
                "JOB_OFFERS_CACHE_TTL_SECS",
                300u64,
            )),
        }
    }
}

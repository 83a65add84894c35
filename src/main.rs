// src/main.rs
use axum::{extract::Extension, middleware, routing::get, Router};
use dotenv::dotenv;
use serde_json::{json, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::PathBuf;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod analyses;
mod auth;
mod candidates;
mod common;
mod jobs;
mod logging_middleware;
mod services;

// ============================================================================
// COMMON IMPORTS
// ============================================================================

use analyses::{AnalysisQueue, AnalysisService};
use candidates::IntakeService;
use common::config::{AppConfig, StorageKind};
use common::{ApiResponse, AppState};
use jobs::JobOfferCache;
use services::{
    BlobStore, FlatSplitPricing, LocalBlobStore, LogMailer, Mailer, NotificationDispatcher,
    OpenAIService, S3BlobStore, SesMailer,
};

/// GET /health - Liveness plus a database round-trip
async fn health(Extension(state): Extension<Arc<AppState>>) -> ApiResponse<Value> {
    let database = match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&state.db)
        .await
    {
        Ok(_) => "ok",
        Err(e) => {
            warn!(error = %e, "Health check database probe failed");
            "unavailable"
        }
    };

    ApiResponse::ok(
        "Service opérationnel",
        json!({
            "status": "ok",
            "database": database,
            "provider": state.provider.provider_name(),
            "model": state.provider.model(),
        }),
    )
}

// ============================================================================
// ROUTER COMPOSITION
// ============================================================================

pub fn build_app(state: Arc<AppState>) -> Router {
    let origins: Vec<axum::http::HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    Router::new()
        .route("/health", get(health))
        // ====================================================================
        // JOB OFFER ROUTES (Public and Admin)
        // ====================================================================
        .merge(jobs::jobs_routes())
        // ====================================================================
        // CANDIDATE ROUTES (Intake, Admin applications, Stored files)
        // ====================================================================
        .merge(candidates::candidates_routes(state.config.max_upload_bytes))
        // ====================================================================
        // CV ANALYSIS ROUTES (Admin)
        // ====================================================================
        .merge(analyses::analyses_routes())
        // ====================================================================
        // MIDDLEWARE AND LAYERS
        // ====================================================================
        .layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(Extension(state))
        .layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::DELETE,
                    axum::http::Method::PATCH,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                    axum::http::HeaderName::from_static(logging_middleware::REQUEST_ID_HEADER),
                ])
                .allow_credentials(true),
        )
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let config = Arc::new(AppConfig::from_env());
    info!(
        admin_emails = config.admin_emails.len(),
        storage = ?config.storage_kind,
        model = %config.openai.model,
        workers = config.analysis_workers,
        "Configuration loaded"
    );

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    if let Some(path_part) = config.database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }

    let connect_options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await?;

    // Run database migrations
    common::migrations::run_migrations(&pool).await?;

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let storage: Arc<dyn BlobStore> = match config.storage_kind {
        StorageKind::Local => {
            let local = LocalBlobStore::new(&config.storage_dir, &config.public_base_url);
            local.init().await?;
            info!(dir = %config.storage_dir.display(), "Local blob storage initialized");
            Arc::new(local)
        }
        StorageKind::S3 => {
            let s3 = S3BlobStore::from_settings(&config.aws).await?;
            info!("S3 blob storage initialized");
            Arc::new(s3)
        }
    };

    let mailer: Arc<dyn Mailer> = match SesMailer::from_settings(&config.aws).await {
        Ok(ses) => {
            info!("SES mailer initialized");
            Arc::new(ses)
        }
        Err(e) => {
            warn!(error = %e, "SES not configured, emails will only be logged");
            Arc::new(LogMailer)
        }
    };
    let notifications = Arc::new(NotificationDispatcher::new(mailer));

    let provider = Arc::new(OpenAIService::new(config.openai.clone())?);
    if !provider.is_configured() {
        warn!("OPENAI_API_KEY not set, analyses will fail until it is configured");
    }

    let intake = Arc::new(IntakeService::new(
        pool.clone(),
        storage.clone(),
        notifications.clone(),
        config.max_upload_bytes,
    ));

    let analyses = Arc::new(AnalysisService::new(
        pool.clone(),
        provider.clone(),
        Arc::new(FlatSplitPricing::default()),
        notifications,
        config.openai.max_tokens,
        config.openai.temperature,
    ));

    let (analysis_queue, receiver) = AnalysisQueue::new(config.analysis_queue_size, config.analysis_enqueue_wait);
    analyses::spawn_workers(analyses.clone(), receiver, config.analysis_workers);
    info!(workers = config.analysis_workers, "Analysis workers started");

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let state = Arc::new(AppState {
        db: pool,
        config: config.clone(),
        storage,
        provider,
        intake,
        analyses,
        analysis_queue,
        job_offer_cache: Arc::new(JobOfferCache::new(config.job_offers_cache_ttl)),
    });

    let app = build_app(state);

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::analyses::service::AnalysisService;
use crate::analyses::worker::AnalysisQueue;
use crate::candidates::intake::IntakeService;
use crate::common::config::AppConfig;
use crate::jobs::cache::JobOfferCache;
use crate::services::{BlobStore, CompletionProvider};

/// Database pool, collaborators and configuration, handed to every handler
/// through `Extension<Arc<AppState>>`.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn BlobStore>,
    pub provider: Arc<dyn CompletionProvider>,
    pub intake: Arc<IntakeService>,
    pub analyses: Arc<AnalysisService>,
    pub analysis_queue: AnalysisQueue,
    pub job_offer_cache: Arc<JobOfferCache>,
}

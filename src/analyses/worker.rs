// src/analyses/worker.rs
//! Background execution of claimed analyses.
//!
//! HTTP triggers claim the row and hand the id to a bounded queue drained by a
//! fixed pool of tokio tasks. A trigger that cannot queue within the wait
//! releases its claim and reports the queue as unavailable.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::models::CvAnalysis;
use super::service::AnalysisService;
use crate::common::ApiError;

#[derive(Clone)]
pub struct AnalysisQueue {
    sender: mpsc::Sender<String>,
    enqueue_wait: Duration,
}

impl AnalysisQueue {
    pub fn new(capacity: usize, enqueue_wait: Duration) -> (Self, mpsc::Receiver<String>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender,
                enqueue_wait,
            },
            receiver,
        )
    }

    /// Waits up to `enqueue_wait` for room in the queue.
    pub async fn enqueue(&self, analysis_id: String) -> Result<(), &'static str> {
        match self.sender.send_timeout(analysis_id, self.enqueue_wait).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => Err("analysis queue is full"),
            Err(SendTimeoutError::Closed(_)) => Err("analysis queue is closed"),
        }
    }
}

async fn run_one(service: &AnalysisService, analysis_id: &str) {
    match service.run_claimed(analysis_id).await {
        Ok(analysis) => info!(
            analysis_id = %analysis_id,
            status = %analysis.analysis_status,
            "Background analysis finished"
        ),
        Err(e) => error!(analysis_id = %analysis_id, error = %e, "Background analysis errored"),
    }
}

pub fn spawn_workers(
    service: Arc<AnalysisService>,
    receiver: mpsc::Receiver<String>,
    workers: usize,
) -> Vec<JoinHandle<()>> {
    let receiver = Arc::new(Mutex::new(receiver));

    (0..workers.max(1))
        .map(|worker| {
            let service = service.clone();
            let receiver = receiver.clone();
            tokio::spawn(async move {
                loop {
                    let next = receiver.lock().await.recv().await;
                    let Some(analysis_id) = next else {
                        info!(worker, "Analysis queue closed, worker stopping");
                        break;
                    };
                    run_one(&service, &analysis_id).await;
                }
            })
        })
        .collect()
}

/// Claims the analysis and schedules it. The returned record is already
/// `processing`; callers poll it for the outcome.
pub async fn trigger(
    service: &AnalysisService,
    queue: &AnalysisQueue,
    analysis_id: &str,
) -> Result<CvAnalysis, ApiError> {
    let analysis = service.claim(analysis_id).await?;

    if let Err(reason) = queue.enqueue(analysis_id.to_string()).await {
        warn!(analysis_id = %analysis_id, reason = reason, "Analysis not queued, claim released");
        service.release(analysis_id).await?;
        return Err(ApiError::ServiceUnavailable(format!(
            "Analysis could not be scheduled: {}",
            reason
        )));
    }

    Ok(analysis)
}

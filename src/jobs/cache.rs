// src/jobs/cache.rs
//! Memoized public job-offer listing: one key, fixed TTL, explicit invalidation.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use super::models::JobOffer;
use crate::common::{now_rfc3339, ApiError};

struct CachedOffers {
    offers: Arc<Vec<JobOffer>>,
    stored_at: Instant,
    cached_at: String,
}

pub struct CacheLookup {
    pub offers: Arc<Vec<JobOffer>>,
    pub hit: bool,
    pub cached_at: String,
}

pub struct JobOfferCache {
    ttl: Duration,
    entry: RwLock<Option<CachedOffers>>,
}

impl JobOfferCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: RwLock::new(None),
        }
    }

    /// Serves the cached list while it is fresh, otherwise runs `load` and stores
    /// the result. Concurrent misses may both load; the last write wins.
    pub async fn get_or_load<F, Fut>(&self, load: F) -> Result<CacheLookup, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<JobOffer>, ApiError>>,
    {
        {
            let entry = self.entry.read().await;
            if let Some(cached) = entry.as_ref() {
                if cached.stored_at.elapsed() < self.ttl {
                    return Ok(CacheLookup {
                        offers: cached.offers.clone(),
                        hit: true,
                        cached_at: cached.cached_at.clone(),
                    });
                }
            }
        }

        let offers = Arc::new(load().await?);
        let cached_at = now_rfc3339();

        *self.entry.write().await = Some(CachedOffers {
            offers: offers.clone(),
            stored_at: Instant::now(),
            cached_at: cached_at.clone(),
        });
        debug!(count = offers.len(), "Public job offers cached");

        Ok(CacheLookup {
            offers,
            hit: false,
            cached_at,
        })
    }

    pub async fn invalidate(&self) {
        *self.entry.write().await = None;
        debug!("Public job offers cache cleared");
    }
}

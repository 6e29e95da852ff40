//! In-memory counter store
//!
//! Holds counters behind one write lock so check-and-increment is atomic
//! within the process. Expired windows are swept periodically.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::rate_limit::{CounterStore, RateLimitDecision, UsageCounter};
use crate::domain::DomainError;

#[derive(Debug)]
pub struct InMemoryCounterStore {
    counters: Arc<RwLock<HashMap<String, UsageCounter>>>,
    cleanup_interval: Duration,
    last_cleanup: Arc<RwLock<Instant>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(RwLock::new(HashMap::new())),
            cleanup_interval: Duration::from_secs(300),
            last_cleanup: Arc::new(RwLock::new(Instant::now())),
        }
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub async fn len(&self) -> usize {
        self.counters.read().await.len()
    }

    async fn maybe_cleanup(&self, now: DateTime<Utc>) {
        let should_cleanup = {
            let last = self.last_cleanup.read().await;
            last.elapsed() >= self.cleanup_interval
        };

        if should_cleanup {
            let mut last = self.last_cleanup.write().await;
            *last = Instant::now();

            let mut counters = self.counters.write().await;
            counters.retain(|_, counter| !counter.is_expired(now));
        }
    }
}

impl Default for InMemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn check_and_increment(
        &self,
        key: &str,
        limit: u32,
        period: Duration,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, DomainError> {
        self.maybe_cleanup(now).await;

        let mut counters = self.counters.write().await;
        let admission = UsageCounter::admit(counters.get(key).copied(), now, limit, period);

        if let Some(updated) = admission.updated {
            counters.insert(key.to_string(), updated);
        }

        Ok(admission.decision)
    }

    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<UsageCounter>, DomainError> {
        let counters = self.counters.read().await;
        Ok(counters
            .get(key)
            .copied()
            .filter(|counter| !counter.is_expired(now)))
    }

    async fn reset(&self, key: &str) -> Result<bool, DomainError> {
        let mut counters = self.counters.write().await;
        Ok(counters.remove(key).is_some())
    }
}

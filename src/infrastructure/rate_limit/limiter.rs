//! Per-identity admission control

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::domain::rate_limit::{Clock, CounterStore, RateLimitDecision, SystemClock, UsageCounter};
use crate::domain::DomainError;

/// Fixed-window rate limiter keyed by identity id
#[derive(Debug, Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn CounterStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn counter_key(identity_id: &str) -> String {
        format!("ratelimit:{}", identity_id)
    }

    /// Admit or deny one request for `identity_id`
    pub async fn check(
        &self,
        identity_id: &str,
        limit: u32,
        period_secs: u64,
    ) -> Result<RateLimitDecision, DomainError> {
        let decision = self
            .store
            .check_and_increment(
                &Self::counter_key(identity_id),
                limit,
                Duration::from_secs(period_secs),
                self.clock.now(),
            )
            .await?;

        debug!(
            identity_id = %identity_id,
            allowed = decision.allowed,
            remaining = decision.remaining,
            "Rate limit checked"
        );

        Ok(decision)
    }

    /// Current usage for `identity_id`, if a window is open
    pub async fn usage(&self, identity_id: &str) -> Result<Option<UsageCounter>, DomainError> {
        self.store
            .get(&Self::counter_key(identity_id), self.clock.now())
            .await
    }

    /// Clear the counter for `identity_id`; returns whether one existed
    pub async fn reset(&self, identity_id: &str) -> Result<bool, DomainError> {
        self.store.reset(&Self::counter_key(identity_id)).await
    }
}

//! Counter store trait

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::counter::{RateLimitDecision, UsageCounter};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Shared storage for usage counters
///
/// Implementations must make `check_and_increment` atomic per key so that
/// concurrent requests for one identity never lose an update.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CounterStore: Send + Sync + Debug {
    /// Evaluate one request for `key` and, if admitted, count it.
    ///
    /// Admitted writes expire from the store after `period`.
    async fn check_and_increment(
        &self,
        key: &str,
        limit: u32,
        period: Duration,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, DomainError>;

    /// Read the live counter for `key`, if any
    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<UsageCounter>, DomainError>;

    /// Drop the counter for `key`; returns whether one existed
    async fn reset(&self, key: &str) -> Result<bool, DomainError>;
}

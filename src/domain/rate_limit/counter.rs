//! Fixed-window usage counter
//!
//! One record per identity holds `{count, reset_at}`. The window resets
//! lazily: a read that finds `now > reset_at` treats the record as a fresh
//! window starting at `now`. Because the whole window resets at once, a
//! caller can spend up to twice the limit across a boundary.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-identity usage within the current window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageCounter {
    pub count: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub reset_at: DateTime<Utc>,
}

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests left in the window once this one is counted
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

/// Decision plus the counter to persist, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub decision: RateLimitDecision,
    /// `None` when the request was denied; denied checks write nothing
    pub updated: Option<UsageCounter>,
}

impl UsageCounter {
    /// A new, empty window starting at `now`
    pub fn fresh(now: DateTime<Utc>, period: Duration) -> Self {
        Self {
            count: 0,
            reset_at: now + window_length(period),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.reset_at
    }

    /// Evaluate one request against the stored counter
    pub fn admit(
        current: Option<Self>,
        now: DateTime<Utc>,
        limit: u32,
        period: Duration,
    ) -> Admission {
        let counter = match current {
            Some(counter) if !counter.is_expired(now) => counter,
            _ => Self::fresh(now, period),
        };

        let allowed = counter.count < limit;
        let remaining = limit.saturating_sub(counter.count).saturating_sub(1);

        let updated = allowed.then(|| Self {
            count: counter.count + 1,
            reset_at: counter.reset_at,
        });

        Admission {
            decision: RateLimitDecision {
                allowed,
                remaining,
                reset_at: counter.reset_at,
            },
            updated,
        }
    }
}

fn window_length(period: Duration) -> chrono::Duration {
    chrono::Duration::milliseconds(period.as_millis().min(i64::MAX as u128) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_first_request_opens_window() {
        let now = Utc::now();
        let admission = UsageCounter::admit(None, now, 10, HOUR);

        assert!(admission.decision.allowed);
        assert_eq!(admission.decision.remaining, 9);
        assert_eq!(admission.decision.reset_at, now + chrono::Duration::seconds(3600));
        assert_eq!(admission.updated.map(|c| c.count), Some(1));
    }

    #[test]
    fn test_last_request_leaves_zero_remaining() {
        let now = Utc::now();
        let counter = UsageCounter {
            count: 9,
            reset_at: now + chrono::Duration::seconds(60),
        };

        let admission = UsageCounter::admit(Some(counter), now, 10, HOUR);

        assert!(admission.decision.allowed);
        assert_eq!(admission.decision.remaining, 0);
        assert_eq!(admission.updated.map(|c| c.count), Some(10));
    }

    #[test]
    fn test_denied_request_writes_nothing() {
        let now = Utc::now();
        let counter = UsageCounter {
            count: 10,
            reset_at: now + chrono::Duration::seconds(60),
        };

        let admission = UsageCounter::admit(Some(counter), now, 10, HOUR);

        assert!(!admission.decision.allowed);
        assert_eq!(admission.decision.remaining, 0);
        assert_eq!(admission.decision.reset_at, counter.reset_at);
        assert!(admission.updated.is_none());
    }

    #[test]
    fn test_expired_window_resets() {
        let now = Utc::now();
        let counter = UsageCounter {
            count: 10,
            reset_at: now - chrono::Duration::seconds(1),
        };

        let admission = UsageCounter::admit(Some(counter), now, 10, HOUR);

        assert!(admission.decision.allowed);
        assert_eq!(admission.decision.remaining, 9);
        assert!(admission.decision.reset_at > now);
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let now = Utc::now();
        let counter = UsageCounter {
            count: 10,
            reset_at: now,
        };

        // now == reset_at is still inside the window
        let admission = UsageCounter::admit(Some(counter), now, 10, HOUR);
        assert!(!admission.decision.allowed);
    }

    #[test]
    fn test_zero_limit_denies() {
        let admission = UsageCounter::admit(None, Utc::now(), 0, HOUR);

        assert!(!admission.decision.allowed);
        assert_eq!(admission.decision.remaining, 0);
    }

    #[test]
    fn test_counter_serializes_millis() {
        let reset_at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let counter = UsageCounter { count: 3, reset_at };

        let json = serde_json::to_value(counter).unwrap();
        assert_eq!(json, serde_json::json!({"count": 3, "resetAt": 1_700_000_000_123i64}));
    }
}

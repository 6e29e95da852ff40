//! Redis counter store
//!
//! The read, reset and increment run inside one Lua script so concurrent
//! gateway instances cannot lose updates for the same identity.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

use crate::domain::rate_limit::{CounterStore, RateLimitDecision, UsageCounter};
use crate::domain::DomainError;
use crate::infrastructure::store::RedisStoreConfig;

const CHECK_AND_INCREMENT: &str = r#"
local limit = tonumber(ARGV[1])
local period_ms = tonumber(ARGV[2])
local now_ms = tonumber(ARGV[3])

local count = 0
local reset_at = now_ms + period_ms
local stored = redis.call('HMGET', KEYS[1], 'count', 'reset_at')
if stored[1] and stored[2] then
  local stored_reset = tonumber(stored[2])
  if now_ms <= stored_reset then
    count = tonumber(stored[1])
    reset_at = stored_reset
  end
end

local allowed = 0
if count < limit then
  allowed = 1
end

local remaining = limit - count - 1
if remaining < 0 then
  remaining = 0
end

if allowed == 1 then
  redis.call('HSET', KEYS[1], 'count', count + 1, 'reset_at', reset_at)
  redis.call('PEXPIRE', KEYS[1], period_ms)
end

return {allowed, remaining, reset_at}
"#;

#[derive(Clone)]
pub struct RedisCounterStore {
    connection: ConnectionManager,
    config: RedisStoreConfig,
    script: Script,
}

impl fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCounterStore")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisCounterStore {
    pub fn with_connection(connection: ConnectionManager, config: RedisStoreConfig) -> Self {
        Self {
            connection,
            config,
            script: Script::new(CHECK_AND_INCREMENT),
        }
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn check_and_increment(
        &self,
        key: &str,
        limit: u32,
        period: Duration,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, DomainError> {
        let prefixed_key = self.config.prefix_key(key);
        let mut conn = self.connection.clone();

        let (allowed, remaining, reset_at_ms): (i64, i64, i64) = self
            .script
            .key(&prefixed_key)
            .arg(limit)
            .arg(period.as_millis().max(1) as u64)
            .arg(now.timestamp_millis())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                DomainError::storage(format!("Failed to update counter '{}': {}", key, e))
            })?;

        let reset_at = DateTime::from_timestamp_millis(reset_at_ms).ok_or_else(|| {
            DomainError::storage(format!("Counter '{}' has an invalid reset time", key))
        })?;

        Ok(RateLimitDecision {
            allowed: allowed == 1,
            remaining: remaining.max(0) as u32,
            reset_at,
        })
    }

    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<UsageCounter>, DomainError> {
        let prefixed_key = self.config.prefix_key(key);
        let mut conn = self.connection.clone();

        let (count, reset_at_ms): (Option<u32>, Option<i64>) = conn
            .hget(&prefixed_key, &["count", "reset_at"])
            .await
            .map_err(|e| DomainError::storage(format!("Failed to read counter '{}': {}", key, e)))?;

        let counter = match (count, reset_at_ms.and_then(DateTime::from_timestamp_millis)) {
            (Some(count), Some(reset_at)) => Some(UsageCounter { count, reset_at }),
            _ => None,
        };

        Ok(counter.filter(|counter| !counter.is_expired(now)))
    }

    async fn reset(&self, key: &str) -> Result<bool, DomainError> {
        let prefixed_key = self.config.prefix_key(key);
        let mut conn = self.connection.clone();

        let deleted: i32 = conn.del(&prefixed_key).await.map_err(|e| {
            DomainError::storage(format!("Failed to reset counter '{}': {}", key, e))
        })?;

        Ok(deleted > 0)
    }
}

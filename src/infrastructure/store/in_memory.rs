//! In-memory key-value store using moka

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use moka::ops::compute::{CompResult, Op};

use crate::domain::store::KeyValueStore;
use crate::domain::DomainError;

/// Configuration for the in-memory store
#[derive(Debug, Clone, Default)]
pub struct InMemoryStoreConfig {
    /// Maximum number of entries; `None` keeps everything
    pub max_capacity: Option<u64>,
}

impl InMemoryStoreConfig {
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }
}

#[derive(Debug, Clone)]
struct StoredValue {
    data: String,
    /// Expiration timestamp (millis since epoch), `None` for no expiry
    expires_at: Option<u64>,
}

impl StoredValue {
    fn new(data: &str, ttl: Option<Duration>) -> Self {
        Self {
            data: data.to_string(),
            expires_at: ttl.map(|ttl| current_time_millis() + ttl.as_millis() as u64),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| current_time_millis() > expires_at)
    }
}

fn current_time_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Process-local store, lost on restart
#[derive(Debug)]
pub struct InMemoryStore {
    entries: MokaCache<String, StoredValue>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_config(InMemoryStoreConfig::default())
    }

    pub fn with_config(config: InMemoryStoreConfig) -> Self {
        let mut builder = MokaCache::builder();

        if let Some(capacity) = config.max_capacity {
            builder = builder.max_capacity(capacity);
        }

        Self {
            entries: builder.build(),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        match self.entries.get(key).await {
            Some(entry) if entry.is_expired() => {
                self.entries.remove(key).await;
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.data)),
            None => Ok(None),
        }
    }

    async fn set_raw(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), DomainError> {
        self.entries
            .insert(key.to_string(), StoredValue::new(value, ttl))
            .await;
        Ok(())
    }

    async fn set_nx_raw(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, DomainError> {
        let candidate = StoredValue::new(value, ttl);

        // Compute runs under the per-key lock, so two writers cannot both win
        let result = self
            .entries
            .entry(key.to_string())
            .and_compute_with(|existing| {
                let occupied = existing.is_some_and(|entry| !entry.value().is_expired());
                async move {
                    if occupied {
                        Op::Nop
                    } else {
                        Op::Put(candidate)
                    }
                }
            })
            .await;

        Ok(matches!(
            result,
            CompResult::Inserted(_) | CompResult::ReplacedWith(_)
        ))
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let removed = self.entries.remove(key).await;
        Ok(removed.is_some_and(|entry| !entry.is_expired()))
    }
}

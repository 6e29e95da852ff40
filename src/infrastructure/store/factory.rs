//! Store factory for runtime backend selection

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::domain::rate_limit::CounterStore;
use crate::domain::store::KeyValueStore;
use crate::domain::DomainError;
use crate::infrastructure::rate_limit::{InMemoryCounterStore, RedisCounterStore};

use super::in_memory::InMemoryStore;
use super::redis::{connect, RedisStore, RedisStoreConfig};

/// Supported store backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local, lost on restart
    #[default]
    Memory,
    Redis,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Memory => write!(f, "memory"),
            StoreBackend::Redis => write!(f, "redis"),
        }
    }
}

/// Configuration for store creation
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Redis URL (required for the Redis backend)
    pub redis_url: Option<String>,
    /// Key prefix for namespacing
    pub key_prefix: Option<String>,
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            backend: StoreBackend::Redis,
            redis_url: Some(url.into()),
            key_prefix: None,
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }
}

/// The two shared stores the gateway needs
#[derive(Debug, Clone)]
pub struct Stores {
    pub records: Arc<dyn KeyValueStore>,
    pub counters: Arc<dyn CounterStore>,
}

/// Factory for creating store instances
#[derive(Debug, Default)]
pub struct StoreFactory;

impl StoreFactory {
    pub fn new() -> Self {
        Self
    }

    /// Creates both stores on the configured backend
    pub async fn create(&self, config: &StoreConfig) -> Result<Stores, DomainError> {
        match config.backend {
            StoreBackend::Memory => Ok(Self::create_in_memory()),
            StoreBackend::Redis => {
                let url = config.redis_url.clone().ok_or_else(|| {
                    DomainError::configuration("Redis URL is required for the redis store backend")
                })?;

                let mut redis_config = RedisStoreConfig::new(url);
                if let Some(prefix) = &config.key_prefix {
                    redis_config = redis_config.with_key_prefix(prefix.clone());
                }

                let connection = connect(&redis_config.url).await?;
                info!("Connected to Redis store");

                Ok(Stores {
                    records: Arc::new(RedisStore::with_connection(
                        connection.clone(),
                        redis_config.clone(),
                    )),
                    counters: Arc::new(RedisCounterStore::with_connection(
                        connection,
                        redis_config,
                    )),
                })
            }
        }
    }

    pub fn create_in_memory() -> Stores {
        Stores {
            records: Arc::new(InMemoryStore::new()),
            counters: Arc::new(InMemoryCounterStore::new()),
        }
    }
}

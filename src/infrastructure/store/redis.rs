//! Redis key-value store

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::domain::store::KeyValueStore;
use crate::domain::DomainError;

/// Configuration for the Redis store
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Key prefix for namespacing
    pub key_prefix: Option<String>,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
        }
    }
}

impl RedisStoreConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub(crate) fn prefix_key(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }
}

/// Opens a managed connection shared by the Redis-backed stores
pub async fn connect(url: &str) -> Result<ConnectionManager, DomainError> {
    let client = Client::open(url)
        .map_err(|e| DomainError::storage(format!("Failed to create Redis client: {}", e)))?;

    ConnectionManager::new(client)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to connect to Redis: {}", e)))
}

/// Redis-backed credential record store
///
/// Records written without a TTL persist until deleted; `set_nx_raw` maps
/// onto `SET NX` so uniqueness holds across gateway instances.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    config: RedisStoreConfig,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisStore {
    pub async fn new(config: RedisStoreConfig) -> Result<Self, DomainError> {
        let connection = connect(&config.url).await?;
        Ok(Self::with_connection(connection, config))
    }

    pub fn with_connection(connection: ConnectionManager, config: RedisStoreConfig) -> Self {
        Self { connection, config }
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        let prefixed_key = self.config.prefix_key(key);
        let mut conn = self.connection.clone();

        conn.get(&prefixed_key)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get key '{}': {}", key, e)))
    }

    async fn set_raw(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), DomainError> {
        let prefixed_key = self.config.prefix_key(key);
        let mut conn = self.connection.clone();

        let result: redis::RedisResult<()> = match ttl {
            Some(ttl) => conn.set_ex(&prefixed_key, value, ttl.as_secs().max(1)).await,
            None => conn.set(&prefixed_key, value).await,
        };

        result.map_err(|e| DomainError::storage(format!("Failed to set key '{}': {}", key, e)))
    }

    async fn set_nx_raw(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, DomainError> {
        let prefixed_key = self.config.prefix_key(key);
        let mut conn = self.connection.clone();

        let mut cmd = redis::cmd("SET");
        cmd.arg(&prefixed_key).arg(value).arg("NX");
        if let Some(ttl) = ttl {
            cmd.arg("EX").arg(ttl.as_secs().max(1));
        }

        // "OK" if written, nil if the key already existed
        let result: Option<String> = cmd.query_async(&mut conn).await.map_err(|e| {
            DomainError::storage(format!("Failed to set_nx key '{}': {}", key, e))
        })?;

        Ok(result.is_some())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let prefixed_key = self.config.prefix_key(key);
        let mut conn = self.connection.clone();

        let deleted: i32 = conn.del(&prefixed_key).await.map_err(|e| {
            DomainError::storage(format!("Failed to delete key '{}': {}", key, e))
        })?;

        Ok(deleted > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        let prefixed_key = self.config.prefix_key(key);
        let mut conn = self.connection.clone();

        conn.exists(&prefixed_key).await.map_err(|e| {
            DomainError::storage(format!("Failed to check existence of key '{}': {}", key, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::store::KeyValueStoreExt;

    fn get_test_config() -> RedisStoreConfig {
        RedisStoreConfig::new("redis://127.0.0.1:6379").with_key_prefix("mcp-test")
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_set_and_get() {
        let store = RedisStore::new(get_test_config()).await.unwrap();

        store.set("key1", &"value1", None).await.unwrap();

        let result: Option<String> = store.get("key1").await.unwrap();
        assert_eq!(result, Some("value1".to_string()));

        store.delete("key1").await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_set_nx() {
        let store = RedisStore::new(get_test_config()).await.unwrap();

        assert!(store.set_nx("nx_key", &"value1", None).await.unwrap());
        assert!(!store.set_nx("nx_key", &"value2", None).await.unwrap());

        store.delete("nx_key").await.unwrap();
    }

    #[test]
    fn test_key_prefix() {
        let config = RedisStoreConfig::new("redis://localhost").with_key_prefix("mcp");

        assert_eq!(config.prefix_key("user:abc"), "mcp:user:abc");
        assert_eq!(RedisStoreConfig::default().prefix_key("user:abc"), "user:abc");
    }
}

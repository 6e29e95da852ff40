//! Key-value store trait definition

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::domain::DomainError;

/// Durable key-value store backing the credential records
///
/// Values are JSON strings so the trait stays dyn-compatible; typed access
/// goes through [`KeyValueStoreExt`]. A `ttl` of `None` keeps the entry
/// until it is deleted.
#[async_trait]
pub trait KeyValueStore: Send + Sync + Debug {
    /// Gets a raw value
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Sets a raw value, replacing any existing one
    async fn set_raw(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), DomainError>;

    /// Sets a raw value only if the key is absent; returns whether it was written
    async fn set_nx_raw(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, DomainError>;

    /// Deletes a key; returns whether it existed
    async fn delete(&self, key: &str) -> Result<bool, DomainError>;

    /// Checks if a key exists
    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.get_raw(key).await?.is_some())
    }
}

/// Extension trait providing typed get/set operations
pub trait KeyValueStoreExt: KeyValueStore {
    /// Gets a typed value
    fn get<'a, V>(
        &'a self,
        key: &'a str,
    ) -> impl std::future::Future<Output = Result<Option<V>, DomainError>> + Send
    where
        V: DeserializeOwned + Send,
    {
        async move {
            match self.get_raw(key).await? {
                Some(data) => {
                    let value: V = serde_json::from_str(&data).map_err(|e| {
                        DomainError::storage(format!("Failed to deserialize value for '{}': {}", key, e))
                    })?;
                    Ok(Some(value))
                }
                None => Ok(None),
            }
        }
    }

    /// Sets a typed value
    fn set<'a, V>(
        &'a self,
        key: &'a str,
        value: &'a V,
        ttl: Option<Duration>,
    ) -> impl std::future::Future<Output = Result<(), DomainError>> + Send
    where
        V: Serialize + Send + Sync,
    {
        async move {
            let data = serde_json::to_string(value).map_err(|e| {
                DomainError::storage(format!("Failed to serialize value for '{}': {}", key, e))
            })?;
            self.set_raw(key, &data, ttl).await
        }
    }

    /// Sets a typed value only if the key is absent
    fn set_nx<'a, V>(
        &'a self,
        key: &'a str,
        value: &'a V,
        ttl: Option<Duration>,
    ) -> impl std::future::Future<Output = Result<bool, DomainError>> + Send
    where
        V: Serialize + Send + Sync,
    {
        async move {
            let data = serde_json::to_string(value).map_err(|e| {
                DomainError::storage(format!("Failed to serialize value for '{}': {}", key, e))
            })?;
            self.set_nx_raw(key, &data, ttl).await
        }
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStoreExt for T {}

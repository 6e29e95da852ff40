//! Credential resolution strategy

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt::Debug;

use super::entity::Identity;
use crate::domain::DomainError;

/// Which resolver a deployment runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResolverStrategy {
    /// Look credentials up in the durable store
    #[default]
    Store,
    /// Infer the tier from the credential prefix without any store access
    Prefix,
}

impl std::fmt::Display for ResolverStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store => write!(f, "store"),
            Self::Prefix => write!(f, "prefix"),
        }
    }
}

/// Maps a bearer credential to the identity it was issued to.
///
/// Unknown or malformed credentials resolve to `Ok(None)`; errors are reserved
/// for store failures.
#[async_trait]
pub trait CredentialResolver: Send + Sync + Debug {
    async fn resolve(&self, credential: &str) -> Result<Option<Identity>, DomainError>;

    fn strategy(&self) -> ResolverStrategy;
}

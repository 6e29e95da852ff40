//! Credential resolvers

use std::sync::Arc;

use async_trait::async_trait;

use super::generator::{hash_credential, hash_digest};
use crate::domain::identity::{
    CredentialKind, CredentialResolver, Identity, IdentityId, IdentityRepository,
    ResolverStrategy,
};
use crate::domain::DomainError;

/// Resolves credentials through the durable identity store
#[derive(Debug, Clone)]
pub struct StoreBackedResolver {
    repository: Arc<dyn IdentityRepository>,
}

impl StoreBackedResolver {
    pub fn new(repository: Arc<dyn IdentityRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl CredentialResolver for StoreBackedResolver {
    async fn resolve(&self, credential: &str) -> Result<Option<Identity>, DomainError> {
        // Nothing this gateway issued lacks a known prefix
        if CredentialKind::detect(credential).is_none() {
            return Ok(None);
        }

        self.repository
            .get_by_credential_hash(&hash_credential(credential))
            .await
    }

    fn strategy(&self) -> ResolverStrategy {
        ResolverStrategy::Store
    }
}

/// Infers the identity from the credential prefix alone.
///
/// Any well-formed credential is accepted. The identity id is derived from
/// the credential hash so quota still tracks per credential. Only suitable
/// for local or demo deployments without a durable store.
#[derive(Debug, Clone, Default)]
pub struct PrefixHeuristicResolver;

impl PrefixHeuristicResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CredentialResolver for PrefixHeuristicResolver {
    async fn resolve(&self, credential: &str) -> Result<Option<Identity>, DomainError> {
        let Some(kind) = CredentialKind::detect(credential) else {
            return Ok(None);
        };

        let hash = hash_credential(credential);
        let label = match kind {
            CredentialKind::Anonymous => "anon",
            CredentialKind::Registered => "user",
        };
        let digest: String = hash_digest(&hash).chars().take(16).collect();
        let display_prefix: String = credential.chars().take(kind.prefix().len() + 8).collect();

        Ok(Some(Identity::inferred(
            IdentityId::new(format!("{}-{}", label, digest)),
            kind,
            display_prefix,
            hash,
        )))
    }

    fn strategy(&self) -> ResolverStrategy {
        ResolverStrategy::Prefix
    }
}

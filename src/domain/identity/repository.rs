//! Identity repository trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{Identity, IdentityId};
use crate::domain::DomainError;

/// Durable storage for identities and their credential records
#[async_trait]
pub trait IdentityRepository: Send + Sync + Debug {
    /// Persist a new identity together with its credential record.
    ///
    /// Fails with `Conflict` if the credential hash is already recorded.
    async fn create(&self, identity: Identity) -> Result<Identity, DomainError>;

    /// Get an identity by its ID
    async fn get(&self, id: &IdentityId) -> Result<Option<Identity>, DomainError>;

    /// Get the identity owning a credential, by credential hash
    async fn get_by_credential_hash(&self, hash: &str) -> Result<Option<Identity>, DomainError>;

    /// Get the most recently registered identity for an email address
    async fn get_by_email(&self, email: &str) -> Result<Option<Identity>, DomainError>;
}

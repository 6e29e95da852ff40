//! Identity repository on top of the key-value store
//!
//! Layout:
//! - `user:<id>` holds the identity record
//! - `apikey:<hash>` maps a credential hash to the identity id
//! - `email:<address>` maps a lowercased email to the latest identity id

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::identity::{Identity, IdentityId, IdentityRepository};
use crate::domain::store::{KeyValueStore, KeyValueStoreExt};
use crate::domain::DomainError;

#[derive(Debug, Clone)]
pub struct StoreIdentityRepository {
    store: Arc<dyn KeyValueStore>,
}

impl StoreIdentityRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn user_key(id: &IdentityId) -> String {
        format!("user:{}", id)
    }

    fn credential_key(hash: &str) -> String {
        format!("apikey:{}", hash)
    }

    fn email_key(email: &str) -> String {
        format!("email:{}", email.to_lowercase())
    }

    async fn get_by_index(&self, index_key: &str) -> Result<Option<Identity>, DomainError> {
        match self.store.get::<IdentityId>(index_key).await? {
            Some(id) => self.get(&id).await,
            None => Ok(None),
        }
    }
}

#[async_trait]
impl IdentityRepository for StoreIdentityRepository {
    async fn create(&self, identity: Identity) -> Result<Identity, DomainError> {
        let user_key = Self::user_key(identity.id());

        if !self.store.set_nx(&user_key, &identity, None).await? {
            return Err(DomainError::conflict(format!(
                "Identity '{}' already exists",
                identity.id()
            )));
        }

        let credential_key = Self::credential_key(identity.credential_hash());
        let claimed = match self.store.set_nx(&credential_key, identity.id(), None).await {
            Ok(claimed) => claimed,
            Err(e) => {
                self.store.delete(&user_key).await?;
                return Err(e);
            }
        };

        if !claimed {
            self.store.delete(&user_key).await?;
            return Err(DomainError::conflict("Credential already issued"));
        }

        if let Some(email) = identity.email() {
            // The index is a lookup aid; the identity is already live without it
            if let Err(e) = self
                .store
                .set(&Self::email_key(email), identity.id(), None)
                .await
            {
                warn!(identity_id = %identity.id(), error = %e, "Failed to index email");
            }
        }

        Ok(identity)
    }

    async fn get(&self, id: &IdentityId) -> Result<Option<Identity>, DomainError> {
        self.store.get(&Self::user_key(id)).await
    }

    async fn get_by_credential_hash(&self, hash: &str) -> Result<Option<Identity>, DomainError> {
        let identity = self.get_by_index(&Self::credential_key(hash)).await?;
        Ok(identity.filter(|identity| identity.credential_hash() == hash))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Identity>, DomainError> {
        self.get_by_index(&Self::email_key(email)).await
    }
}

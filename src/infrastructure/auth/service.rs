//! Auth service
//!
//! Issues anonymous and registered identities and resolves bearer credentials.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::identity::{
    validate_email, CredentialKind, CredentialResolver, Identity, IdentityId, IdentityRepository,
    ResolverStrategy, Tier, TierPolicy,
};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_identity_issued;

use super::generator::CredentialGenerator;
use super::token::{SessionClaims, SessionTokenService};

/// Attempts before giving up on a credential collision
const MAX_ISSUE_ATTEMPTS: usize = 3;

/// Result of issuing a new identity
#[derive(Debug, Clone)]
pub struct IssuedIdentity {
    pub identity: Identity,
    /// The bearer credential (only returned once)
    pub credential: String,
    /// Signed session token for the identity
    pub token: String,
}

#[derive(Debug)]
pub struct AuthService {
    repository: Arc<dyn IdentityRepository>,
    resolver: Arc<dyn CredentialResolver>,
    tokens: SessionTokenService,
    generator: CredentialGenerator,
}

impl AuthService {
    pub fn new(
        repository: Arc<dyn IdentityRepository>,
        resolver: Arc<dyn CredentialResolver>,
        tokens: SessionTokenService,
    ) -> Self {
        Self {
            repository,
            resolver,
            tokens,
            generator: CredentialGenerator::new(),
        }
    }

    /// Issue a new anonymous identity
    pub async fn issue_anonymous(&self) -> Result<IssuedIdentity, DomainError> {
        self.issue(CredentialKind::Anonymous, None).await
    }

    /// Issue a new registered identity for `email`
    pub async fn issue_registered(&self, email: &str) -> Result<IssuedIdentity, DomainError> {
        let email = validate_email(email).map_err(|e| DomainError::validation(e.to_string()))?;
        self.issue(CredentialKind::Registered, Some(email)).await
    }

    async fn issue(
        &self,
        kind: CredentialKind,
        email: Option<&str>,
    ) -> Result<IssuedIdentity, DomainError> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            let generated = self.generator.generate(kind);
            let id = IdentityId::generate();

            let identity = match email {
                Some(email) => {
                    Identity::registered(id, email, &generated.display_prefix, &generated.hash)
                }
                None => Identity::anonymous(id, &generated.display_prefix, &generated.hash),
            };

            match self.repository.create(identity).await {
                Ok(identity) => {
                    let token = self.tokens.issue(&identity)?;

                    info!(
                        identity_id = %identity.id(),
                        tier = %identity.tier(),
                        credential_prefix = %generated.display_prefix,
                        "Identity issued"
                    );
                    record_identity_issued(identity.tier().as_str());

                    return Ok(IssuedIdentity {
                        identity,
                        credential: generated.credential,
                        token,
                    });
                }
                Err(DomainError::Conflict { message }) if attempt < MAX_ISSUE_ATTEMPTS => {
                    warn!(attempt, %message, "Credential collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Resolve a bearer credential; unknown credentials give `Ok(None)`
    pub async fn resolve(&self, credential: &str) -> Result<Option<Identity>, DomainError> {
        let identity = self.resolver.resolve(credential).await?;

        if identity.is_none() {
            debug!(strategy = %self.resolver.strategy(), "Credential did not resolve");
        }

        Ok(identity)
    }

    /// Latest identity registered with `email`
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, DomainError> {
        self.repository.get_by_email(email.trim()).await
    }

    /// Claims of a valid session token
    pub fn verify_token(&self, token: &str) -> Option<SessionClaims> {
        self.tokens.verify(token)
    }

    pub fn tier_policy(tier: Tier) -> TierPolicy {
        TierPolicy::for_tier(tier)
    }

    pub fn resolver_strategy(&self) -> ResolverStrategy {
        self.resolver.strategy()
    }
}

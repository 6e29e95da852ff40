//! Identity domain
//!
//! Callers of the gateway, the tiers that bound their usage, and the
//! traits used to persist identities and resolve bearer credentials.

mod entity;
mod repository;
mod resolver;
mod validation;

pub use entity::{
    CredentialKind, Identity, IdentityId, Tier, TierPolicy, ANONYMOUS_CREDENTIAL_PREFIX,
    REGISTERED_CREDENTIAL_PREFIX,
};
pub use repository::IdentityRepository;
pub use resolver::{CredentialResolver, ResolverStrategy};
pub use validation::{validate_email, IdentityValidationError};

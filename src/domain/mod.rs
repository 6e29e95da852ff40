//! Domain layer - Core business logic and entities

pub mod error;
pub mod identity;
pub mod rate_limit;
pub mod store;

pub use error::DomainError;
pub use identity::{
    CredentialKind, CredentialResolver, Identity, IdentityId, IdentityRepository,
    IdentityValidationError, ResolverStrategy, Tier, TierPolicy,
};
pub use rate_limit::{Clock, CounterStore, RateLimitDecision, SystemClock, UsageCounter};
pub use store::{KeyValueStore, KeyValueStoreExt};

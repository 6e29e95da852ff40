//! Authentication infrastructure module
//!
//! Credential generation, identity persistence, credential resolution and
//! the session tokens handed out at issuance.

mod generator;
mod repository;
mod resolver;
mod service;
mod token;

pub use generator::{
    hash_credential, verify_credential, CredentialGenerator, GeneratedCredential,
};
pub use repository::StoreIdentityRepository;
pub use resolver::{PrefixHeuristicResolver, StoreBackedResolver};
pub use service::{AuthService, IssuedIdentity};
pub use token::{SessionClaims, SessionTokenService, TokenConfig};

//! Session tokens returned alongside issued credentials

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::domain::identity::{Identity, Tier};
use crate::domain::DomainError;

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Identity id
    pub sub: String,
    pub tier: Tier,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    /// Fails when `ttl_hours` pushes the expiry past the representable range
    pub fn new(identity: &Identity, ttl_hours: u64) -> Result<Self, DomainError> {
        let now = Utc::now();
        let exp = i64::try_from(ttl_hours)
            .ok()
            .and_then(Duration::try_hours)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                DomainError::configuration(format!(
                    "Session token TTL of {} hours is out of range",
                    ttl_hours
                ))
            })?;

        Ok(Self {
            sub: identity.id().as_str().to_string(),
            tier: identity.tier(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        })
    }
}

#[derive(Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub ttl_hours: u64,
}

impl Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"[hidden]")
            .field("ttl_hours", &self.ttl_hours)
            .finish()
    }
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>, ttl_hours: u64) -> Self {
        Self {
            secret: secret.into(),
            ttl_hours,
        }
    }
}

/// HS256 session token signer and verifier
#[derive(Clone)]
pub struct SessionTokenService {
    ttl_hours: u64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl Debug for SessionTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokenService")
            .field("ttl_hours", &self.ttl_hours)
            .field("encoding_key", &"[hidden]")
            .field("decoding_key", &"[hidden]")
            .finish()
    }
}

impl SessionTokenService {
    pub fn new(config: TokenConfig) -> Self {
        Self {
            ttl_hours: config.ttl_hours,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
        }
    }

    pub fn issue(&self, identity: &Identity) -> Result<String, DomainError> {
        let claims = SessionClaims::new(identity, self.ttl_hours)?;

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| DomainError::internal(format!("Failed to sign session token: {}", e)))
    }

    /// Claims of a valid, unexpired token; `None` otherwise
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        decode::<SessionClaims>(token, &self.decoding_key, &Validation::default())
            .ok()
            .map(|data| data.claims)
    }

    pub fn ttl_hours(&self) -> u64 {
        self.ttl_hours
    }
}

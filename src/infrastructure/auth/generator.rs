//! Credential generation
//!
//! Generates prefixed bearer credentials and the hashes they are stored under.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::domain::identity::CredentialKind;

const HASH_SCHEME: &str = "sha256$";

/// A freshly generated credential
#[derive(Debug, Clone)]
pub struct GeneratedCredential {
    /// The full credential (only returned once, at issuance)
    pub credential: String,
    pub kind: CredentialKind,
    /// Kind prefix plus the first 8 random chars, safe to display and log
    pub display_prefix: String,
    /// Hash the credential is stored under
    pub hash: String,
}

/// Generator for bearer credentials
#[derive(Debug, Clone)]
pub struct CredentialGenerator {
    /// Number of random bytes per credential
    key_bytes: usize,
}

impl CredentialGenerator {
    pub fn new() -> Self {
        // 24 bytes encode to 32 url-safe chars
        Self { key_bytes: 24 }
    }

    pub fn with_key_bytes(mut self, bytes: usize) -> Self {
        self.key_bytes = bytes.max(1);
        self
    }

    /// Generate a credential of the given kind
    pub fn generate(&self, kind: CredentialKind) -> GeneratedCredential {
        let credential = loop {
            let candidate = format!("{}{}", kind.prefix(), self.random_part());

            // A registered credential whose random part starts with "anon_"
            // would be read back as anonymous
            if CredentialKind::detect(&candidate) == Some(kind) {
                break candidate;
            }
        };

        self.describe(credential, kind)
    }

    /// Rebuild the generated form of a known credential (for testing purposes)
    pub fn from_secret(&self, kind: CredentialKind, secret: &str) -> GeneratedCredential {
        self.describe(format!("{}{}", kind.prefix(), secret), kind)
    }

    fn describe(&self, credential: String, kind: CredentialKind) -> GeneratedCredential {
        let random_part = &credential[kind.prefix().len()..];
        let shown: String = random_part.chars().take(8).collect();

        GeneratedCredential {
            display_prefix: format!("{}{}", kind.prefix(), shown),
            hash: hash_credential(&credential),
            credential,
            kind,
        }
    }

    fn random_part(&self) -> String {
        let mut random_bytes = vec![0u8; self.key_bytes];
        rand::thread_rng().fill_bytes(&mut random_bytes);
        URL_SAFE_NO_PAD.encode(&random_bytes)
    }
}

impl Default for CredentialGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash a credential for storage
pub fn hash_credential(credential: &str) -> String {
    let digest = Sha256::digest(credential.as_bytes());
    format!("{}{}", HASH_SCHEME, URL_SAFE_NO_PAD.encode(digest))
}

/// The encoded digest without the scheme tag
pub fn hash_digest(hash: &str) -> &str {
    hash.strip_prefix(HASH_SCHEME).unwrap_or(hash)
}

/// Verify a credential against a stored hash
pub fn verify_credential(credential: &str, stored_hash: &str) -> bool {
    constant_time_compare(&hash_credential(credential), stored_hash)
}

/// Constant-time string comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_anonymous() {
        let generated = CredentialGenerator::new().generate(CredentialKind::Anonymous);

        assert!(generated.credential.starts_with("mcp_anon_"));
        assert_eq!(generated.credential.len(), "mcp_anon_".len() + 32);
        assert_eq!(generated.display_prefix.len(), "mcp_anon_".len() + 8);
        assert!(generated.hash.starts_with("sha256$"));
    }

    #[test]
    fn test_generate_registered_is_never_read_as_anonymous() {
        let generator = CredentialGenerator::new();

        for _ in 0..200 {
            let generated = generator.generate(CredentialKind::Registered);
            assert!(generated.credential.starts_with("mcp_"));
            assert_eq!(
                CredentialKind::detect(&generated.credential),
                Some(CredentialKind::Registered)
            );
        }
    }

    #[test]
    fn test_credentials_are_unique_across_kinds() {
        let generator = CredentialGenerator::new();
        let mut seen = HashSet::new();

        for i in 0..500 {
            let kind = if i % 2 == 0 {
                CredentialKind::Anonymous
            } else {
                CredentialKind::Registered
            };
            assert!(seen.insert(generator.generate(kind).credential));
        }
    }

    #[test]
    fn test_verify_credential() {
        let generated = CredentialGenerator::new().generate(CredentialKind::Registered);

        assert!(verify_credential(&generated.credential, &generated.hash));
        assert!(!verify_credential("mcp_wrong", &generated.hash));
    }

    #[test]
    fn test_from_secret_is_deterministic() {
        let generator = CredentialGenerator::new();
        let a = generator.from_secret(CredentialKind::Anonymous, "fixture1234");
        let b = generator.from_secret(CredentialKind::Anonymous, "fixture1234");

        assert_eq!(a.credential, "mcp_anon_fixture1234");
        assert_eq!(a.display_prefix, "mcp_anon_fixture1");
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn test_hash_digest_strips_scheme() {
        let hash = hash_credential("mcp_abc");
        assert_eq!(format!("sha256${}", hash_digest(&hash)), hash);
        assert_eq!(hash_digest("plain"), "plain");
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hell"));
    }
}

//! Identity entity, quota tiers and credential kinds

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix carried by credentials issued to anonymous identities
pub const ANONYMOUS_CREDENTIAL_PREFIX: &str = "mcp_anon_";

/// Prefix carried by credentials issued to registered identities
pub const REGISTERED_CREDENTIAL_PREFIX: &str = "mcp_";

/// Opaque identity identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(String);

impl IdentityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdentityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Quota class of an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Pro,
    /// Unknown tier names deserialize here so quota lookups fail safe
    #[default]
    #[serde(other)]
    Anonymous,
}

impl Tier {
    /// Resolve a tier by name, falling back to `Anonymous` for anything unknown
    pub fn from_name(name: &str) -> Self {
        match name {
            "free" => Self::Free,
            "pro" => Self::Pro,
            _ => Self::Anonymous,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Free => "free",
            Self::Pro => "pro",
        }
    }

    /// Quota policy for this tier
    pub fn policy(&self) -> TierPolicy {
        TierPolicy::for_tier(*self)
    }

    /// Guidance returned to callers that exhausted their quota
    pub fn upgrade_suggestion(&self) -> &'static str {
        match self {
            Self::Anonymous => "Register with email for higher limits",
            Self::Free => "Upgrade to pro for higher limits",
            Self::Pro => "Contact support to raise your pro limits",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requests allowed per period for a tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPolicy {
    pub requests: u32,
    /// Window length in seconds
    #[serde(rename = "period")]
    pub period_secs: u64,
}

impl TierPolicy {
    pub const ANONYMOUS: Self = Self::new(10, 3600);
    pub const FREE: Self = Self::new(1000, 3600);
    pub const PRO: Self = Self::new(10_000, 3600);

    pub const fn new(requests: u32, period_secs: u64) -> Self {
        Self {
            requests,
            period_secs,
        }
    }

    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Anonymous => Self::ANONYMOUS,
            Tier::Free => Self::FREE,
            Tier::Pro => Self::PRO,
        }
    }

    /// Policy for a tier given by name; unknown names get the anonymous policy
    pub fn for_tier_name(name: &str) -> Self {
        Self::for_tier(Tier::from_name(name))
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}

/// Kind of credential, recognizable from its prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    Anonymous,
    Registered,
}

impl CredentialKind {
    /// Detect the credential kind from its prefix.
    ///
    /// Returns `None` for strings that carry neither prefix or have nothing after it.
    pub fn detect(credential: &str) -> Option<Self> {
        if let Some(rest) = credential.strip_prefix(ANONYMOUS_CREDENTIAL_PREFIX) {
            return (!rest.is_empty()).then_some(Self::Anonymous);
        }

        credential
            .strip_prefix(REGISTERED_CREDENTIAL_PREFIX)
            .filter(|rest| !rest.is_empty())
            .map(|_| Self::Registered)
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Anonymous => ANONYMOUS_CREDENTIAL_PREFIX,
            Self::Registered => REGISTERED_CREDENTIAL_PREFIX,
        }
    }

    /// Tier implied by the credential kind at issuance
    pub fn tier(&self) -> Tier {
        match self {
            Self::Anonymous => Tier::Anonymous,
            Self::Registered => Tier::Free,
        }
    }
}

/// A caller of the gateway
///
/// The raw credential is never stored; only its hash and a short display prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    id: IdentityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    credential_prefix: String,
    credential_hash: String,
    is_verified: bool,
    created_at: DateTime<Utc>,
    tier: Tier,
}

impl Identity {
    /// Create an anonymous identity
    pub fn anonymous(
        id: IdentityId,
        credential_prefix: impl Into<String>,
        credential_hash: impl Into<String>,
    ) -> Self {
        Self {
            id,
            email: None,
            credential_prefix: credential_prefix.into(),
            credential_hash: credential_hash.into(),
            is_verified: false,
            created_at: Utc::now(),
            tier: Tier::Anonymous,
        }
    }

    /// Create a registered identity with a verified email
    pub fn registered(
        id: IdentityId,
        email: impl Into<String>,
        credential_prefix: impl Into<String>,
        credential_hash: impl Into<String>,
    ) -> Self {
        Self {
            id,
            email: Some(email.into()),
            credential_prefix: credential_prefix.into(),
            credential_hash: credential_hash.into(),
            is_verified: true,
            created_at: Utc::now(),
            tier: Tier::Free,
        }
    }

    /// Identity inferred from a credential's prefix alone, without a stored record
    pub fn inferred(
        id: IdentityId,
        kind: CredentialKind,
        credential_prefix: impl Into<String>,
        credential_hash: impl Into<String>,
    ) -> Self {
        Self {
            id,
            email: None,
            credential_prefix: credential_prefix.into(),
            credential_hash: credential_hash.into(),
            is_verified: false,
            created_at: Utc::now(),
            tier: kind.tier(),
        }
    }

    pub fn id(&self) -> &IdentityId {
        &self.id
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn credential_prefix(&self) -> &str {
        &self.credential_prefix
    }

    pub fn credential_hash(&self) -> &str {
        &self.credential_hash
    }

    pub fn is_verified(&self) -> bool {
        self.is_verified
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn policy(&self) -> TierPolicy {
        self.tier.policy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_names_round_trip() {
        for tier in [Tier::Anonymous, Tier::Free, Tier::Pro] {
            let json = serde_json::to_string(&tier).unwrap();
            assert_eq!(json, format!("\"{}\"", tier.as_str()));
            assert_eq!(serde_json::from_str::<Tier>(&json).unwrap(), tier);
        }
    }

    #[test]
    fn test_tier_policies() {
        assert_eq!(Tier::Anonymous.policy(), TierPolicy::new(10, 3600));
        assert_eq!(Tier::Free.policy(), TierPolicy::new(1000, 3600));
        assert_eq!(Tier::Pro.policy(), TierPolicy::new(10_000, 3600));
    }

    #[test]
    fn test_unknown_tier_falls_back_to_anonymous() {
        assert_eq!(TierPolicy::for_tier_name("enterprise"), TierPolicy::ANONYMOUS);
        assert_eq!(TierPolicy::for_tier_name(""), TierPolicy::ANONYMOUS);
        assert_eq!(TierPolicy::for_tier_name("pro"), TierPolicy::PRO);

        let tier: Tier = serde_json::from_str("\"platinum\"").unwrap();
        assert_eq!(tier, Tier::Anonymous);
        let tier: Tier = serde_json::from_str("\"gold\"").unwrap();
        assert_eq!(tier, Tier::Anonymous);
    }

    #[test]
    fn test_policy_serializes_period() {
        let json = serde_json::to_value(TierPolicy::FREE).unwrap();
        assert_eq!(json, serde_json::json!({"requests": 1000, "period": 3600}));
    }

    #[test]
    fn test_detect_credential_kind() {
        assert_eq!(
            CredentialKind::detect("mcp_anon_abc"),
            Some(CredentialKind::Anonymous)
        );
        assert_eq!(
            CredentialKind::detect("mcp_abc"),
            Some(CredentialKind::Registered)
        );
        assert_eq!(CredentialKind::detect("mcp_"), None);
        assert_eq!(CredentialKind::detect("mcp_anon_"), None);
        assert_eq!(CredentialKind::detect("sk-live-123"), None);
        assert_eq!(CredentialKind::detect(""), None);
    }

    #[test]
    fn test_suggestions_differ_by_tier() {
        assert_ne!(
            Tier::Anonymous.upgrade_suggestion(),
            Tier::Free.upgrade_suggestion()
        );
        assert!(Tier::Anonymous.upgrade_suggestion().contains("Register"));
    }

    #[test]
    fn test_anonymous_identity_has_no_email() {
        let identity = Identity::anonymous(IdentityId::generate(), "mcp_anon_abcd1234", "hash");

        assert_eq!(identity.tier(), Tier::Anonymous);
        assert!(identity.email().is_none());
        assert!(!identity.is_verified());
    }

    #[test]
    fn test_identity_serialization_roundtrip() {
        let identity = Identity::registered(
            IdentityId::new("abc"),
            "a@b.com",
            "mcp_abcd1234",
            "sha256$xyz",
        );

        let json = serde_json::to_string(&identity).unwrap();
        assert!(json.contains("\"isVerified\":true"));
        assert!(json.contains("\"tier\":\"free\""));

        let parsed: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, identity);
    }
}

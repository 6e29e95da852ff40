//! Per-identity quota gate

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, HeaderValue},
    response::Response,
};
use chrono::SecondsFormat;
use tracing::{debug, warn};

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::{Identity, RateLimitDecision, TierPolicy};
use crate::infrastructure::observability::record_rate_limit_decision;

use super::auth::RequireIdentity;

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// An authenticated request that has been counted against its tier's quota
#[derive(Debug, Clone)]
pub struct Quota {
    pub identity: Identity,
    pub policy: TierPolicy,
    pub decision: RateLimitDecision,
}

impl Quota {
    pub fn headers(&self) -> HeaderMap {
        quota_headers(&self.policy, &self.decision)
    }

    /// Attach the `X-RateLimit-*` headers to a successful response
    pub fn apply(&self, mut response: Response) -> Response {
        response.headers_mut().extend(self.headers());
        response
    }
}

impl FromRequestParts<AppState> for Quota {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireIdentity(identity) = RequireIdentity::from_request_parts(parts, state).await?;
        enforce(state, identity).await
    }
}

/// Count one request for `identity`; over-quota requests become a 429
pub async fn enforce(state: &AppState, identity: Identity) -> Result<Quota, ApiError> {
    let policy = identity.policy();
    let tier = identity.tier();

    let decision = state
        .rate_limiter
        .check(identity.id().as_str(), policy.requests, policy.period_secs)
        .await?;

    record_rate_limit_decision(tier.as_str(), decision.allowed);

    if !decision.allowed {
        warn!(
            identity_id = %identity.id(),
            tier = %tier,
            reset_at = %decision.reset_at,
            "Rate limit exceeded"
        );

        return Err(ApiError::rate_limited()
            .with_field("resetAt", format_reset(&decision))
            .with_field("tier", tier.as_str())
            .with_field("limit", policy.requests)
            .with_field("period", policy.period_secs)
            .with_field("suggestion", tier.upgrade_suggestion())
            .with_headers(quota_headers(&policy, &decision)));
    }

    debug!(
        identity_id = %identity.id(),
        remaining = decision.remaining,
        "Request admitted"
    );

    Ok(Quota {
        identity,
        policy,
        decision,
    })
}

pub fn quota_headers(policy: &TierPolicy, decision: &RateLimitDecision) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(LIMIT_HEADER, HeaderValue::from(policy.requests));
    headers.insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));
    if let Ok(reset) = HeaderValue::from_str(&format_reset(decision)) {
        headers.insert(RESET_HEADER, reset);
    }
    headers
}

fn format_reset(decision: &RateLimitDecision) -> String {
    decision.reset_at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

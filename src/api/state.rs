//! Shared handler state

use std::sync::Arc;

use crate::infrastructure::auth::AuthService;
use crate::infrastructure::rate_limit::RateLimiter;
use crate::infrastructure::search::WebSearchClient;
use crate::infrastructure::upstream::UpstreamProxy;

/// Default cap on proxied request bodies (10 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Services built once at startup and shared by every request
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub rate_limiter: RateLimiter,
    pub upstream: Arc<UpstreamProxy>,
    pub search: Arc<WebSearchClient>,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(
        auth_service: Arc<AuthService>,
        rate_limiter: RateLimiter,
        upstream: Arc<UpstreamProxy>,
        search: Arc<WebSearchClient>,
    ) -> Self {
        Self {
            auth_service,
            rate_limiter,
            upstream,
            search,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("resolver", &self.auth_service.resolver_strategy())
            .field("upstream_configured", &self.upstream.is_configured())
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

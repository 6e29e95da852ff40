//! MCP Gateway
//!
//! API gateway for the MCP iPhone client:
//! - Anonymous and email-registered credential issuance
//! - Per-identity fixed-window quotas by tier
//! - Buffered and server-sent-event proxying to the Groq API
//! - Web search behind the same credential and quota gate

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use tracing::{info, warn};

use api::state::AppState;
use domain::{CredentialResolver, IdentityRepository, ResolverStrategy};
use infrastructure::{
    auth::{
        AuthService, PrefixHeuristicResolver, SessionTokenService, StoreBackedResolver,
        StoreIdentityRepository, TokenConfig,
    },
    rate_limit::RateLimiter,
    search::WebSearchClient,
    store::{StoreFactory, Stores},
    upstream::UpstreamProxy,
};

/// Create the application state with default configuration
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let stores = create_stores(config).await?;
    let auth_service = create_auth_service(config, &stores);
    let rate_limiter = RateLimiter::new(stores.counters.clone());

    let prefix = config.upstream.route_prefix.trim_end_matches('/');
    if !prefix.starts_with('/') {
        anyhow::bail!(
            "upstream.route_prefix must start with '/' and name a path, got {:?}",
            config.upstream.route_prefix
        );
    }

    let upstream = UpstreamProxy::new(config.upstream.to_upstream_config())?;
    if upstream.is_configured() {
        info!(base_url = %config.upstream.base_url, "Upstream proxy configured");
    } else {
        warn!(
            "No upstream API key configured (upstream.api_key or {}); {} routes will fail",
            config::UPSTREAM_KEY_ENV,
            prefix
        );
    }

    let search = WebSearchClient::new(config.search.to_search_config())?;

    Ok(AppState::new(
        Arc::new(auth_service),
        rate_limiter,
        Arc::new(upstream),
        Arc::new(search),
    )
    .with_max_body_bytes(config.upstream.max_body_bytes))
}

/// Connect the credential and counter stores on the configured backend
pub async fn create_stores(config: &AppConfig) -> anyhow::Result<Stores> {
    let store_config = config.store.to_store_config();
    info!(backend = %store_config.backend, "Store backend");

    let stores = StoreFactory::new().create(&store_config).await?;
    Ok(stores)
}

/// Build the auth service with the configured credential resolver
pub fn create_auth_service(config: &AppConfig, stores: &Stores) -> AuthService {
    let repository: Arc<dyn IdentityRepository> =
        Arc::new(StoreIdentityRepository::new(stores.records.clone()));

    let resolver: Arc<dyn CredentialResolver> = match config.auth.resolver {
        ResolverStrategy::Store => Arc::new(StoreBackedResolver::new(repository.clone())),
        ResolverStrategy::Prefix => {
            warn!("Prefix resolver active: credentials are trusted by prefix without a store lookup");
            Arc::new(PrefixHeuristicResolver::new())
        }
    };
    info!(strategy = %config.auth.resolver, "Credential resolver");

    let secret = match config.auth.token_secret.as_deref().filter(|s| !s.is_empty()) {
        Some(secret) => secret.to_string(),
        None => {
            warn!("No auth.token_secret configured; session tokens will not survive a restart");
            random_secret()
        }
    };
    let tokens = SessionTokenService::new(TokenConfig::new(secret, config.auth.token_ttl_hours));

    AuthService::new(repository, resolver, tokens)
}

fn random_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_state() {
        let state = create_app_state().await.unwrap();

        assert_eq!(state.auth_service.resolver_strategy(), ResolverStrategy::Store);
        assert_eq!(state.max_body_bytes, 10 * 1024 * 1024);
        assert_eq!(state.upstream.route_prefix(), "/api/groq");
    }

    #[tokio::test]
    async fn test_prefix_resolver_selected() {
        let mut config = AppConfig::default();
        config.auth.resolver = ResolverStrategy::Prefix;

        let state = create_app_state_with_config(&config).await.unwrap();
        assert_eq!(state.auth_service.resolver_strategy(), ResolverStrategy::Prefix);

        let identity = state
            .auth_service
            .resolve("mcp_anon_unstored")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(identity.tier(), domain::Tier::Anonymous);
    }

    #[tokio::test]
    async fn test_invalid_route_prefix_rejected() {
        let mut config = AppConfig::default();
        config.upstream.route_prefix = "api/groq".to_string();

        assert!(create_app_state_with_config(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_redis_url_rejected() {
        let mut config = AppConfig::default();
        config.store.backend = infrastructure::store::StoreBackend::Redis;

        assert!(create_app_state_with_config(&config).await.is_err());
    }

    #[test]
    fn test_random_secret_is_unique() {
        assert_ne!(random_secret(), random_secret());
        assert_eq!(random_secret().len(), 43);
    }
}

use std::time::Duration;

use serde::Deserialize;

use crate::domain::ResolverStrategy;
use crate::infrastructure::observability::ObservabilityConfig;
use crate::infrastructure::search::SearchConfig;
use crate::infrastructure::store::{StoreBackend, StoreConfig};
use crate::infrastructure::upstream::UpstreamConfig;

/// Environment variable consulted when `upstream.api_key` is not set
pub const UPSTREAM_KEY_ENV: &str = "GROQ_API_KEY";

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub upstream: UpstreamSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub search: SearchSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Clone, Deserialize)]
pub struct UpstreamSettings {
    #[serde(default = "default_upstream_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_route_prefix")]
    pub route_prefix: String,
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

#[derive(Clone, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub resolver: ResolverStrategy,
    /// Session token signing secret; a random one is used when absent
    #[serde(default)]
    pub token_secret: Option<String>,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_search_url")]
    pub base_url: String,
    #[serde(default = "default_search_fallback_url")]
    pub fallback_url: String,
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_related")]
    pub max_related: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_level() -> String {
    "info".to_string()
}

fn default_upstream_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_route_prefix() -> String {
    "/api/groq".to_string()
}

fn default_upstream_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_key_prefix() -> String {
    "mcp".to_string()
}

fn default_token_ttl_hours() -> u64 {
    720
}

fn default_search_url() -> String {
    "https://api.duckduckgo.com".to_string()
}

fn default_search_fallback_url() -> String {
    "https://duckduckgo.com".to_string()
}

fn default_search_timeout() -> u64 {
    10
}

fn default_max_related() -> usize {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            base_url: default_upstream_url(),
            api_key: None,
            route_prefix: default_route_prefix(),
            timeout_secs: default_upstream_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl std::fmt::Debug for UpstreamSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[hidden]"))
            .field("route_prefix", &self.route_prefix)
            .field("timeout_secs", &self.timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

impl UpstreamSettings {
    /// Proxy configuration, reading the key from `GROQ_API_KEY` when unset here
    pub fn to_upstream_config(&self) -> UpstreamConfig {
        let api_key = self
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| std::env::var(UPSTREAM_KEY_ENV).ok().filter(|key| !key.is_empty()));

        UpstreamConfig {
            base_url: self.base_url.clone(),
            api_key,
            route_prefix: self.route_prefix.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            redis_url: None,
            key_prefix: default_key_prefix(),
        }
    }
}

impl StoreSettings {
    pub fn to_store_config(&self) -> StoreConfig {
        StoreConfig {
            backend: self.backend,
            redis_url: self.redis_url.clone(),
            key_prefix: Some(self.key_prefix.clone()).filter(|p| !p.is_empty()),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            resolver: ResolverStrategy::default(),
            token_secret: None,
            token_ttl_hours: default_token_ttl_hours(),
        }
    }
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("resolver", &self.resolver)
            .field("token_secret", &self.token_secret.as_ref().map(|_| "[hidden]"))
            .field("token_ttl_hours", &self.token_ttl_hours)
            .finish()
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            base_url: default_search_url(),
            fallback_url: default_search_fallback_url(),
            timeout_secs: default_search_timeout(),
            max_related: default_max_related(),
        }
    }
}

impl SearchSettings {
    pub fn to_search_config(&self) -> SearchConfig {
        SearchConfig {
            base_url: self.base_url.clone(),
            fallback_url: self.fallback_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_related: self.max_related,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

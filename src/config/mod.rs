//! Layered application configuration

mod app_config;

pub use app_config::{
    AppConfig, AuthSettings, LogFormat, LoggingSettings, SearchSettings, ServerConfig,
    StoreSettings, UpstreamSettings, UPSTREAM_KEY_ENV,
};

//! API middleware components

pub mod auth;
pub mod cors;
pub mod logging;
pub mod metrics;
pub mod rate_limit;
pub mod security;

pub use auth::RequireIdentity;
pub use cors::cors_middleware;
pub use logging::logging_middleware;
pub use metrics::metrics_middleware;
pub use rate_limit::{enforce, quota_headers, Quota};
pub use security::{security_headers_middleware, validate_proxy_path};

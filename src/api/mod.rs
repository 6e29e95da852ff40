//! API layer - HTTP endpoints and middleware

pub mod auth;
pub mod health;
pub mod middleware;
pub mod proxy;
pub mod router;
pub mod search;
pub mod state;
pub mod types;

pub use middleware::{Quota, RequireIdentity};
pub use router::create_router;
pub use state::AppState;

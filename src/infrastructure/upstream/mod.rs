//! Upstream proxy and stream relay

mod proxy;
mod relay;

pub use proxy::{ProxyRequest, UpstreamConfig, UpstreamProxy, POWERED_BY};
pub use relay::{relay, ByteStream};

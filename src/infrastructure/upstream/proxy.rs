//! Upstream LLM proxy
//!
//! Forwards gated requests to the configured completion API with the
//! gateway's own credential and relays the response, either buffered or as
//! a live event stream.

use std::fmt;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use futures::TryStreamExt;
use serde::Deserialize;
use tracing::{debug, error, warn};

use super::relay::relay;
use crate::domain::DomainError;
use crate::infrastructure::observability::record_upstream_request;

/// Provenance header added to every relayed response
pub const POWERED_BY: &str = "MCP-iPhone-Gateway";

const PROXY_FAILURE: &str = "Failed to proxy request to Groq";

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Inbound headers never forwarded upstream
const STRIPPED_REQUEST: &[&str] = &[
    "host",
    "content-length",
    "authorization",
    "x-api-key",
    "accept-encoding",
];

#[derive(Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    /// Credential presented upstream; `None` leaves the proxy unconfigured
    pub api_key: Option<String>,
    /// Local path prefix stripped before forwarding
    pub route_prefix: String,
    /// Bound on a buffered call, and on response headers for a streamed one
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[hidden]"))
            .field("route_prefix", &self.route_prefix)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key: None,
            route_prefix: "/api/groq".to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl UpstreamConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A gated request, already read off the wire
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    /// Local path, including the route prefix
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ProxyRequest {
    /// Whether the JSON body asks for a streamed completion
    pub fn wants_stream(&self) -> bool {
        #[derive(Deserialize)]
        struct StreamFlag {
            #[serde(default)]
            stream: bool,
        }

        serde_json::from_slice::<StreamFlag>(&self.body)
            .map(|flag| flag.stream)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamProxy {
    config: UpstreamConfig,
    client: reqwest::Client,
    streaming_client: reqwest::Client,
}

impl UpstreamProxy {
    pub fn new(config: UpstreamConfig) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        // No total timeout: an active stream may outlive any fixed bound
        let streaming_client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            streaming_client,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }

    /// Fails with `Configuration` when no upstream credential is set
    pub fn ensure_configured(&self) -> Result<(), DomainError> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(DomainError::configuration("Groq API key not configured"))
        }
    }

    pub fn route_prefix(&self) -> &str {
        &self.config.route_prefix
    }

    /// Upstream URL for a local path, with the route prefix stripped
    pub fn upstream_url(&self, path: &str, query: Option<&str>) -> String {
        let prefix = self.config.route_prefix.trim_end_matches('/');
        let rest = path.strip_prefix(prefix).unwrap_or(path);

        let mut url = format!("{}{}", self.config.base_url.trim_end_matches('/'), rest);
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }
        url
    }

    /// Inbound headers minus client auth and hop-by-hop, plus the gateway credential
    pub fn upstream_headers(&self, inbound: &HeaderMap) -> Result<HeaderMap, DomainError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| DomainError::configuration("Groq API key not configured"))?;

        let mut headers = HeaderMap::new();
        for (name, value) in inbound.iter() {
            let name_str = name.as_str();
            if HOP_BY_HOP.contains(&name_str) || STRIPPED_REQUEST.contains(&name_str) {
                continue;
            }
            headers.append(name.clone(), value.clone());
        }

        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| DomainError::configuration("Groq API key is not a valid header value"))?;
        headers.insert(header::AUTHORIZATION, bearer);

        Ok(headers)
    }

    /// Buffered for plain requests, streamed when the body sets `stream: true`
    pub async fn forward(&self, request: ProxyRequest) -> Response {
        if request.wants_stream() {
            self.proxy_streamed(request).await
        } else {
            self.proxy_buffered(request).await
        }
    }

    /// Forward and return the upstream response once it is complete
    pub async fn proxy_buffered(&self, request: ProxyRequest) -> Response {
        let started = Instant::now();
        let upstream = match self.send(&self.client, request).await {
            Ok(response) => response,
            Err(e) => return self.failure("buffered", started, e),
        };

        let status = upstream.status();
        let headers = response_headers(upstream.headers());

        let body = match upstream.bytes().await {
            Ok(body) => body,
            Err(e) => {
                return self.failure(
                    "buffered",
                    started,
                    DomainError::upstream(format!("Failed to read upstream body: {}", e)),
                )
            }
        };

        record_upstream_request("buffered", Some(status.as_u16()), started.elapsed());
        debug!(status = %status, bytes = body.len(), "Upstream responded");

        build_response(status, headers, Body::from(body))
    }

    /// Forward and relay the upstream body as a live event stream
    pub async fn proxy_streamed(&self, request: ProxyRequest) -> Response {
        let started = Instant::now();
        let sent = tokio::time::timeout(
            self.config.timeout,
            self.send(&self.streaming_client, request),
        )
        .await;

        let upstream = match sent {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return self.failure("streamed", started, e),
            Err(_) => {
                return self.failure(
                    "streamed",
                    started,
                    DomainError::upstream("Timed out waiting for upstream response"),
                )
            }
        };

        let status = upstream.status();
        record_upstream_request("streamed", Some(status.as_u16()), started.elapsed());

        if !status.is_success() {
            // Nothing streamed yet; pass the error through untouched
            let headers = response_headers(upstream.headers());
            warn!(status = %status, "Upstream rejected streamed request");
            let body = match tokio::time::timeout(self.config.timeout, upstream.bytes()).await {
                Ok(Ok(body)) => body,
                Ok(Err(e)) => {
                    warn!(status = %status, error = %e, "Failed to read upstream error body");
                    Bytes::new()
                }
                Err(_) => {
                    warn!(status = %status, "Timed out reading upstream error body");
                    Bytes::new()
                }
            };
            return build_response(status, headers, Body::from(body));
        }

        let mut headers = response_headers(upstream.headers());
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));

        let chunks = upstream
            .bytes_stream()
            .map_err(|e| DomainError::upstream(format!("Stream error: {}", e)));

        build_response(status, headers, relay(chunks))
    }

    async fn send(
        &self,
        client: &reqwest::Client,
        request: ProxyRequest,
    ) -> Result<reqwest::Response, DomainError> {
        let url = self.upstream_url(&request.path, request.query.as_deref());
        let headers = self.upstream_headers(&request.headers)?;

        debug!(method = %request.method, url = %url, "Forwarding upstream");

        client
            .request(request.method, &url)
            .headers(headers)
            .body(request.body)
            .send()
            .await
            .map_err(|e| DomainError::upstream(format!("Request failed: {}", e)))
    }

    fn failure(&self, mode: &str, started: Instant, e: DomainError) -> Response {
        record_upstream_request(mode, None, started.elapsed());

        if let DomainError::Configuration { message } = &e {
            error!(error = %message, "Upstream proxy misconfigured");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": message })),
            )
                .into_response();
        }

        error!(mode, error = %e, "Upstream request failed");
        (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({
                "error": PROXY_FAILURE,
                "details": e.to_string(),
            })),
        )
            .into_response()
    }
}

/// Upstream response headers safe to relay
fn response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in upstream.iter() {
        let name_str = name.as_str();
        if HOP_BY_HOP.contains(&name_str) || name_str == "content-length" {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

fn build_response(status: StatusCode, mut headers: HeaderMap, body: Body) -> Response {
    headers.insert(
        HeaderName::from_static("x-powered-by"),
        HeaderValue::from_static(POWERED_BY),
    );

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::auth;
use super::health;
use super::middleware::{
    cors_middleware, logging_middleware, metrics_middleware, security_headers_middleware,
};
use super::proxy;
use super::search;
use super::state::AppState;
use super::types::ApiError;

/// Build the gateway router.
///
/// Public: `/health` and `/api/auth/*`. Gated by credential and quota: the
/// upstream proxy under its route prefix and `/api/search/web`. Unknown paths
/// and method mismatches both answer `404 {"error":"Not found"}`.
pub fn create_router(state: AppState) -> Router {
    let prefix = state.upstream.route_prefix().trim_end_matches('/').to_string();
    let wildcard = format!("{}/{{*path}}", prefix);

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/auth", auth::create_auth_router())
        .route("/api/search/web", post(search::web_search))
        .route(&prefix, get(proxy::proxy).post(proxy::proxy))
        .route(&wildcard, get(proxy::proxy).post(proxy::proxy))
        .fallback(not_found)
        .method_not_allowed_fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        // Outermost, so preflights skip everything and errors keep CORS headers
        .layer(middleware::from_fn(cors_middleware))
}

async fn not_found() -> ApiError {
    ApiError::not_found()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use chrono::{DateTime, Utc};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::domain::rate_limit::MockCounterStore;
    use crate::domain::{CounterStore, DomainError, IdentityRepository};
    use crate::infrastructure::auth::{
        AuthService, SessionTokenService, StoreBackedResolver, StoreIdentityRepository,
        TokenConfig,
    };
    use crate::infrastructure::rate_limit::RateLimiter;
    use crate::infrastructure::search::{SearchConfig, WebSearchClient};
    use crate::infrastructure::store::StoreFactory;
    use crate::infrastructure::upstream::{UpstreamConfig, UpstreamProxy};

    struct Harness {
        upstream: MockServer,
        search: MockServer,
        state: AppState,
    }

    impl Harness {
        async fn new() -> Self {
            Self::build(true, None).await
        }

        async fn build(with_key: bool, counters: Option<Arc<dyn CounterStore>>) -> Self {
            let upstream = MockServer::start().await;
            let search = MockServer::start().await;
            let stores = StoreFactory::create_in_memory();

            let repository: Arc<dyn IdentityRepository> =
                Arc::new(StoreIdentityRepository::new(stores.records.clone()));
            let resolver = Arc::new(StoreBackedResolver::new(repository.clone()));
            let tokens = SessionTokenService::new(TokenConfig::new("router-test-secret", 720));
            let auth_service = Arc::new(AuthService::new(repository, resolver, tokens));

            let rate_limiter = RateLimiter::new(counters.unwrap_or(stores.counters));

            let mut upstream_config = UpstreamConfig::new(upstream.uri());
            if with_key {
                upstream_config = upstream_config.with_api_key("gsk_test_key");
            }

            let search_client = WebSearchClient::new(SearchConfig {
                base_url: search.uri(),
                ..Default::default()
            })
            .unwrap();

            let state = AppState::new(
                auth_service,
                rate_limiter,
                Arc::new(UpstreamProxy::new(upstream_config).unwrap()),
                Arc::new(search_client),
            );

            Self {
                upstream,
                search,
                state,
            }
        }

        fn app(&self) -> Router {
            create_router(self.state.clone())
        }

        async fn send(&self, request: Request<Body>) -> Response {
            self.app().oneshot(request).await.unwrap()
        }

        async fn anonymous_key(&self) -> String {
            let response = self.send(post_json("/api/auth/anonymous", None, Value::Null)).await;
            assert_eq!(response.status(), StatusCode::OK);
            body_json(response).await["apiKey"]
                .as_str()
                .unwrap()
                .to_string()
        }
    }

    fn post_json(uri: &str, credential: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(credential) = credential {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", credential));
        }
        let body = if body.is_null() {
            Body::empty()
        } else {
            Body::from(body.to_string())
        };
        builder.body(body).unwrap()
    }

    fn chat(credential: Option<&str>) -> Request<Body> {
        post_json(
            "/api/groq/chat/completions",
            credential,
            json!({"model": "llama-3.1-8b-instant", "messages": [{"role": "user", "content": "hi"}]}),
        )
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn mount_completion(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "cmpl-1"})))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let harness = Harness::new().await;

        let response = harness
            .send(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        let timestamp = body["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[tokio::test]
    async fn test_anonymous_quota_exhaustion() {
        let harness = Harness::new().await;
        mount_completion(&harness.upstream, 10).await;

        let key = harness.anonymous_key().await;
        assert!(key.starts_with("mcp_anon_"));

        for i in 1..=10u32 {
            let response = harness.send(chat(Some(&key))).await;
            assert_eq!(response.status(), StatusCode::OK, "request {}", i);
            assert_eq!(response.headers()["x-ratelimit-limit"], "10");
            assert_eq!(
                response.headers()["x-ratelimit-remaining"],
                (10 - i).to_string().as_str()
            );
            assert_eq!(response.headers()["x-powered-by"], "MCP-iPhone-Gateway");
        }

        let before = Utc::now();
        let response = harness.send(chat(Some(&key))).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
        assert!(response.headers().contains_key("x-ratelimit-reset"));
        assert_eq!(response.headers()["access-control-allow-origin"], "*");

        let body = body_json(response).await;
        assert_eq!(body["error"], "Rate limit exceeded");
        assert_eq!(body["tier"], "anonymous");
        assert_eq!(body["limit"], 10);
        assert_eq!(body["period"], 3600);
        assert_eq!(body["suggestion"], "Register with email for higher limits");
        let reset_at = DateTime::parse_from_rfc3339(body["resetAt"].as_str().unwrap()).unwrap();
        assert!(reset_at.with_timezone(&Utc) >= before);
    }

    #[tokio::test]
    async fn test_registration() {
        let harness = Harness::new().await;

        let response = harness
            .send(post_json("/api/auth/register", None, json!({"email": "not-an-email"})))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Invalid email");

        let response = harness
            .send(post_json("/api/auth/register", None, json!({"email": "a@b.com"})))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["tier"], "free");
        assert_eq!(body["rateLimit"]["requests"], 1000);
        assert_eq!(body["rateLimit"]["period"], 3600);
        assert!(body["apiKey"].as_str().unwrap().starts_with("mcp_"));
        assert!(!body["apiKey"].as_str().unwrap().starts_with("mcp_anon_"));
    }

    #[tokio::test]
    async fn test_auth_gate() {
        let harness = Harness::new().await;
        mount_completion(&harness.upstream, 0).await;

        let response = harness.send(chat(None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert_eq!(body_json(response).await["error"], "API key required");

        let response = harness.send(chat(Some("garbage"))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "Invalid API key");

        let response = harness.send(chat(Some("mcp_anon_doesnotexist"))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "Invalid API key");
    }

    #[tokio::test]
    async fn test_x_api_key_header_is_accepted() {
        let harness = Harness::new().await;
        mount_completion(&harness.upstream, 1).await;
        let key = harness.anonymous_key().await;

        let request = Request::builder()
            .method("POST")
            .uri("/api/groq/chat/completions")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-api-key", key)
            .body(Body::from(r#"{"messages":[]}"#))
            .unwrap();

        assert_eq!(harness.send(request).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_session_token_is_not_a_credential() {
        let harness = Harness::new().await;
        let response = harness.send(post_json("/api/auth/anonymous", None, Value::Null)).await;
        let token = body_json(response).await["token"].as_str().unwrap().to_string();

        let response = harness.send(chat(Some(&token))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_verify_token() {
        let harness = Harness::new().await;
        let response = harness.send(post_json("/api/auth/anonymous", None, Value::Null)).await;
        let issued = body_json(response).await;

        let response = harness
            .send(post_json("/api/auth/verify", None, json!({"token": issued["token"]})))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["userId"], issued["userId"]);
        assert_eq!(body["tier"], "anonymous");
        assert_eq!(body["rateLimit"]["requests"], 10);

        let response = harness
            .send(post_json("/api/auth/verify", None, json!({"token": "not.a.token"})))
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "Invalid token");
    }

    #[tokio::test]
    async fn test_preflight_bypasses_auth() {
        let harness = Harness::new().await;

        let response = harness
            .send(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/groq/chat/completions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_route_and_method_mismatch() {
        let harness = Harness::new().await;

        let response = harness
            .send(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert_eq!(body_json(response).await["error"], "Not found");

        let response = harness
            .send(
                Request::builder()
                    .uri("/api/auth/anonymous")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "Not found");
    }

    #[tokio::test]
    async fn test_missing_upstream_key_fails_fast() {
        let harness = Harness::build(false, None).await;
        mount_completion(&harness.upstream, 0).await;
        let key = harness.anonymous_key().await;

        let response = harness.send(chat(Some(&key))).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "Groq API key not configured");

        // No quota was spent on the failed request
        let identity = harness.state.auth_service.resolve(&key).await.unwrap().unwrap();
        let usage = harness
            .state
            .rate_limiter
            .usage(identity.id().as_str())
            .await
            .unwrap();
        assert!(usage.is_none());
    }

    #[tokio::test]
    async fn test_counter_store_failure_is_internal_error() {
        let mut counters = MockCounterStore::new();
        counters
            .expect_check_and_increment()
            .returning(|_, _, _, _| Err(DomainError::storage("counter store unavailable")));

        let harness = Harness::build(true, Some(Arc::new(counters))).await;
        mount_completion(&harness.upstream, 0).await;
        let key = harness.anonymous_key().await;

        let response = harness.send(chat(Some(&key))).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal server error");
        assert!(body["details"].as_str().unwrap().contains("counter store unavailable"));
    }

    #[tokio::test]
    async fn test_streamed_completion() {
        let harness = Harness::new().await;
        let events = "data: a\n\ndata: b\n\ndata: [DONE]\n\n";
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(events),
            )
            .mount(&harness.upstream)
            .await;
        let key = harness.anonymous_key().await;

        let response = harness
            .send(post_json(
                "/api/groq/chat/completions",
                Some(&key),
                json!({"stream": true, "messages": []}),
            ))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/event-stream");
        assert_eq!(response.headers()["x-ratelimit-remaining"], "9");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], events.as_bytes());
    }

    #[tokio::test]
    async fn test_upstream_error_status_passes_through() {
        let harness = Harness::new().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": {"message": "bad model"}})),
            )
            .mount(&harness.upstream)
            .await;
        let key = harness.anonymous_key().await;

        let response = harness.send(chat(Some(&key))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["x-ratelimit-remaining"], "9");
        assert_eq!(body_json(response).await["error"]["message"], "bad model");
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let mut harness = Harness::new().await;
        harness.state = harness.state.clone().with_max_body_bytes(16);
        mount_completion(&harness.upstream, 0).await;
        let key = harness.anonymous_key().await;

        let response = harness.send(chat(Some(&key))).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_web_search() {
        let harness = Harness::new().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Abstract": "Rust",
                "AbstractText": "Rust is a language",
                "Heading": "Rust",
                "AbstractURL": "https://www.rust-lang.org",
                "AbstractSource": "Wikipedia",
                "RelatedTopics": []
            })))
            .mount(&harness.search)
            .await;
        let key = harness.anonymous_key().await;

        let response = harness
            .send(post_json("/api/search/web", Some(&key), json!({"query": "rust"})))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-remaining"], "9");
        let body = body_json(response).await;
        assert_eq!(body["query"], "rust");
        assert_eq!(body["results"][0]["title"], "Rust");
        assert_eq!(body["results"][0]["source"], "Wikipedia");

        let response = harness
            .send(post_json("/api/search/web", Some(&key), json!({})))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Missing query parameter");
    }

    #[tokio::test]
    async fn test_web_search_failure() {
        let harness = Harness::new().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&harness.search)
            .await;
        let key = harness.anonymous_key().await;

        let response = harness
            .send(post_json("/api/search/web", Some(&key), json!({"query": "rust"})))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Search failed");
        assert!(body["details"].is_string());
    }
}

//! Security headers and proxied path validation

use axum::{
    body::Body,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

use crate::api::types::ApiError;

/// Adds security headers to all responses
pub async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );

    // Streamed responses already carry their own cache policy
    if !headers.contains_key(header::CACHE_CONTROL) {
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    }

    response
}

/// Rejects paths that could escape the upstream route once the prefix is stripped
pub fn validate_proxy_path(path: &str) -> Result<(), ApiError> {
    if path.contains("..") || path.contains("//") || path.contains('\\') {
        return Err(ApiError::bad_request("Invalid path"));
    }

    if path.contains('\0') || path.to_ascii_lowercase().contains("%2e%2e") {
        return Err(ApiError::bad_request("Invalid path"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    #[test]
    fn test_plain_paths_pass() {
        assert!(validate_proxy_path("/api/groq/chat/completions").is_ok());
        assert!(validate_proxy_path("/api/groq/models").is_ok());
    }

    #[test]
    fn test_traversal_is_rejected() {
        for path in [
            "/api/groq/../admin",
            "/api/groq//models",
            "/api/groq/%2E%2E/secrets",
            "/api/groq/a\\b",
        ] {
            let err = validate_proxy_path(path).unwrap_err();
            assert_eq!(err.status, StatusCode::BAD_REQUEST, "{}", path);
        }
    }

    #[tokio::test]
    async fn test_headers_added() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn(security_headers_middleware));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert_eq!(response.headers()["x-frame-options"], "DENY");
        assert_eq!(response.headers()["cache-control"], "no-store");
    }
}

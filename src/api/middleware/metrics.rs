//! HTTP request metrics

use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{Method, Request},
    middleware::Next,
    response::Response,
};

use crate::infrastructure::observability::record_http_request;

/// Label for requests that matched no route
const UNMATCHED: &str = "unmatched";

pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = metric_path(&request);

    let response = next.run(request).await;

    // Preflights are answered before routing and would only add noise
    if method != Method::OPTIONS {
        record_http_request(
            method.as_str(),
            &path,
            response.status().as_u16(),
            start.elapsed(),
        );
    }

    response
}

/// Route template, so wildcard proxy paths share one series
fn metric_path(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED.to_string())
}

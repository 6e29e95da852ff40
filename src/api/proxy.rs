//! Gated passthrough to the upstream completion API

use axum::{
    body::to_bytes,
    extract::{Request, State},
    http::header,
    response::Response,
};
use tracing::debug;

use crate::api::middleware::{enforce, validate_proxy_path, RequireIdentity};
use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::infrastructure::upstream::ProxyRequest;

/// GET|POST <route_prefix>/*
///
/// Checks the upstream credential before counting the request, so a
/// misconfigured gateway does not burn client quota.
pub async fn proxy(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
    request: Request,
) -> Result<Response, ApiError> {
    state.upstream.ensure_configured()?;
    validate_proxy_path(request.uri().path())?;

    let quota = enforce(&state, identity).await?;

    let (parts, body) = request.into_parts();

    let declared_len = parts
        .headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared_len.is_some_and(|len| len > state.max_body_bytes) {
        return Err(too_large(state.max_body_bytes).with_headers(quota.headers()));
    }

    let body = to_bytes(body, state.max_body_bytes)
        .await
        .map_err(|e| {
            too_large(state.max_body_bytes)
                .with_details(e.to_string())
                .with_headers(quota.headers())
        })?;

    debug!(
        identity_id = %quota.identity.id(),
        path = %parts.uri.path(),
        bytes = body.len(),
        "Proxying request"
    );

    let response = state
        .upstream
        .forward(ProxyRequest {
            method: parts.method,
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(str::to_string),
            headers: parts.headers,
            body,
        })
        .await;

    Ok(quota.apply(response))
}

fn too_large(limit: usize) -> ApiError {
    ApiError::payload_too_large(format!("Request body exceeds {} bytes", limit))
}

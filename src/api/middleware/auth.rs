//! Bearer credential authentication

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::Identity;

/// Extractor that requires a credential resolving to a known identity
///
/// Reads the credential from either:
/// - Authorization header: `Bearer <credential>`
/// - X-API-Key header: `<credential>`
#[derive(Debug, Clone)]
pub struct RequireIdentity(pub Identity);

impl FromRequestParts<AppState> for RequireIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let credential = extract_credential(&parts.headers)?;

        debug!(
            credential_prefix = %credential.chars().take(9).collect::<String>(),
            "Resolving credential"
        );

        let identity = state
            .auth_service
            .resolve(&credential)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Invalid API key"))?;

        Ok(RequireIdentity(identity))
    }
}

fn extract_credential(headers: &HeaderMap) -> Result<String, ApiError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| ApiError::unauthorized("Invalid API key"))?;

        if let Some(token) = value.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Ok(token.to_string());
            }
        }
    }

    if let Some(value) = headers.get("x-api-key") {
        let value = value
            .to_str()
            .map_err(|_| ApiError::unauthorized("Invalid API key"))?
            .trim();

        if !value.is_empty() {
            return Ok(value.to_string());
        }
    }

    Err(ApiError::unauthorized("API key required"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_extract_bearer_credential() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer mcp_anon_abc".parse().unwrap());

        assert_eq!(extract_credential(&headers).unwrap(), "mcp_anon_abc");
    }

    #[test]
    fn test_extract_x_api_key() {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", "mcp_xyz".parse().unwrap());

        assert_eq!(extract_credential(&headers).unwrap(), "mcp_xyz");
    }

    #[test]
    fn test_bearer_takes_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer mcp_bearer".parse().unwrap());
        headers.insert("x-api-key", "mcp_header".parse().unwrap());

        assert_eq!(extract_credential(&headers).unwrap(), "mcp_bearer");
    }

    #[test]
    fn test_non_bearer_scheme_falls_back_to_x_api_key() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic dXNlcjpwYXNz".parse().unwrap());
        headers.insert("x-api-key", "mcp_header".parse().unwrap());

        assert_eq!(extract_credential(&headers).unwrap(), "mcp_header");
    }

    #[test]
    fn test_missing_credential() {
        let err = extract_credential(&HeaderMap::new()).unwrap_err();

        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.message(), "API key required");
    }

    #[test]
    fn test_blank_bearer_is_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer    ".parse().unwrap());

        let err = extract_credential(&headers).unwrap_err();
        assert_eq!(err.message(), "API key required");
    }
}

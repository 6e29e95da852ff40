//! Web search behind the quota gate

use axum::{extract::State, response::IntoResponse, response::Response};
use serde::Deserialize;

use crate::api::middleware::Quota;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<String>,
}

/// POST /api/search/web
pub async fn web_search(
    State(state): State<AppState>,
    quota: Quota,
    Json(request): Json<SearchRequest>,
) -> Result<Response, ApiError> {
    let query = request
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing query parameter").with_headers(quota.headers()))?;

    let results = state.search.search(query).await.map_err(|e| {
        tracing::error!(error = %e, "Web search failed");
        ApiError::bad_gateway("Search failed")
            .with_details(e.to_string())
            .with_headers(quota.headers())
    })?;

    Ok(quota.apply(Json(results).into_response()))
}

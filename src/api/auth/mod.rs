//! Identity issuance endpoints
//!
//! Public routes: anonymous issuance, email registration and session token
//! verification. None of them pass through the quota gate.

use axum::{extract::State, routing::post, Router};
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::{Tier, TierPolicy};
use crate::infrastructure::auth::{AuthService, IssuedIdentity};

pub fn create_auth_router() -> Router<AppState> {
    Router::new()
        .route("/anonymous", post(issue_anonymous))
        .route("/register", post(register))
        .route("/verify", post(verify))
}

/// Issuance response; `apiKey` is shown once and never stored in the clear
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    pub user_id: String,
    pub api_key: String,
    pub token: String,
    pub tier: Tier,
    pub rate_limit: TierPolicy,
}

impl From<IssuedIdentity> for IssueResponse {
    fn from(issued: IssuedIdentity) -> Self {
        let tier = issued.identity.tier();
        Self {
            user_id: issued.identity.id().to_string(),
            api_key: issued.credential,
            token: issued.token,
            tier,
            rate_limit: AuthService::tier_policy(tier),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub user_id: String,
    pub tier: Tier,
    pub rate_limit: TierPolicy,
}

/// POST /api/auth/anonymous
pub async fn issue_anonymous(
    State(state): State<AppState>,
) -> Result<Json<IssueResponse>, ApiError> {
    let issued = state.auth_service.issue_anonymous().await?;
    Ok(Json(issued.into()))
}

/// POST /api/auth/register
///
/// Returns 400 when the email is malformed.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<IssueResponse>, ApiError> {
    let issued = state.auth_service.issue_registered(&request.email).await?;
    Ok(Json(issued.into()))
}

/// POST /api/auth/verify
pub async fn verify(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let claims = state
        .auth_service
        .verify_token(&request.token)
        .ok_or_else(|| ApiError::unauthorized("Invalid token"))?;

    Ok(Json(VerifyResponse {
        user_id: claims.sub,
        tier: claims.tier,
        rate_limit: AuthService::tier_policy(claims.tier),
    }))
}

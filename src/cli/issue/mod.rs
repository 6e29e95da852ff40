//! Issue command - mints a credential without going through HTTP

use clap::Args;
use tracing::warn;

use crate::api::auth::IssueResponse;
use crate::config::AppConfig;
use crate::infrastructure::auth::AuthService;
use crate::infrastructure::logging::{init_logging, LoggingConfig};
use crate::infrastructure::store::StoreBackend;

#[derive(Debug, Args)]
pub struct IssueArgs {
    /// Register this address (free tier); anonymous when omitted
    #[arg(long)]
    pub email: Option<String>,
}

pub async fn run(args: IssueArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_logging(&LoggingConfig::from(&config.logging));

    if config.store.backend == StoreBackend::Memory {
        warn!("Memory store backend: the issued credential is forgotten when this command exits");
    }

    let stores = crate::create_stores(&config).await?;
    let auth_service = crate::create_auth_service(&config, &stores);

    let response = issue(&auth_service, args.email.as_deref()).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}

async fn issue(auth_service: &AuthService, email: Option<&str>) -> anyhow::Result<IssueResponse> {
    let issued = match email {
        Some(email) => auth_service.issue_registered(email).await?,
        None => auth_service.issue_anonymous().await?,
    };
    Ok(issued.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Tier;
    use crate::infrastructure::store::StoreFactory;

    fn service() -> AuthService {
        crate::create_auth_service(&AppConfig::default(), &StoreFactory::create_in_memory())
    }

    #[tokio::test]
    async fn test_issue_anonymous() {
        let response = issue(&service(), None).await.unwrap();
        assert_eq!(response.tier, Tier::Anonymous);
        assert!(response.api_key.starts_with("mcp_anon_"));
    }

    #[tokio::test]
    async fn test_issue_registered() {
        let service = service();
        let response = issue(&service, Some("dev@example.com")).await.unwrap();

        assert_eq!(response.tier, Tier::Free);
        let found = service.find_by_email("dev@example.com").await.unwrap().unwrap();
        assert_eq!(found.id().as_str(), response.user_id);
    }

    #[tokio::test]
    async fn test_issue_rejects_bad_email() {
        assert!(issue(&service(), Some("nope")).await.is_err());
    }
}

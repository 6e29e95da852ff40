//! Reset-quota command

use clap::Args;
use tracing::info;

use crate::config::AppConfig;
use crate::infrastructure::logging::{init_logging, LoggingConfig};
use crate::infrastructure::rate_limit::RateLimiter;

#[derive(Debug, Args)]
pub struct ResetQuotaArgs {
    /// Identity whose usage counter is cleared
    pub identity_id: String,
}

pub async fn run(args: ResetQuotaArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_logging(&LoggingConfig::from(&config.logging));

    let stores = crate::create_stores(&config).await?;
    let limiter = RateLimiter::new(stores.counters);

    if limiter.reset(&args.identity_id).await? {
        info!(identity_id = %args.identity_id, "Usage counter cleared");
        println!("Quota reset for {}", args.identity_id);
    } else {
        println!("No active usage window for {}", args.identity_id);
    }

    Ok(())
}

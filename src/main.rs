use clap::Parser;
use mcp_gateway::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run().await,
        Command::Issue(args) => cli::issue::run(args).await,
        Command::ResetQuota(args) => cli::quota::run(args).await,
    }
}

//! CLI module for MCP Gateway
//!
//! Subcommands:
//! - `serve`: run the gateway HTTP server
//! - `issue`: issue a credential against the configured store
//! - `reset-quota`: clear an identity's usage counter

pub mod issue;
pub mod quota;
pub mod serve;

use clap::{Parser, Subcommand};

/// MCP Gateway - credential issuance, quotas and upstream proxying
#[derive(Parser)]
#[command(name = "mcp-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the gateway server
    Serve,

    /// Issue a credential (anonymous unless --email is given) and print it as JSON
    Issue(issue::IssueArgs),

    /// Clear the usage counter of an identity
    ResetQuota(quota::ResetQuotaArgs),
}

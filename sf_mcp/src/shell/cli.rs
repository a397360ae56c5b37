//! # sf_mcp CLI
//!
//! Command-line definition and entry point for the stdio MCP server.

use anyhow::{Context, Result};
use clap::Parser;
use rmcp::ServiceExt;
use std::time::Duration;

use crate::config::{DEFAULT_CLI_PROGRAM, DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_TIMEOUT_SECS, ExecutorConfig};
use crate::dispatcher::Dispatcher;
use crate::mcp_service::SalesforceMcpService;
use crate::utils::logging::init_logging;

/// Salesforce CLI MCP server: exposes `sf` commands as MCP tools over stdio.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Cli {
    /// Salesforce CLI executable to run
    #[arg(long, env = "SF_BINARY", default_value = DEFAULT_CLI_PROGRAM)]
    pub sf_binary: String,

    /// Per-command timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Combined stdout + stderr limit per command, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_OUTPUT_BYTES)]
    pub max_output_bytes: usize,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Write logs to a daily rolling file instead of stderr
    #[arg(long)]
    pub log_to_file: bool,
}

impl Cli {
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::with_program(self.sf_binary.clone())
            .timeout(Duration::from_secs(self.timeout))
            .max_output_bytes(self.max_output_bytes)
    }
}

/// Parses the command line and serves MCP over stdio until the client disconnects.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "info" };
    init_logging(log_level, cli.log_to_file)?;

    let config = cli.executor_config();
    tracing::info!(
        program = %config.program,
        timeout_secs = config.timeout.as_secs(),
        max_output_bytes = config.max_output_bytes,
        "Starting Salesforce CLI MCP server on stdio"
    );

    let service = SalesforceMcpService::new(Dispatcher::new(config))
        .serve(rmcp::transport::stdio())
        .await
        .context("Failed to start stdio transport")?;

    let reason = service.waiting().await.context("MCP service terminated abnormally")?;
    tracing::info!("MCP session ended: {:?}", reason);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_config_constants() {
        let cli = Cli::try_parse_from(["sf_mcp"]).unwrap();
        assert_eq!(cli.executor_config(), ExecutorConfig::default());
        assert!(!cli.debug);
        assert!(!cli.log_to_file);
    }

    #[test]
    fn flags_override_executor_bounds() {
        let cli = Cli::try_parse_from([
            "sf_mcp",
            "--sf-binary",
            "/opt/sf/bin/sf",
            "--timeout",
            "30",
            "--max-output-bytes",
            "4096",
        ])
        .unwrap();
        let config = cli.executor_config();
        assert_eq!(config.program, "/opt/sf/bin/sf");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_output_bytes, 4096);
    }
}

use clap::Parser;
use sf_http_bridge::{BridgeConfig, session::DEFAULT_SESSION_IDLE_TIMEOUT, start_bridge};
use sf_mcp::config::{
    DEFAULT_CLI_PROGRAM, DEFAULT_HTTP_PORT, DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_TIMEOUT_SECS,
    ExecutorConfig, PORT_ENV_VAR,
};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Salesforce CLI MCP server over HTTP (MCP Streamable HTTP + REST).
#[derive(Parser, Debug)]
#[command(name = "sf_http_bridge")]
#[command(version, about)]
struct Args {
    /// Interface to bind.
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port to listen on.
    #[arg(long, env = PORT_ENV_VAR, default_value_t = DEFAULT_HTTP_PORT)]
    port: u16,

    /// Salesforce CLI executable to run.
    #[arg(long, env = "SF_BINARY", default_value = DEFAULT_CLI_PROGRAM)]
    sf_binary: String,

    /// Per-command timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Combined stdout + stderr limit per command, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_OUTPUT_BYTES)]
    max_output_bytes: usize,

    /// Seconds a session may sit idle, with no SSE stream open, before it is removed.
    #[arg(long, default_value_t = DEFAULT_SESSION_IDLE_TIMEOUT.as_secs())]
    session_idle_timeout: u64,
}

impl Args {
    fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            bind_addr: SocketAddr::new(self.host, self.port),
            executor: ExecutorConfig::with_program(self.sf_binary.clone())
                .timeout(Duration::from_secs(self.timeout))
                .max_output_bytes(self.max_output_bytes),
            session_idle_timeout: Duration::from_secs(self.session_idle_timeout),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,sf_mcp=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Args::parse().bridge_config();
    tracing::info!("Starting Salesforce CLI MCP HTTP server on {}", config.bind_addr);
    tracing::info!("CLI program: {}", config.executor.program);

    start_bridge(config).await?;
    Ok(())
}

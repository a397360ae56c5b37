//! # Runtime Configuration
//!
//! Fixed defaults for the dispatch core and the transports. Binaries expose a
//! handful of these through `clap`; everything else is decided at build time.

use std::time::Duration;

/// Name of the Salesforce CLI executable.
pub const DEFAULT_CLI_PROGRAM: &str = "sf";

/// Wall-clock limit for a single CLI invocation.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Combined stdout + stderr ceiling for a single CLI invocation (10 MiB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Environment variable selecting the HTTP transport's port.
pub const PORT_ENV_VAR: &str = "MCP_PORT";

/// Port used by the HTTP transport when `MCP_PORT` is unset.
pub const DEFAULT_HTTP_PORT: u16 = 3000;

/// Service name reported by the server info and health endpoints.
pub const SERVICE_NAME: &str = "salesforce-cli-mcp-server";

/// Settings for [`crate::executor::ProcessExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Program every invocation runs (normally `sf`).
    pub program: String,
    /// Kill the child once this much wall-clock time has elapsed.
    pub timeout: Duration,
    /// Kill the child once stdout and stderr together exceed this many bytes.
    pub max_output_bytes: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_CLI_PROGRAM.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

impl ExecutorConfig {
    /// Uses `program` instead of `sf`, keeping the default bounds.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_output_bytes(mut self, limit: usize) -> Self {
        self.max_output_bytes = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bounds_match_cli_limits() {
        let config = ExecutorConfig::default();
        assert_eq!(config.program, "sf");
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert_eq!(config.max_output_bytes, 10_485_760);
    }

    #[test]
    fn builder_overrides_only_requested_fields() {
        let config = ExecutorConfig::with_program("/opt/sf/bin/sf").timeout(Duration::from_secs(5));
        assert_eq!(config.program, "/opt/sf/bin/sf");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_output_bytes, DEFAULT_MAX_OUTPUT_BYTES);
    }
}

//! # Salesforce CLI MCP HTTP Server
//!
//! Serves the `sf_mcp` dispatch core over HTTP:
//!
//! *   **MCP Streamable HTTP** on `/mcp`: `POST` for JSON-RPC requests, `GET` for the
//!     per-session SSE stream, `DELETE` to end a session (identified by the
//!     `Mcp-Session-Id` header).
//! *   **REST**: `POST /api/execute`, `GET /api/tools`, `GET /health`, `GET /api/status`.
//!
//! Tool calls run in-process; there is no subprocess per session.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sf_http_bridge::{BridgeConfig, start_bridge};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = BridgeConfig {
//!         bind_addr: "127.0.0.1:3000".parse()?,
//!         ..BridgeConfig::default()
//!     };
//!     start_bridge(config).await?;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod error;
pub mod request_handler;
pub mod rest;
pub mod session;

pub use bridge::{BridgeConfig, BridgeState, build_router, start_bridge};
pub use error::{BridgeError, Result};
pub use session::{Session, SessionManager, SessionTerminationReason};

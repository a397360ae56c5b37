//! # Salesforce CLI MCP Server
//!
//! Exposes a fixed catalog of Salesforce CLI (`sf`) operations as MCP tools.
//!
//! Every transport funnels tool calls through the same dispatch core:
//!
//! 1. [`registry`] looks up the tool and validates the caller's arguments.
//! 2. [`flags`] turns the validated [`registry::ArgumentRecord`] into CLI flags.
//! 3. [`executor`] runs the assembled invocation as a bounded child process.
//! 4. [`normalizer`] decodes the captured output (JSON, then stdout, then stderr).
//! 5. [`dispatcher`] ties the steps together and always answers with a
//!    [`dispatcher::ResponseEnvelope`].
//!
//! The stdio transport lives in [`mcp_service`]; the HTTP transport is the
//! `sf_http_bridge` crate.

pub mod config;
pub mod dispatcher;
pub mod executor;
pub mod flags;
pub mod mcp_service;
pub mod normalizer;
pub mod registry;
pub mod shell;
pub mod test_utils;
pub mod utils;

pub use dispatcher::{DispatchError, Dispatcher, ResponseEnvelope};
pub use mcp_service::SalesforceMcpService;

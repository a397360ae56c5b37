//! # Shell Module
//!
//! Entry point and argument parsing for the `sf_mcp` binary.

pub mod cli;

pub use cli::{Cli, run};

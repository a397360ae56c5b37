//! # Output Normalizer
//!
//! Picks the single payload a successful CLI run is reported with. Three tiers, first
//! match wins:
//!
//! 1. stdout parses as JSON → the parsed value;
//! 2. stdout is non-empty → the raw stdout text;
//! 3. otherwise → the raw stderr text (possibly empty).
//!
//! Normalization cannot fail.

use serde_json::Value;

use crate::executor::ExecutionResult;

#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedOutput {
    Json(Value),
    Stdout(String),
    Stderr(String),
}

impl NormalizedOutput {
    /// Envelope payload: parsed JSON as-is, text tiers as JSON strings.
    pub fn into_value(self) -> Value {
        match self {
            NormalizedOutput::Json(value) => value,
            NormalizedOutput::Stdout(text) | NormalizedOutput::Stderr(text) => Value::String(text),
        }
    }

    pub fn tier(&self) -> &'static str {
        match self {
            NormalizedOutput::Json(_) => "json",
            NormalizedOutput::Stdout(_) => "stdout",
            NormalizedOutput::Stderr(_) => "stderr",
        }
    }
}

pub fn normalize(result: &ExecutionResult) -> NormalizedOutput {
    if let Ok(value) = serde_json::from_str::<Value>(&result.stdout) {
        return NormalizedOutput::Json(value);
    }
    // Whitespace-only stdout still counts as output.
    if !result.stdout.is_empty() {
        return NormalizedOutput::Stdout(result.stdout.clone());
    }
    NormalizedOutput::Stderr(result.stderr.clone())
}

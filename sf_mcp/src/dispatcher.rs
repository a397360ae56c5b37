//! # Tool Dispatcher
//!
//! The pipeline shared by every transport:
//!
//! `lookup → validate → build invocation → execute → normalize → envelope`
//!
//! [`Dispatcher::dispatch`] never fails and never panics on caller input. Whatever goes
//! wrong along the way comes back as [`ResponseEnvelope::Failure`], so transports only
//! have to serialize the envelope.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::ExecutorConfig;
use crate::executor::{CommandInvocation, ExecutionError, ProcessExecutor};
use crate::flags::to_flag_args;
use crate::normalizer::normalize;
use crate::registry::{
    self, CommandTemplate, ToolDefinition, ValidationError, split_command, validate,
    validate_raw_command,
};

/// Outcome of one tool call, independent of transport.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEnvelope {
    Success { data: Value },
    Failure { error: String },
}

impl ResponseEnvelope {
    pub fn success(data: Value) -> Self {
        ResponseEnvelope::Success { data }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        ResponseEnvelope::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResponseEnvelope::Success { .. })
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            ResponseEnvelope::Success { data } => Some(data),
            ResponseEnvelope::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ResponseEnvelope::Success { .. } => None,
            ResponseEnvelope::Failure { error } => Some(error),
        }
    }

    /// `{"success": true, "data": ...}` or `{"success": false, "error": "..."}`.
    pub fn to_value(&self) -> Value {
        // Only a `Value` and a `String` are serialized, neither of which can fail.
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl Serialize for ResponseEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ResponseEnvelope", 2)?;
        match self {
            ResponseEnvelope::Success { data } => {
                state.serialize_field("success", &true)?;
                state.serialize_field("data", data)?;
            }
            ResponseEnvelope::Failure { error } => {
                state.serialize_field("success", &false)?;
                state.serialize_field("error", error)?;
            }
        }
        state.end()
    }
}

impl From<Result<Value, DispatchError>> for ResponseEnvelope {
    fn from(result: Result<Value, DispatchError>) -> Self {
        match result {
            Ok(data) => ResponseEnvelope::success(data),
            Err(e) => ResponseEnvelope::failure(e.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Salesforce CLI command failed: {0}")]
    Execution(#[from] ExecutionError),
}

/// Stateless entry point into the dispatch core. Clone freely; clones share nothing
/// mutable, so concurrent calls never contend.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    executor: ProcessExecutor,
}

impl Dispatcher {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            executor: ProcessExecutor::new(config),
        }
    }

    /// The tool catalog, in declaration order.
    pub fn tools(&self) -> &'static [ToolDefinition] {
        registry::registry().tools()
    }

    /// Runs `name` with `raw` arguments and wraps the outcome.
    pub async fn dispatch(&self, name: &str, raw: Option<&Map<String, Value>>) -> ResponseEnvelope {
        let result = self.try_dispatch(name, raw).await;
        if let Err(e) = &result {
            tracing::warn!(tool = name, "Tool call failed: {}", e);
        }
        result.into()
    }

    /// Like [`dispatch`](Self::dispatch) but keeps the typed error.
    pub async fn try_dispatch(
        &self,
        name: &str,
        raw: Option<&Map<String, Value>>,
    ) -> Result<Value, DispatchError> {
        let invocation = self.build_invocation(name, raw)?;
        tracing::debug!(tool = name, %invocation, "Dispatching tool call");
        self.run(&invocation).await
    }

    /// Looks up, validates and translates a call without running anything.
    pub fn build_invocation(
        &self,
        name: &str,
        raw: Option<&Map<String, Value>>,
    ) -> Result<CommandInvocation, DispatchError> {
        let tool = registry::lookup(name).ok_or_else(|| DispatchError::UnknownTool(name.to_string()))?;

        let args = match tool.command {
            CommandTemplate::Prefix(prefix) => {
                let record = validate(tool, raw)?;
                prefix
                    .iter()
                    .map(|token| token.to_string())
                    .chain(to_flag_args(&record))
                    .collect()
            }
            CommandTemplate::RawCommand => validate_raw_command(raw)?,
        };

        Ok(self.executor.invocation(args))
    }

    /// Runs a raw command line (everything after `sf`) through the same executor and
    /// normalizer as the tools.
    pub async fn execute_raw(&self, command: &str) -> Result<Value, DispatchError> {
        let words = split_command(command)?;
        self.run(&self.executor.invocation(words)).await
    }

    async fn run(&self, invocation: &CommandInvocation) -> Result<Value, DispatchError> {
        let result = self.executor.run(invocation).await?;
        let output = normalize(&result);
        tracing::debug!(tier = output.tier(), "Normalized CLI output");
        Ok(output.into_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::catalog;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn envelope_serializes_to_wire_shape() {
        let ok = ResponseEnvelope::success(json!({ "status": 0 }));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({ "success": true, "data": { "status": 0 } })
        );
        let err = ResponseEnvelope::failure("boom");
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({ "success": false, "error": "boom" })
        );
        assert_eq!(err.to_value(), serde_json::to_value(&err).unwrap());
    }

    #[test]
    fn to_value_matches_serialized_form_for_both_variants() {
        for envelope in [
            ResponseEnvelope::success(json!([{ "alias": "dev" }])),
            ResponseEnvelope::success(Value::Null),
            ResponseEnvelope::failure("Unknown tool: sf_nonexistent"),
        ] {
            assert_eq!(envelope.to_value(), serde_json::to_value(&envelope).unwrap());
        }
        assert_eq!(
            ResponseEnvelope::success(Value::Null).to_value(),
            json!({ "success": true, "data": null })
        );
    }

    #[test]
    fn builds_prefix_plus_flag_arguments() {
        let dispatcher = Dispatcher::default();
        let invocation = dispatcher
            .build_invocation(
                catalog::DATA_QUERY,
                Some(&args(json!({ "query": "SELECT Id FROM Account", "bulk": true }))),
            )
            .unwrap();
        assert_eq!(invocation.program(), "sf");
        assert_eq!(
            invocation.args(),
            ["data", "query", "--json", "--query", "SELECT Id FROM Account", "--bulk"]
        );
    }

    #[test]
    fn builds_raw_command_from_shell_words() {
        let dispatcher = Dispatcher::new(ExecutorConfig::with_program("/usr/local/bin/sf"));
        let invocation = dispatcher
            .build_invocation(
                catalog::CUSTOM_COMMAND,
                Some(&args(json!({ "command": "org display --target-org 'my org'" }))),
            )
            .unwrap();
        assert_eq!(invocation.program(), "/usr/local/bin/sf");
        assert_eq!(invocation.args(), ["org", "display", "--target-org", "my org"]);
    }

    #[test]
    fn unknown_tool_is_reported_by_name() {
        let err = Dispatcher::default()
            .build_invocation("sf_nonexistent", None)
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown tool: sf_nonexistent");
    }

    #[tokio::test]
    async fn unknown_tool_yields_failure_envelope_without_spawning() {
        let dispatcher = Dispatcher::new(ExecutorConfig::with_program("/nonexistent/sf"));
        let envelope = dispatcher.dispatch("sf_nonexistent", None).await;
        assert_eq!(
            envelope.to_value(),
            json!({ "success": false, "error": "Unknown tool: sf_nonexistent" })
        );
    }

    #[tokio::test]
    async fn validation_errors_become_failure_envelopes() {
        let dispatcher = Dispatcher::new(ExecutorConfig::with_program("/nonexistent/sf"));
        let envelope = dispatcher
            .dispatch(catalog::DATA_QUERY, Some(&args(json!({ "bulk": true }))))
            .await;
        assert_eq!(envelope.error(), Some("Missing required parameter 'query'"));
    }

    #[tokio::test]
    async fn spawn_failures_are_wrapped_as_cli_failures() {
        let dispatcher = Dispatcher::new(ExecutorConfig::with_program("/nonexistent/sf"));
        let envelope = dispatcher.dispatch(catalog::ORG_LIST, None).await;
        let error = envelope.error().unwrap();
        assert!(error.starts_with("Salesforce CLI command failed: "), "{error}");
    }

    #[test]
    fn dispatcher_is_shareable_across_tasks() {
        fn assert_send_sync<T: Send + Sync + Clone + 'static>() {}
        assert_send_sync::<Dispatcher>();
    }
}

//! # MCP Service
//!
//! `SalesforceMcpService` implements `rmcp::ServerHandler` on top of the
//! [`Dispatcher`]. It is transport-agnostic: the stdio binary serves it directly, and
//! the HTTP bridge reuses [`SalesforceMcpService::tools`] and
//! [`SalesforceMcpService::call`] to answer JSON-RPC requests itself.
//!
//! Results map onto MCP as follows:
//!
//! - success: one text content item holding the pretty-printed `data`;
//! - failure: `isError: true` with the text `Error: <message>`.

pub mod schema;

use rmcp::{
    handler::server::ServerHandler,
    model::{
        CallToolRequestParams, CallToolResult, Content, ErrorData as McpError, Implementation,
        ListToolsResult, PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo,
        Tool, ToolsCapability,
    },
    service::{NotificationContext, RequestContext, RoleServer},
};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::dispatcher::{Dispatcher, ResponseEnvelope};
use crate::registry::ToolDefinition;

#[derive(Clone, Default)]
pub struct SalesforceMcpService {
    dispatcher: Arc<Dispatcher>,
}

impl SalesforceMcpService {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// MCP descriptors for the whole catalog, in declaration order.
    pub fn tools(&self) -> Vec<Tool> {
        self.dispatcher.tools().iter().map(tool_descriptor).collect()
    }

    /// Dispatches one call and renders the envelope as an MCP result.
    pub async fn call(&self, name: &str, arguments: Option<&Map<String, Value>>) -> CallToolResult {
        let envelope = self.dispatcher.dispatch(name, arguments).await;
        envelope_to_result(envelope)
    }
}

fn tool_descriptor(tool: &ToolDefinition) -> Tool {
    Tool {
        name: tool.name.into(),
        title: Some(tool.name.to_string()),
        icons: None,
        description: Some(tool.description.into()),
        input_schema: schema::input_schema(tool),
        output_schema: None,
        annotations: None,
        meta: None,
    }
}

/// Converts a [`ResponseEnvelope`] into MCP's tool result shape.
pub fn envelope_to_result(envelope: ResponseEnvelope) -> CallToolResult {
    match envelope {
        ResponseEnvelope::Success { data } => {
            let text = serde_json::to_string_pretty(&data).unwrap_or_else(|_| data.to_string());
            CallToolResult::success(vec![Content::text(text)])
        }
        ResponseEnvelope::Failure { error } => {
            CallToolResult::error(vec![Content::text(format!("Error: {error}"))])
        }
    }
}

impl ServerHandler for SalesforceMcpService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
                ..Default::default()
            },
            server_info: Implementation {
                name: crate::config::SERVICE_NAME.to_string(),
                title: Some("Salesforce CLI MCP Server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Run Salesforce CLI (sf) commands. Each tool maps to one sf command and returns its JSON output."
                    .to_string(),
            ),
        }
    }

    fn on_initialized(
        &self,
        context: NotificationContext<RoleServer>,
    ) -> impl std::future::Future<Output = ()> + Send + '_ {
        async move {
            let client = context
                .peer
                .peer_info()
                .map(|info| format!("{} {}", info.client_info.name, info.client_info.version));
            tracing::info!(
                "Client connected: {}",
                client.as_deref().unwrap_or("unknown client")
            );
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        async move {
            Ok(ListToolsResult {
                meta: None,
                tools: self.tools(),
                next_cursor: None,
            })
        }
    }

    fn call_tool(
        &self,
        params: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            tracing::info!(tool = %params.name, "tools/call");
            Ok(self.call(params.name.as_ref(), params.arguments.as_ref()).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutorConfig;
    use serde_json::json;

    fn first_text(result: &CallToolResult) -> String {
        result
            .content
            .iter()
            .find_map(|c| c.as_text().map(|t| t.text.clone()))
            .unwrap_or_default()
    }

    #[test]
    fn lists_all_catalog_tools_with_schemas() {
        let tools = SalesforceMcpService::default().tools();
        assert_eq!(tools.len(), 8);
        assert_eq!(tools[0].name, "sf_org_list");
        let custom = tools.iter().find(|t| t.name == "sf_custom_command").unwrap();
        assert_eq!(custom.input_schema["required"], json!(["command"]));
    }

    #[test]
    fn success_envelope_is_pretty_printed_text() {
        let result = envelope_to_result(ResponseEnvelope::success(json!({ "status": 0 })));
        assert!(!result.is_error.unwrap_or(false));
        assert_eq!(first_text(&result), "{\n  \"status\": 0\n}");
    }

    #[test]
    fn failure_envelope_is_flagged_as_error() {
        let result = envelope_to_result(ResponseEnvelope::failure("Unknown tool: nope"));
        assert!(result.is_error.unwrap_or(false));
        assert_eq!(first_text(&result), "Error: Unknown tool: nope");
    }

    #[tokio::test]
    async fn unknown_tool_call_reports_error_text() {
        let service = SalesforceMcpService::new(Dispatcher::new(ExecutorConfig::with_program(
            "/nonexistent/sf",
        )));
        let result = service.call("sf_nonexistent", None).await;
        assert!(result.is_error.unwrap_or(false));
        assert_eq!(first_text(&result), "Error: Unknown tool: sf_nonexistent");
    }

    #[test]
    fn server_info_advertises_tools() {
        let info = SalesforceMcpService::default().get_info();
        assert!(info.capabilities.tools.is_some());
        assert_eq!(info.server_info.name, "salesforce-cli-mcp-server");
    }
}

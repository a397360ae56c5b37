//! Plain REST façade: `/api/execute`, `/api/tools`, `/health`, `/api/status`.

use crate::bridge::BridgeState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use sf_mcp::{DispatchError, config::SERVICE_NAME};
use std::sync::Arc;
use tracing::{info, warn};

/// Reported in `mode` by `/health` and `/api/status`.
pub const MODE: &str = "http";

#[derive(Debug, Serialize)]
pub struct ToolSummary {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Vec<&'static str>,
}

/// `POST /api/execute {"command": "..."}`: runs `sf <command>`.
pub async fn execute_command(
    State(state): State<Arc<BridgeState>>,
    Json(body): Json<Value>,
) -> Response {
    let command = body
        .get("command")
        .and_then(Value::as_str)
        .filter(|c| !c.trim().is_empty());
    let Some(command) = command else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Command is required" })),
        )
            .into_response();
    };

    info!(%command, "REST execute");
    match state.service.dispatcher().execute_raw(command).await {
        Ok(data) => Json(json!({ "success": true, "data": data, "command": command })).into_response(),
        Err(e) => {
            warn!(%command, "REST execute failed: {}", e);
            let status = match &e {
                DispatchError::Validation(_) => StatusCode::BAD_REQUEST,
                DispatchError::UnknownTool(_) | DispatchError::Execution(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            (
                status,
                Json(json!({ "success": false, "error": e.to_string(), "command": command })),
            )
                .into_response()
        }
    }
}

/// `GET /api/tools`: the catalog in human-readable form.
pub async fn list_tools(State(state): State<Arc<BridgeState>>) -> Json<Value> {
    let tools: Vec<ToolSummary> = state
        .service
        .dispatcher()
        .tools()
        .iter()
        .map(|tool| ToolSummary {
            name: tool.name,
            description: tool.description,
            parameters: tool.parameters.iter().map(|p| p.name).collect(),
        })
        .collect();
    Json(json!({ "tools": tools }))
}

/// `GET /health`
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        "service": SERVICE_NAME,
        "mode": MODE,
    }))
}

/// `GET /api/status`
pub async fn status(State(state): State<Arc<BridgeState>>) -> Json<Value> {
    Json(json!({
        "service": "Salesforce CLI MCP Server",
        "version": env!("CARGO_PKG_VERSION"),
        "mode": MODE,
        "uptime": state.started_at.elapsed().as_secs_f64(),
        "sessions": state.sessions.session_count(),
        "features": ["rest-api", "mcp-protocol"],
        "endpoints": {
            "health": "/health",
            "status": "/api/status",
            "tools": "/api/tools",
            "execute": "/api/execute",
            "mcp": "/mcp",
        },
    }))
}

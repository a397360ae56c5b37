//! JSON-RPC handling for `POST /mcp`.
//!
//! Requests are answered in-process by [`SalesforceMcpService`]; nothing is proxied.
//! The response body is plain JSON, or a single-event SSE stream when the client's
//! `Accept` header asks for `text/event-stream` without also accepting JSON.

use crate::session::{Session, SessionManager};
use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
};
use rmcp::ServerHandler;
use serde_json::{Map, Value, json};
use sf_mcp::SalesforceMcpService;
use std::convert::Infallible;
use tracing::{debug, info, warn};

/// MCP Session-Id header name (per MCP spec 2025-03-26)
pub const MCP_SESSION_ID_HEADER: &str = "mcp-session-id";

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

/// Create a JSON response with the provided status.
pub fn json_response_with_status(status: StatusCode, value: &Value) -> Response {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(value).unwrap_or_default()))
        .unwrap_or_else(|_| (status, "Failed to create response").into_response())
}

/// Build a JSON-RPC error object.
pub fn json_rpc_error_value(id: Option<&Value>, code: i32, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id.cloned().unwrap_or(Value::Null),
        "error": {
            "code": code,
            "message": message
        }
    })
}

fn json_rpc_result_value(id: &Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

/// Attach MCP session header when available.
fn with_session_header(mut response: Response, session_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(session_id) {
        response.headers_mut().insert(MCP_SESSION_ID_HEADER, value);
    }
    response
}

fn error_response(status: StatusCode, id: Option<&Value>, code: i32, message: &str) -> Response {
    json_response_with_status(status, &json_rpc_error_value(id, code, message))
}

/// True when the client wants the reply as an event stream rather than JSON.
pub fn prefers_event_stream(headers: &HeaderMap) -> bool {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    accept.contains("text/event-stream") && !accept.contains("application/json")
}

/// Wraps a JSON-RPC reply in the representation the client negotiated.
fn reply(headers: &HeaderMap, body: Value) -> Response {
    if prefers_event_stream(headers) {
        let data = body.to_string();
        let stream = futures::stream::iter([Ok::<_, Infallible>(
            Event::default().event("message").data(data),
        )]);
        Sse::new(stream).into_response()
    } else {
        json_response_with_status(StatusCode::OK, &body)
    }
}

fn session_id_from(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(MCP_SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
}

fn is_client_response(method: Option<&str>, payload: &Value) -> bool {
    method.is_none()
        && payload.get("id").is_some()
        && (payload.get("result").is_some() || payload.get("error").is_some())
}

/// Entry point for one `POST /mcp` body.
pub async fn handle_mcp_request(
    service: &SalesforceMcpService,
    sessions: &SessionManager,
    headers: &HeaderMap,
    payload: Value,
) -> Response {
    if payload.is_array() {
        return error_response(
            StatusCode::BAD_REQUEST,
            None,
            INVALID_REQUEST,
            "Batch requests are not supported",
        );
    }
    let Some(message) = payload.as_object() else {
        return error_response(
            StatusCode::BAD_REQUEST,
            None,
            INVALID_REQUEST,
            "Request body must be a JSON-RPC object",
        );
    };

    let method = message.get("method").and_then(Value::as_str);
    let id = message.get("id");
    let session_id = session_id_from(headers);

    debug!(
        method = ?method,
        session_id = ?session_id,
        has_id = id.is_some(),
        "Incoming MCP request"
    );

    if message.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return error_response(
            StatusCode::BAD_REQUEST,
            id,
            INVALID_REQUEST,
            "Invalid Request: jsonrpc must be \"2.0\"",
        );
    }

    if method == Some("initialize") {
        return handle_initialize(service, sessions, headers, id, message.get("params"));
    }

    let Some(session_id) = session_id else {
        return error_response(
            StatusCode::BAD_REQUEST,
            id,
            INVALID_REQUEST,
            "Missing Mcp-Session-Id header. Send initialize request first.",
        );
    };
    let Some(session) = sessions.get_session(session_id) else {
        warn!(session_id = %session_id, "Request for non-existent or terminated session");
        return error_response(
            StatusCode::NOT_FOUND,
            id,
            INVALID_REQUEST,
            "Session not found or terminated",
        );
    };
    session.touch();

    let response = handle_session_request(service, &session, headers, method, id, &payload).await;
    with_session_header(response, &session.id)
}

fn handle_initialize(
    service: &SalesforceMcpService,
    sessions: &SessionManager,
    headers: &HeaderMap,
    id: Option<&Value>,
    params: Option<&Value>,
) -> Response {
    let Some(id) = id else {
        return error_response(
            StatusCode::BAD_REQUEST,
            None,
            INVALID_REQUEST,
            "initialize must be a request with an id",
        );
    };
    let Some(protocol_version) = params
        .and_then(|p| p.get("protocolVersion"))
        .and_then(Value::as_str)
    else {
        return error_response(
            StatusCode::BAD_REQUEST,
            Some(id),
            INVALID_PARAMS,
            "Invalid initialize params: missing params.protocolVersion",
        );
    };
    let client_name = params
        .and_then(|p| p.pointer("/clientInfo/name"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    let result = match serde_json::to_value(service.get_info()) {
        Ok(result) => result,
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                Some(id),
                INTERNAL_ERROR,
                &format!("Failed to encode server info: {e}"),
            );
        }
    };

    let session = sessions.create_session(protocol_version, client_name);
    with_session_header(reply(headers, json_rpc_result_value(id, result)), &session.id)
}

async fn handle_session_request(
    service: &SalesforceMcpService,
    session: &Session,
    headers: &HeaderMap,
    method: Option<&str>,
    id: Option<&Value>,
    payload: &Value,
) -> Response {
    if is_client_response(method, payload) {
        debug!(session_id = %session.id, "Ignoring client response; no server requests are outstanding");
        return StatusCode::ACCEPTED.into_response();
    }

    let Some(method) = method else {
        return error_response(
            StatusCode::BAD_REQUEST,
            id,
            INVALID_REQUEST,
            "Invalid Request: missing method",
        );
    };

    // Notifications carry no id and get no body.
    let Some(id) = id else {
        if method == "notifications/initialized" {
            session.mark_initialized();
        } else {
            debug!(session_id = %session.id, method, "Notification ignored");
        }
        return StatusCode::ACCEPTED.into_response();
    };

    let params = payload.get("params");
    let body = match method {
        "ping" => json_rpc_result_value(id, json!({})),
        "tools/list" => match serde_json::to_value(service.tools()) {
            Ok(tools) => json_rpc_result_value(id, json!({ "tools": tools })),
            Err(e) => json_rpc_error_value(Some(id), INTERNAL_ERROR, &e.to_string()),
        },
        "tools/call" => handle_tool_call(service, session, id, params).await,
        other => {
            debug!(session_id = %session.id, method = other, "Unknown method");
            json_rpc_error_value(Some(id), METHOD_NOT_FOUND, &format!("Method not found: {other}"))
        }
    };
    reply(headers, body)
}

async fn handle_tool_call(
    service: &SalesforceMcpService,
    session: &Session,
    id: &Value,
    params: Option<&Value>,
) -> Value {
    let Some(name) = params.and_then(|p| p.get("name")).and_then(Value::as_str) else {
        return json_rpc_error_value(Some(id), INVALID_PARAMS, "Invalid params: missing tool name");
    };
    let arguments: Option<&Map<String, Value>> = match params.and_then(|p| p.get("arguments")) {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map),
        Some(_) => {
            return json_rpc_error_value(
                Some(id),
                INVALID_PARAMS,
                "Invalid params: arguments must be an object",
            );
        }
    };
    let progress_token = params
        .and_then(|p| p.pointer("/_meta/progressToken"))
        .cloned();

    info!(session_id = %session.id, tool = name, "tools/call");

    if let Some(token) = &progress_token {
        send_progress(session, token, 0, &format!("Running {name}"));
    }
    let result = service.call(name, arguments).await;
    if let Some(token) = &progress_token {
        send_progress(session, token, 1, &format!("Finished {name}"));
    }

    match serde_json::to_value(&result) {
        Ok(result) => json_rpc_result_value(id, result),
        Err(e) => json_rpc_error_value(Some(id), INTERNAL_ERROR, &e.to_string()),
    }
}

fn send_progress(session: &Session, token: &Value, progress: u64, message: &str) {
    let notification = json!({
        "jsonrpc": "2.0",
        "method": "notifications/progress",
        "params": {
            "progressToken": token,
            "progress": progress,
            "total": 1,
            "message": message
        }
    });
    if let Err(e) = session.notify(&notification) {
        warn!(session_id = %session.id, "Failed to queue progress notification: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_stream_is_chosen_only_when_json_is_not_accepted() {
        let mut headers = HeaderMap::new();
        assert!(!prefers_event_stream(&headers));

        headers.insert(header::ACCEPT, HeaderValue::from_static("text/event-stream"));
        assert!(prefers_event_stream(&headers));

        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json, text/event-stream"),
        );
        assert!(!prefers_event_stream(&headers));
    }

    #[test]
    fn error_value_echoes_id() {
        let value = json_rpc_error_value(Some(&json!(7)), METHOD_NOT_FOUND, "nope");
        assert_eq!(
            value,
            json!({ "jsonrpc": "2.0", "id": 7, "error": { "code": -32601, "message": "nope" } })
        );
        assert_eq!(json_rpc_error_value(None, PARSE_ERROR, "bad")["id"], Value::Null);
    }

    #[test]
    fn client_responses_are_recognised() {
        let response = json!({ "jsonrpc": "2.0", "id": 1, "result": {} });
        assert!(is_client_response(None, &response));
        let request = json!({ "jsonrpc": "2.0", "id": 1, "method": "ping" });
        assert!(!is_client_response(Some("ping"), &request));
    }
}

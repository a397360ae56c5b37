//! HTTP transport: router, shared state and server startup.

use crate::error::{BridgeError, Result};
use crate::request_handler::{self, INVALID_REQUEST, MCP_SESSION_ID_HEADER, PARSE_ERROR};
use crate::rest;
use crate::session::{DEFAULT_SESSION_IDLE_TIMEOUT, SessionManager, SessionTerminationReason};
use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::stream::StreamExt;
use serde_json::Value;
use sf_mcp::{Dispatcher, SalesforceMcpService, config::ExecutorConfig};
use std::{
    convert::Infallible,
    net::{Ipv4Addr, SocketAddr},
    sync::{Arc, Weak, atomic::Ordering},
    time::{Duration, Instant},
};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer, ExposeHeaders},
    trace::TraceLayer,
};
use tracing::{debug, info, warn};

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Address to bind. Port 0 picks a free port.
    pub bind_addr: SocketAddr,
    /// Bounds and program for every CLI invocation.
    pub executor: ExecutorConfig,
    /// Sessions idle this long with no SSE stream are terminated.
    pub session_idle_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, sf_mcp::config::DEFAULT_HTTP_PORT)),
            executor: ExecutorConfig::default(),
            session_idle_timeout: DEFAULT_SESSION_IDLE_TIMEOUT,
        }
    }
}

/// State shared by every handler.
pub struct BridgeState {
    pub service: SalesforceMcpService,
    pub sessions: SessionManager,
    pub started_at: Instant,
}

impl BridgeState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            service: SalesforceMcpService::new(dispatcher),
            sessions: SessionManager::new(),
            started_at: Instant::now(),
        }
    }
}

/// Build a CORS layer appropriate for the bind address.
///
/// Loopback binds only accept browser origins on loopback hosts; anything else
/// accepts any origin.
fn build_cors_layer(bind_addr: &SocketAddr) -> CorsLayer {
    let methods = AllowMethods::list([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS]);
    let headers = AllowHeaders::list([
        axum::http::header::CONTENT_TYPE,
        axum::http::header::ACCEPT,
        axum::http::HeaderName::from_static(MCP_SESSION_ID_HEADER),
        axum::http::HeaderName::from_static("last-event-id"),
    ]);
    let expose = ExposeHeaders::list([axum::http::HeaderName::from_static(MCP_SESSION_ID_HEADER)]);

    let origin = if bind_addr.ip().is_loopback() {
        AllowOrigin::predicate(|origin: &HeaderValue, _req: &axum::http::request::Parts| {
            let Ok(origin) = origin.to_str() else {
                return false;
            };
            let lower = origin.to_ascii_lowercase();
            lower.starts_with("http://127.0.0.1")
                || lower.starts_with("http://localhost")
                || lower.starts_with("http://[::1]")
        })
    } else {
        AllowOrigin::any()
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(methods)
        .allow_headers(headers)
        .expose_headers(expose)
}

/// All routes, with CORS for `bind_addr` and request tracing.
pub fn build_router(state: Arc<BridgeState>, bind_addr: &SocketAddr) -> Router {
    Router::new()
        .route("/health", get(rest::health_check))
        .route("/api/status", get(rest::status))
        .route("/api/tools", get(rest::list_tools))
        .route("/api/execute", post(rest::execute_command))
        .route(
            "/mcp",
            post(handle_mcp_post)
                .get(handle_sse_stream)
                .delete(handle_session_delete),
        )
        .layer(build_cors_layer(bind_addr))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// How often the reaper wakes for a given idle timeout.
fn reap_interval(idle_timeout: Duration) -> Duration {
    (idle_timeout / 4).clamp(Duration::from_millis(100), Duration::from_secs(60))
}

/// Periodically terminates idle sessions. Stops once `state` is dropped.
fn spawn_session_reaper(state: Weak<BridgeState>, idle_timeout: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(reap_interval(idle_timeout));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(state) = state.upgrade() else {
                break;
            };
            let reaped = state.sessions.reap_idle(idle_timeout);
            if reaped > 0 {
                info!(
                    reaped,
                    remaining = state.sessions.session_count(),
                    "Reaped idle sessions"
                );
            }
        }
    })
}

/// Binds `config.bind_addr` and serves until Ctrl-C.
pub async fn start_bridge(config: BridgeConfig) -> Result<()> {
    if !config.bind_addr.ip().is_loopback() {
        warn!(
            "HTTP server bound to non-loopback address {}. \
             CORS allows any origin and there is no authentication.",
            config.bind_addr
        );
    }

    let state = Arc::new(BridgeState::new(Dispatcher::new(config.executor.clone())));
    let app = build_router(state.clone(), &config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .map_err(|e| BridgeError::HttpServer(format!("Failed to bind {}: {}", config.bind_addr, e)))?;
    let local_addr = listener.local_addr()?;

    info!("HTTP server listening on http://{}", local_addr);
    info!("MCP endpoint: http://{}/mcp", local_addr);
    info!("REST endpoint: http://{}/api/execute", local_addr);

    let reaper = spawn_session_reaper(Arc::downgrade(&state), config.session_idle_timeout);

    // Graceful shutdown waits for open connections, so SSE streams are closed first.
    let shutdown_state = state.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutdown requested");
            shutdown_state
                .sessions
                .terminate_all(SessionTerminationReason::Shutdown);
        })
        .await;

    reaper.abort();
    served.map_err(|e| BridgeError::HttpServer(format!("Server error: {}", e)))?;
    Ok(())
}

/// `POST /mcp`: one JSON-RPC message.
async fn handle_mcp_post(
    State(state): State<Arc<BridgeState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            debug!("Unparseable MCP request body: {}", e);
            return request_handler::json_response_with_status(
                StatusCode::BAD_REQUEST,
                &request_handler::json_rpc_error_value(None, PARSE_ERROR, "Parse error"),
            );
        }
    };
    request_handler::handle_mcp_request(&state.service, &state.sessions, &headers, payload).await
}

fn session_id_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get(MCP_SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// `GET /mcp`: server-to-client SSE stream for a session.
async fn handle_sse_stream(State(state): State<Arc<BridgeState>>, headers: HeaderMap) -> Response {
    let Some(session_id) = session_id_from(&headers) else {
        return request_handler::json_response_with_status(
            StatusCode::BAD_REQUEST,
            &request_handler::json_rpc_error_value(
                None,
                INVALID_REQUEST,
                "Missing Mcp-Session-Id header",
            ),
        );
    };
    let Some(session) = state.sessions.get_session(&session_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    info!(session_id = %session_id, "SSE stream opened");
    session.touch();

    // The stream holds the lag counter and the close signal, never the session, so
    // terminating the session ends it.
    let lagged = session.lag_counter();
    let closed = session.closed();
    let stream = BroadcastStream::new(session.subscribe())
        .filter_map(move |result| {
            let lagged = lagged.clone();
            let session_id = session_id.clone();
            async move {
                match result {
                    Ok(message) => Some(Ok::<_, Infallible>(Event::default().event("message").data(message))),
                    Err(BroadcastStreamRecvError::Lagged(n)) => {
                        let total = lagged.fetch_add(n, Ordering::Relaxed) + n;
                        warn!(
                            session_id = %session_id,
                            lagged_count = n,
                            total_lagged = total,
                            "SSE receiver lagged; events dropped"
                        );
                        Some(Ok(Event::default().comment(format!("lagged: {n} events dropped"))))
                    }
                }
            }
        })
        .take_until(closed);

    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}

/// `DELETE /mcp`: ends a session. 204 on success, 400 without the header, 404 when
/// the session is unknown.
async fn handle_session_delete(
    State(state): State<Arc<BridgeState>>,
    headers: HeaderMap,
) -> Response {
    let Some(session_id) = session_id_from(&headers) else {
        return (StatusCode::BAD_REQUEST, "Missing Mcp-Session-Id header").into_response();
    };

    match state
        .sessions
        .terminate_session(&session_id, SessionTerminationReason::ClientRequested)
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            debug!(session_id = %session_id, "DELETE for unknown session: {}", e);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

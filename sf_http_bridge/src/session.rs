//! # Session Management
//!
//! MCP Streamable HTTP sessions. A session is created by `initialize`, identified by
//! the `Mcp-Session-Id` header on every later request, and ends on `DELETE /mcp`.
//!
//! Tool calls run in-process through the shared dispatcher, so a session only carries
//! protocol state: whether the client has sent `notifications/initialized`, and a
//! broadcast channel feeding its `GET /mcp` SSE stream.
//!
//! Clients that disappear without sending `DELETE` are reclaimed by
//! [`SessionManager::reap_idle`] once they have been idle for the configured timeout
//! with no SSE stream attached.

use crate::error::{BridgeError, Result};
use dashmap::DashMap;
use serde_json::Value;
use std::future::Future;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

/// Messages buffered per SSE subscriber before it starts lagging.
const SSE_CHANNEL_CAPACITY: usize = 100;

/// Sessions with no traffic and no SSE stream for this long are removed.
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTerminationReason {
    /// HTTP DELETE from the client
    ClientRequested,
    /// Server shutting down
    Shutdown,
    /// No requests and no SSE stream for longer than the idle timeout
    IdleTimeout,
}

/// Protocol state of one connected client.
pub struct Session {
    pub id: String,
    /// `protocolVersion` the client asked for in `initialize`.
    pub protocol_version: String,
    /// `clientInfo.name` from `initialize`, if sent.
    pub client_name: Option<String>,
    broadcast_tx: broadcast::Sender<String>,
    closed_tx: watch::Sender<bool>,
    initialized: AtomicBool,
    terminated: AtomicBool,
    lagged_events: Arc<AtomicU64>,
    created_at: Instant,
    /// Milliseconds after `created_at` of the last request.
    last_activity_ms: AtomicU64,
}

impl Session {
    fn new(id: String, protocol_version: String, client_name: Option<String>) -> Self {
        let (broadcast_tx, _) = broadcast::channel::<String>(SSE_CHANNEL_CAPACITY);
        let (closed_tx, _) = watch::channel(false);
        Self {
            id,
            protocol_version,
            client_name,
            broadcast_tx,
            closed_tx,
            initialized: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
            lagged_events: Arc::new(AtomicU64::new(0)),
            created_at: Instant::now(),
            last_activity_ms: AtomicU64::new(0),
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// True once the client has sent `notifications/initialized`.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn mark_initialized(&self) {
        if !self.initialized.swap(true, Ordering::SeqCst) {
            debug!(session_id = %self.id, "Session initialized");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.broadcast_tx.subscribe()
    }

    /// Number of open SSE streams.
    pub fn subscriber_count(&self) -> usize {
        self.broadcast_tx.receiver_count()
    }

    /// Pushes a server-initiated JSON-RPC message to every open SSE stream.
    ///
    /// Returns the number of streams that received it; zero when nobody is listening.
    pub fn notify(&self, message: &Value) -> Result<usize> {
        let text = serde_json::to_string(message)?;
        Ok(self.broadcast_tx.send(text).unwrap_or(0))
    }

    /// Resolves once the session is terminated. Owns everything it needs, so SSE
    /// streams can wait on it without keeping the session alive.
    pub fn closed(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.closed_tx.subscribe();
        async move {
            let _ = rx.wait_for(|closed| *closed).await;
        }
    }

    /// Shared count of events dropped by lagging SSE receivers.
    pub fn lag_counter(&self) -> Arc<AtomicU64> {
        self.lagged_events.clone()
    }

    /// Records client activity, resetting the idle clock.
    pub fn touch(&self) {
        let elapsed = self.created_at.elapsed().as_millis() as u64;
        self.last_activity_ms.fetch_max(elapsed, Ordering::Relaxed);
    }

    /// Time since the last request (or since creation).
    pub fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_activity_ms.load(Ordering::Relaxed));
        self.created_at.elapsed().saturating_sub(last)
    }

    pub fn age_secs(&self) -> u64 {
        self.created_at.elapsed().as_secs()
    }
}

/// Registry of live sessions, keyed by session id.
#[derive(Default)]
pub struct SessionManager {
    sessions: DashMap<String, Arc<Session>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session with a fresh UUID v4 id.
    pub fn create_session(&self, protocol_version: &str, client_name: Option<String>) -> Arc<Session> {
        let id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(Session::new(id.clone(), protocol_version.to_string(), client_name));
        self.sessions.insert(id.clone(), session.clone());
        info!(
            session_id = %id,
            protocol_version = %protocol_version,
            client = ?session.client_name,
            "Session created"
        );
        session
    }

    pub fn get_session(&self, session_id: &str) -> Option<Arc<Session>> {
        self.sessions
            .get(session_id)
            .map(|entry| entry.value().clone())
            .filter(|session| !session.is_terminated())
    }

    pub fn session_exists(&self, session_id: &str) -> bool {
        self.get_session(session_id).is_some()
    }

    /// Removes the session and closes its SSE streams.
    pub fn terminate_session(&self, session_id: &str, reason: SessionTerminationReason) -> Result<()> {
        let (_, session) = self
            .sessions
            .remove(session_id)
            .ok_or_else(|| BridgeError::Session(format!("unknown session '{session_id}'")))?;
        session.terminated.store(true, Ordering::SeqCst);
        session.closed_tx.send_replace(true);
        info!(
            session_id = %session_id,
            reason = ?reason,
            age_secs = session.age_secs(),
            "Session terminated"
        );
        Ok(())
    }

    pub fn terminate_all(&self, reason: SessionTerminationReason) {
        let ids: Vec<String> = self.sessions.iter().map(|entry| entry.key().clone()).collect();
        for id in ids {
            let _ = self.terminate_session(&id, reason);
        }
    }

    /// Terminates every session that has been idle for at least `max_idle` and has no
    /// SSE stream attached. Returns how many were removed.
    pub fn reap_idle(&self, max_idle: Duration) -> usize {
        let idle: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| {
                let session = entry.value();
                session.subscriber_count() == 0 && session.idle_for() >= max_idle
            })
            .map(|entry| entry.key().clone())
            .collect();

        idle.iter()
            .filter(|id| {
                self.terminate_session(id, SessionTerminationReason::IdleTimeout)
                    .is_ok()
            })
            .count()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

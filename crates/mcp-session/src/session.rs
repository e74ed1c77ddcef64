//! Per-connection session state: the handshake phase, negotiated
//! capabilities, the pending-request registry, progress-token callbacks,
//! subscriptions, and the client-supplied transport context.
//!
//! One [`Session`] exists per connected peer, on both the client and the
//! server side of the engine — the struct is symmetric; only which fields
//! get populated (client's `roots`, server's `subscribed_uris`) differs by
//! role. Grounded in `turbomcp-client`'s per-connection state plus
//! `turbomcp-server::context`'s request-scoped context, reworked around the
//! explicit `Session` record in spec.md §3.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::RwLock;

use dashmap::DashMap;
use mcp_protocol::types::{LogLevel, Root, ServerCapabilities};
use mcp_protocol::{CapabilitySet, ProtocolVersion};

use crate::error::SessionError;
use crate::pending::PendingRegistry;
use crate::roots::RootSet;
use crate::session_id::SessionId;

/// Lifecycle phase of a session, per spec.md §3's invariants: only
/// `initialize`/`ping` are legal before `Active`, and `Terminating` rejects
/// all new work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Handshaking,
    Active,
    Terminating,
}

/// A progress callback, invoked on its own worker per spec.md §5 so a slow
/// callback never blocks the dispatcher.
pub type ProgressCallback = Arc<dyn Fn(f64, Option<f64>) + Send + Sync>;

/// Client-supplied context that travels with the session but is opaque to
/// the engine itself: the authenticated principal (if any) and whatever
/// metadata the transport attached (remote addr, headers, ...).
#[derive(Debug, Clone, Default)]
pub struct TransportContext {
    pub auth_principal: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// Per-connection session state.
pub struct Session {
    pub session_id: SessionId,
    phase: RwLock<Phase>,
    protocol_version: RwLock<Option<ProtocolVersion>>,
    capabilities: RwLock<Option<CapabilitySet>>,
    peer_info: RwLock<Option<mcp_protocol::types::Implementation>>,
    pub pending: Arc<PendingRegistry>,
    progress_callbacks: DashMap<String, ProgressCallback>,
    log_callback: RwLock<Option<Arc<dyn Fn(LogLevel, serde_json::Value, Option<String>) + Send + Sync>>>,
    log_level: RwLock<LogLevel>,
    subscribed_uris: RwLock<HashSet<String>>,
    roots: RwLock<RootSet>,
    pub transport_ctx: RwLock<TransportContext>,
}

impl Session {
    /// Build a fresh session in the `Handshaking` phase, with a pending
    /// registry wired to emit `notifications/cancelled` via `notify`.
    pub fn new(session_id: SessionId, pending: Arc<PendingRegistry>) -> Self {
        Self {
            session_id,
            phase: RwLock::new(Phase::Handshaking),
            protocol_version: RwLock::new(None),
            capabilities: RwLock::new(None),
            peer_info: RwLock::new(None),
            pending,
            progress_callbacks: DashMap::new(),
            log_callback: RwLock::new(None),
            log_level: RwLock::new(LogLevel::Info),
            subscribed_uris: RwLock::new(HashSet::new()),
            roots: RwLock::new(RootSet::new()),
            transport_ctx: RwLock::new(TransportContext::default()),
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.read().expect("session lock poisoned")
    }

    /// Persist the negotiated version/capabilities once `initialize`
    /// completes, but stay in `Handshaking` until `notifications/initialized`
    /// arrives (initiator) or is received (responder), per spec.md §4.6.
    pub fn record_handshake(
        &self,
        version: ProtocolVersion,
        capabilities: CapabilitySet,
        peer_info: mcp_protocol::types::Implementation,
    ) -> Result<(), SessionError> {
        if self.phase() != Phase::Handshaking {
            return Err(SessionError::AlreadyInitialized);
        }
        *self.protocol_version.write().expect("lock poisoned") = Some(version);
        *self.capabilities.write().expect("lock poisoned") = Some(capabilities);
        *self.peer_info.write().expect("lock poisoned") = Some(peer_info);
        Ok(())
    }

    /// Transition `Handshaking -> Active` on receipt of
    /// `notifications/initialized`. Capabilities are immutable from here on.
    pub fn activate(&self) -> Result<(), SessionError> {
        let mut phase = self.phase.write().expect("lock poisoned");
        if *phase != Phase::Handshaking {
            return Err(SessionError::AlreadyInitialized);
        }
        *phase = Phase::Active;
        Ok(())
    }

    /// Begin teardown: `Active|Handshaking -> Terminating`, draining the
    /// pending registry. Idempotent.
    pub fn begin_terminate(&self) {
        *self.phase.write().expect("lock poisoned") = Phase::Terminating;
        self.pending.cancel_all(crate::pending::CancelReason::SessionClosing);
    }

    /// Reject anything but `initialize`/`ping` before the handshake
    /// completes, per the phase invariant.
    pub fn check_phase_allows(&self, method: &str) -> Result<(), SessionError> {
        match self.phase() {
            Phase::Active => Ok(()),
            Phase::Terminating => Err(SessionError::Terminating),
            Phase::Handshaking => {
                if method == "initialize" || method == "ping" {
                    Ok(())
                } else {
                    Err(SessionError::NotInitialized(
                        "request received before initialize/initialized handshake completed",
                    ))
                }
            }
        }
    }

    pub fn protocol_version(&self) -> Option<ProtocolVersion> {
        *self.protocol_version.read().expect("lock poisoned")
    }

    pub fn capabilities(&self) -> Option<CapabilitySet> {
        self.capabilities.read().expect("lock poisoned").clone()
    }

    pub fn peer_info(&self) -> Option<mcp_protocol::types::Implementation> {
        self.peer_info.read().expect("lock poisoned").clone()
    }

    /// Check whether `feature`'s method may be dispatched outbound, per the
    /// capability-gating invariant. `initialize`/`ping` are always allowed.
    pub fn check_capability(&self, method: &str, feature: &str) -> Result<(), SessionError> {
        if method == "initialize" || method == "ping" {
            return Ok(());
        }
        match self.capabilities() {
            Some(caps) if caps.supports(feature) => Ok(()),
            _ => Err(SessionError::CapabilityNotSupported {
                feature: feature.to_string(),
            }),
        }
    }

    /// Register a progress callback for `token`, invoked off the dispatcher
    /// worker whenever a `notifications/progress` for this token arrives.
    pub fn register_progress_callback(&self, token: String, callback: ProgressCallback) {
        self.progress_callbacks.insert(token, callback);
    }

    /// Unregister a progress callback — called when the request it was
    /// attached to completes, per the spec's invariant that a progress
    /// token's handler dies with its request.
    pub fn unregister_progress_callback(&self, token: &str) {
        self.progress_callbacks.remove(token);
    }

    /// Route an incoming progress notification to its registered callback,
    /// if any, spawning it on its own task so a slow callback can't block
    /// dispatch.
    pub fn dispatch_progress(&self, token: &str, progress: f64, total: Option<f64>) {
        if let Some(callback) = self.progress_callbacks.get(token) {
            let callback = Arc::clone(&callback);
            tokio::spawn(async move { callback(progress, total) });
        } else {
            tracing::debug!(token, "progress notification for unknown token, dropping");
        }
    }

    pub fn set_log_level(&self, level: LogLevel) {
        *self.log_level.write().expect("lock poisoned") = level;
    }

    pub fn log_level(&self) -> LogLevel {
        *self.log_level.read().expect("lock poisoned")
    }

    pub fn set_log_callback(
        &self,
        callback: Arc<dyn Fn(LogLevel, serde_json::Value, Option<String>) + Send + Sync>,
    ) {
        *self.log_callback.write().expect("lock poisoned") = Some(callback);
    }

    pub fn dispatch_log(&self, level: LogLevel, data: serde_json::Value, logger: Option<String>) {
        if level < self.log_level() {
            return;
        }
        if let Some(callback) = self.log_callback.read().expect("lock poisoned").clone() {
            tokio::spawn(async move { callback(level, data, logger) });
        }
    }

    pub fn subscribe(&self, uri: String) {
        self.subscribed_uris.write().expect("lock poisoned").insert(uri);
    }

    pub fn unsubscribe(&self, uri: &str) {
        self.subscribed_uris.write().expect("lock poisoned").remove(uri);
    }

    pub fn is_subscribed(&self, uri: &str) -> bool {
        self.subscribed_uris.read().expect("lock poisoned").contains(uri)
    }

    pub fn subscribed_uris(&self) -> Vec<String> {
        self.subscribed_uris
            .read()
            .expect("lock poisoned")
            .iter()
            .cloned()
            .collect()
    }

    pub fn replace_roots(&self, roots: Vec<Root>) {
        self.roots.write().expect("lock poisoned").replace_all(roots);
    }

    pub fn roots(&self) -> Vec<Root> {
        self.roots.read().expect("lock poisoned").as_slice()
    }
}

/// Convenience for servers: whether `server_caps`'s advertised features are
/// compatible with what the client requires, used only for constructing the
/// initial [`CapabilitySet`] — day-to-day gating goes through
/// [`Session::check_capability`].
pub fn server_capabilities_or_default(caps: Option<ServerCapabilities>) -> ServerCapabilities {
    caps.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_protocol::types::{ClientCapabilities, Implementation, ToolsCapabilities};

    fn fresh_session() -> Session {
        Session::new(SessionId::new(), PendingRegistry::new())
    }

    fn impl_info() -> Implementation {
        Implementation {
            name: "test".into(),
            title: None,
            version: "1.0".into(),
        }
    }

    #[test]
    fn phase_starts_handshaking_and_gates_methods() {
        let session = fresh_session();
        assert_eq!(session.phase(), Phase::Handshaking);
        assert!(session.check_phase_allows("initialize").is_ok());
        assert!(session.check_phase_allows("ping").is_ok());
        assert!(session.check_phase_allows("tools/list").is_err());
    }

    #[test]
    fn activate_requires_handshake_first() {
        let session = fresh_session();
        assert!(session.activate().is_err());

        let caps = CapabilitySet::negotiate(ClientCapabilities::default(), ServerCapabilities::default());
        session
            .record_handshake(ProtocolVersion::parse("2025-06-18").unwrap(), caps, impl_info())
            .unwrap();
        assert!(session.activate().is_ok());
        assert_eq!(session.phase(), Phase::Active);
        assert!(session.check_phase_allows("tools/list").is_ok());
    }

    #[test]
    fn capability_gating_rejects_unnegotiated_feature() {
        let session = fresh_session();
        let caps = CapabilitySet::negotiate(
            ClientCapabilities::default(),
            ServerCapabilities {
                tools: Some(ToolsCapabilities::default()),
                ..Default::default()
            },
        );
        session
            .record_handshake(ProtocolVersion::parse("2025-06-18").unwrap(), caps, impl_info())
            .unwrap();
        session.activate().unwrap();

        assert!(session.check_capability("tools/list", "tools").is_ok());
        assert!(session.check_capability("prompts/list", "prompts").is_err());
        assert!(session.check_capability("ping", "anything").is_ok());
    }

    #[test]
    fn terminate_cancels_pending_and_rejects_new_work() {
        let session = fresh_session();
        session.begin_terminate();
        assert_eq!(session.phase(), Phase::Terminating);
        assert!(session.check_phase_allows("ping").is_err());
    }

    #[tokio::test]
    async fn progress_callback_fires_and_is_unregistered() {
        let session = fresh_session();
        let (tx, rx) = tokio::sync::oneshot::channel();
        let tx = std::sync::Mutex::new(Some(tx));
        session.register_progress_callback(
            "tok1".into(),
            Arc::new(move |progress, _total| {
                if let Some(tx) = tx.lock().unwrap().take() {
                    let _ = tx.send(progress);
                }
            }),
        );
        session.dispatch_progress("tok1", 0.5, None);
        let progress = rx.await.unwrap();
        assert_eq!(progress, 0.5);

        session.unregister_progress_callback("tok1");
        // Dispatching after unregister is a silent no-op.
        session.dispatch_progress("tok1", 1.0, None);
    }

    #[test]
    fn roots_round_trip_through_dedup_set() {
        let session = fresh_session();
        session.replace_roots(vec![Root {
            uri: "file:///a".into(),
            name: Some("A".into()),
        }]);
        assert_eq!(session.roots().len(), 1);
    }
}

//! Session storage: the bound-per-session state the streamable-HTTP router
//! needs beyond the generic [`mcp_session::Session`] — its outbound
//! [`mcp_engine::RequestEngine`], the fan-out transport that feeds the
//! long-lived GET stream(s), and the replay ring buffer for `Last-Event-ID`
//! resumption.
//!
//! Grounded in `turbomcp_transport_streamable::session::{SessionStore,
//! StoredEvent}`, reworked from a bare metadata record into the live,
//! in-process session handle this engine's dispatcher/request-engine pair
//! need, per SPEC_FULL.md §4.7's "SessionStore trait abstracts session
//! persistence" addition.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use mcp_engine::RequestEngine;
use mcp_session::{Session, SessionId};
use mcp_transport::{Transport, TransportError, TransportMessage, TransportResult, TransportState, TransportType};
use tokio::sync::{mpsc, RwLock};

use crate::config::ReplayWindow;
use crate::sse::SseEvent;

/// One event recorded for replay, keyed by the monotonic id assigned at
/// send time.
#[derive(Debug, Clone)]
pub struct StoredEvent {
    pub id: String,
    pub data: String,
    pub recorded_at: Instant,
}

/// A bounded, insertion-ordered buffer of recently sent events, pruned by
/// count and age per [`ReplayWindow`].
pub struct ReplayBuffer {
    window: ReplayWindow,
    events: VecDeque<StoredEvent>,
    next_id: u64,
}

impl ReplayBuffer {
    pub fn new(window: ReplayWindow) -> Self {
        Self {
            window,
            events: VecDeque::new(),
            next_id: 0,
        }
    }

    /// Record `data` under a freshly minted event id, pruning anything past
    /// the window's count/age limits, and return the id assigned.
    pub fn push(&mut self, data: String) -> String {
        let id = self.next_id.to_string();
        self.next_id += 1;
        self.events.push_back(StoredEvent {
            id: id.clone(),
            data,
            recorded_at: Instant::now(),
        });
        self.prune();
        id
    }

    fn prune(&mut self) {
        while self.events.len() > self.window.max_events {
            self.events.pop_front();
        }
        let max_age = self.window.max_age;
        while self
            .events
            .front()
            .is_some_and(|e| e.recorded_at.elapsed() > max_age)
        {
            self.events.pop_front();
        }
    }

    /// Events recorded strictly after `last_event_id`, in order. Returns an
    /// empty vec if `last_event_id` has already aged out of the buffer —
    /// at-most-once delivery, per spec.md §4.7's "MAY drop events older
    /// than its buffer".
    pub fn replay_after(&self, last_event_id: &str) -> Vec<StoredEvent> {
        let Some(pos) = self.events.iter().position(|e| e.id == last_event_id) else {
            return Vec::new();
        };
        self.events.iter().skip(pos + 1).cloned().collect()
    }
}

/// The `Transport` the request engine writes through for server-initiated
/// traffic on one streamable-HTTP session: every `send` is recorded into the
/// replay buffer and fanned out to every currently open GET stream.
pub struct SseTransport {
    replay: RwLock<ReplayBuffer>,
    subscribers: DashMap<u64, mpsc::UnboundedSender<SseEvent>>,
    next_subscriber_id: std::sync::atomic::AtomicU64,
}

impl SseTransport {
    pub fn new(window: ReplayWindow) -> Self {
        Self {
            replay: RwLock::new(ReplayBuffer::new(window)),
            subscribers: DashMap::new(),
            next_subscriber_id: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Register a new GET stream, returning its subscriber id (for later
    /// unregistration) and a receiver of live events. Replay of buffered
    /// history is the caller's job (via [`Self::replay_after`]) since it
    /// must happen before any live event can race ahead of it.
    pub async fn subscribe(&self) -> (u64, mpsc::UnboundedReceiver<SseEvent>) {
        let id = self.next_subscriber_id.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.insert(id, tx);
        (id, rx)
    }

    pub fn unsubscribe(&self, id: u64) {
        self.subscribers.remove(&id);
    }

    pub async fn replay_after(&self, last_event_id: &str) -> Vec<StoredEvent> {
        self.replay.read().await.replay_after(last_event_id)
    }
}

#[async_trait::async_trait]
impl Transport for SseTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::StreamableHttp
    }

    async fn state(&self) -> TransportState {
        TransportState::Connected
    }

    async fn connect(&self) -> TransportResult<()> {
        Ok(())
    }

    async fn disconnect(&self) -> TransportResult<()> {
        self.subscribers.clear();
        Ok(())
    }

    async fn send(&self, message: TransportMessage) -> TransportResult<()> {
        let data = String::from_utf8(message.payload.to_vec())
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        let id = self.replay.write().await.push(data.clone());
        let event = SseEvent::message(data).with_id(id).with_event("message");
        self.subscribers.retain(|_, tx| tx.send(event.clone()).is_ok());
        Ok(())
    }

    async fn receive(&self) -> TransportResult<Option<TransportMessage>> {
        // Inbound bytes for this transport arrive via the POST handler
        // calling the dispatcher directly, not through this trait method.
        Ok(None)
    }
}

impl std::fmt::Debug for SseTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SseTransport")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// Everything the router needs for one live `Mcp-Session-Id`.
pub struct HttpSession {
    pub session: Arc<Session>,
    pub engine: Arc<RequestEngine>,
    pub transport: Arc<SseTransport>,
}

impl HttpSession {
    pub fn new(session_id: SessionId, config: &crate::config::StreamableHttpConfig, engine_config: mcp_engine::EngineConfig) -> Self {
        let transport = Arc::new(SseTransport::new(config.replay_window));
        let (session, engine) = RequestEngine::new(session_id, Arc::clone(&transport) as Arc<dyn Transport>, engine_config);
        Self {
            session,
            engine: Arc::new(engine),
            transport,
        }
    }
}

/// Pluggable session persistence. The default in-memory store is all this
/// crate implements; swapping in a durable backend is the extension point
/// SPEC_FULL.md §4.7 calls out, not a Non-goal this engine itself delivers.
pub trait SessionStore: Send + Sync {
    fn insert(&self, id: SessionId, session: Arc<HttpSession>);
    fn get(&self, id: &SessionId) -> Option<Arc<HttpSession>>;
    fn remove(&self, id: &SessionId) -> Option<Arc<HttpSession>>;
}

/// The default, process-local session store.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<SessionId, Arc<HttpSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn insert(&self, id: SessionId, session: Arc<HttpSession>) {
        self.sessions.insert(id, session);
    }

    fn get(&self, id: &SessionId) -> Option<Arc<HttpSession>> {
        self.sessions.get(id).map(|e| Arc::clone(e.value()))
    }

    fn remove(&self, id: &SessionId) -> Option<Arc<HttpSession>> {
        self.sessions.remove(id).map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replay_buffer_returns_events_after_given_id() {
        let mut buf = ReplayBuffer::new(ReplayWindow { max_events: 10, max_age: Duration::from_secs(60) });
        let a = buf.push("a".into());
        let _b = buf.push("b".into());
        let _c = buf.push("c".into());

        let replayed = buf.replay_after(&a);
        assert_eq!(replayed.len(), 2);
        assert_eq!(replayed[0].data, "b");
        assert_eq!(replayed[1].data, "c");
    }

    #[test]
    fn replay_buffer_prunes_beyond_max_events() {
        let mut buf = ReplayBuffer::new(ReplayWindow { max_events: 2, max_age: Duration::from_secs(60) });
        buf.push("a".into());
        buf.push("b".into());
        buf.push("c".into());
        assert_eq!(buf.events.len(), 2);
        assert_eq!(buf.events.front().unwrap().data, "b");
    }

    #[test]
    fn replay_after_unknown_id_returns_empty() {
        let mut buf = ReplayBuffer::new(ReplayWindow::default());
        buf.push("a".into());
        assert!(buf.replay_after("does-not-exist").is_empty());
    }

    #[tokio::test]
    async fn in_memory_store_round_trips() {
        let store = InMemorySessionStore::new();
        let id = SessionId::new();
        let http_session = Arc::new(HttpSession::new(
            id.clone(),
            &crate::config::StreamableHttpConfig::default(),
            mcp_engine::EngineConfig::default(),
        ));
        store.insert(id.clone(), Arc::clone(&http_session));
        assert!(store.get(&id).is_some());
        assert!(store.remove(&id).is_some());
        assert!(store.get(&id).is_none());
    }

    #[tokio::test]
    async fn sse_transport_send_fans_out_to_subscribers() {
        let transport = SseTransport::new(ReplayWindow::default());
        let (_id, mut rx) = transport.subscribe().await;
        transport.send(TransportMessage::new(b"hello".to_vec())).await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.data, "hello");
    }
}

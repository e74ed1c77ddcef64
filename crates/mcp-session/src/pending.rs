//! The pending-request registry: the one cross-worker mutable structure a
//! session owns. Tracks outbound requests from the moment they're written to
//! the wire until exactly one of {response, error, timeout, cancel} resolves
//! them.
//!
//! Grounded in the teacher's `turbomcp-client::client::dispatcher::MessageDispatcher`
//! pending-request table (a `DashMap` keyed by request id, each entry a
//! oneshot sender) but reworked around the spec's explicit state machine
//! (`NEW -> SENT -> {RESOLVED|ERRORED|TIMED_OUT|CANCELLED_LOCAL|CANCELLED_REMOTE}`)
//! and batch fan-in.

use std::sync::Arc;
use std::time::Duration;

use dashmap::{DashMap, DashSet};
use mcp_protocol::RequestId;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::Instant;
use uuid::Uuid;

/// Why a pending request was resolved without an ordinary response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller's deadline elapsed with no response.
    Timeout,
    /// The caller explicitly cancelled the request.
    Local,
    /// The session is tearing down.
    SessionClosing,
}

impl CancelReason {
    /// The string carried in `notifications/cancelled.reason`.
    pub fn as_wire_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Local => "user",
            Self::SessionClosing => "session_closing",
        }
    }
}

/// The terminal outcome delivered to a pending request's continuation.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// A successful JSON-RPC response arrived.
    Resolved(Value),
    /// A JSON-RPC error response arrived.
    Errored {
        code: i64,
        message: String,
        data: Option<Value>,
    },
    /// No response arrived before the deadline.
    TimedOut,
    /// Cancelled locally, by the caller or by session teardown.
    Cancelled { reason: CancelReason },
}

/// A single outbound request awaiting resolution.
pub struct PendingRequest {
    pub id: RequestId,
    pub method: String,
    pub started_at: Instant,
    pub deadline: Instant,
    pub batch_id: Option<Uuid>,
    pub progress_token: Option<String>,
    continuation: oneshot::Sender<Outcome>,
}

/// What the caller supplies when registering a new pending request.
pub struct PendingSpec {
    pub method: String,
    pub timeout: Duration,
    pub batch_id: Option<Uuid>,
    pub progress_token: Option<String>,
}

/// Invoked whenever the registry resolves an entry via timeout or local
/// cancellation, so the embedding engine can write `notifications/cancelled`
/// to the wire. Never called for ordinary response/error resolution or for
/// remote-initiated outcomes, matching §4.3/§5's "emit on timeout/local
/// cancel only" rule.
pub type CancelNotifyFn = Arc<dyn Fn(RequestId, CancelReason) + Send + Sync>;

/// Concurrent map from request id to its in-flight entry, plus a secondary
/// batch index so batch fan-in (§4.5 `batch`) can wait on a whole group.
pub struct PendingRegistry {
    entries: DashMap<RequestId, PendingRequest>,
    batches: DashMap<Uuid, DashSet<RequestId>>,
    on_cancel_notify: Option<CancelNotifyFn>,
}

impl PendingRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: DashMap::new(),
            batches: DashMap::new(),
            on_cancel_notify: None,
        })
    }

    /// Build a registry that calls `notify` whenever a timeout or local
    /// cancellation needs to be announced to the peer.
    pub fn with_cancel_notifier(notify: CancelNotifyFn) -> Arc<Self> {
        Arc::new(Self {
            entries: DashMap::new(),
            batches: DashMap::new(),
            on_cancel_notify: Some(notify),
        })
    }

    /// Register a new pending request, arming its timeout timer.
    ///
    /// Returns the id to send on the wire and a receiver that resolves
    /// exactly once, to the request's terminal [`Outcome`].
    pub fn add(self: &Arc<Self>, id: RequestId, spec: PendingSpec) -> oneshot::Receiver<Outcome> {
        let (tx, rx) = oneshot::channel();
        let started_at = Instant::now();
        let deadline = started_at + spec.timeout;

        if let Some(batch_id) = spec.batch_id {
            self.batches
                .entry(batch_id)
                .or_insert_with(DashSet::new)
                .insert(id.clone());
        }

        self.entries.insert(
            id.clone(),
            PendingRequest {
                id: id.clone(),
                method: spec.method,
                started_at,
                deadline,
                batch_id: spec.batch_id,
                progress_token: spec.progress_token,
                continuation: tx,
            },
        );

        let registry = Arc::clone(self);
        let timer_id = id;
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            registry.timeout(&timer_id);
        });

        rx
    }

    /// Deliver a successful response, removing the entry. Idempotent: a
    /// second call for the same id is a no-op.
    pub fn resolve(&self, id: &RequestId, result: Value) -> bool {
        self.complete(id, Outcome::Resolved(result))
    }

    /// Deliver an error response, removing the entry.
    pub fn resolve_error(&self, id: &RequestId, code: i64, message: String, data: Option<Value>) -> bool {
        self.complete(id, Outcome::Errored { code, message, data })
    }

    /// Fire the timeout path for `id`: resolves with `TimedOut` and notifies
    /// the peer via the registered callback, unless the entry was already
    /// resolved by a (possibly late) response.
    pub fn timeout(&self, id: &RequestId) -> bool {
        if self.complete(id, Outcome::TimedOut) {
            if let Some(notify) = &self.on_cancel_notify {
                notify(id.clone(), CancelReason::Timeout);
            }
            true
        } else {
            false
        }
    }

    /// User-initiated cancellation of a single request.
    pub fn cancel(&self, id: &RequestId, reason: CancelReason) -> bool {
        if self.complete(id, Outcome::Cancelled { reason }) {
            if let Some(notify) = &self.on_cancel_notify {
                if matches!(reason, CancelReason::Local | CancelReason::Timeout) {
                    notify(id.clone(), reason);
                }
            }
            true
        } else {
            false
        }
    }

    /// Cancel every currently pending request (session teardown). Does not
    /// emit wire notifications — the session is going away regardless.
    pub fn cancel_all(&self, reason: CancelReason) {
        let ids: Vec<RequestId> = self.entries.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.complete(&id, Outcome::Cancelled { reason });
        }
    }

    /// Every member id of `batch_id`'s group, in no particular order; the
    /// caller reorders against its own request list to preserve batch order.
    pub fn batch_members(&self, batch_id: Uuid) -> Vec<RequestId> {
        self.batches
            .get(&batch_id)
            .map(|set| set.iter().map(|id| id.clone()).collect())
            .unwrap_or_default()
    }

    /// Read-only snapshot of every currently pending request id and method.
    pub fn list(&self) -> Vec<(RequestId, String)> {
        self.entries
            .iter()
            .map(|e| (e.key().clone(), e.value().method.clone()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn complete(&self, id: &RequestId, outcome: Outcome) -> bool {
        let Some((_, entry)) = self.entries.remove(id) else {
            return false;
        };
        if let Some(batch_id) = entry.batch_id {
            if let Some(set) = self.batches.get(&batch_id) {
                set.remove(id);
            }
        }
        // The receiver may already have been dropped (caller gave up); a
        // failed send here is not an error, per the "late response is
        // logged and dropped" rule in spec.md §7.
        let _ = entry.continuation.send(outcome);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    fn spec(method: &str, timeout: StdDuration) -> PendingSpec {
        PendingSpec {
            method: method.to_string(),
            timeout,
            batch_id: None,
            progress_token: None,
        }
    }

    #[tokio::test]
    async fn resolve_delivers_result_once() {
        let registry = PendingRegistry::new();
        let id = RequestId::Number(1);
        let rx = registry.add(id.clone(), spec("ping", StdDuration::from_secs(5)));

        assert!(registry.resolve(&id, serde_json::json!({"ok": true})));
        assert!(!registry.resolve(&id, serde_json::json!({"ok": true})));

        let outcome = rx.await.unwrap();
        assert!(matches!(outcome, Outcome::Resolved(_)));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn timeout_fires_after_deadline_and_notifies() {
        let notified = Arc::new(DashSet::new());
        let notified_clone = Arc::clone(&notified);
        let registry = PendingRegistry::with_cancel_notifier(Arc::new(move |id, reason| {
            assert_eq!(reason, CancelReason::Timeout);
            notified_clone.insert(id);
        }));
        let id = RequestId::Number(2);
        let rx = registry.add(id.clone(), spec("slow", StdDuration::from_millis(10)));

        let outcome = rx.await.unwrap();
        assert!(matches!(outcome, Outcome::TimedOut));
        assert!(notified.contains(&id));
    }

    #[tokio::test]
    async fn late_response_after_cancel_is_dropped_silently() {
        let registry = PendingRegistry::new();
        let id = RequestId::Number(3);
        let rx = registry.add(id.clone(), spec("slow", StdDuration::from_secs(5)));

        assert!(registry.cancel(&id, CancelReason::Local));
        let outcome = rx.await.unwrap();
        assert!(matches!(outcome, Outcome::Cancelled { reason: CancelReason::Local }));

        // A late response has nothing to resolve.
        assert!(!registry.resolve(&id, serde_json::json!(null)));
    }

    #[tokio::test]
    async fn cancel_all_drains_every_entry() {
        let registry = PendingRegistry::new();
        let a = RequestId::Number(1);
        let b = RequestId::Number(2);
        let rx_a = registry.add(a, spec("a", StdDuration::from_secs(5)));
        let rx_b = registry.add(b, spec("b", StdDuration::from_secs(5)));

        registry.cancel_all(CancelReason::SessionClosing);
        assert!(registry.is_empty());
        assert!(matches!(
            rx_a.await.unwrap(),
            Outcome::Cancelled { reason: CancelReason::SessionClosing }
        ));
        assert!(matches!(
            rx_b.await.unwrap(),
            Outcome::Cancelled { reason: CancelReason::SessionClosing }
        ));
    }

    #[tokio::test]
    async fn batch_members_groups_by_shared_batch_id() {
        let registry = PendingRegistry::new();
        let batch_id = Uuid::new_v4();
        let a = RequestId::Number(1);
        let b = RequestId::Number(2);
        registry.add(
            a.clone(),
            PendingSpec {
                method: "ping".into(),
                timeout: StdDuration::from_secs(5),
                batch_id: Some(batch_id),
                progress_token: None,
            },
        );
        registry.add(
            b.clone(),
            PendingSpec {
                method: "tools/list".into(),
                timeout: StdDuration::from_secs(5),
                batch_id: Some(batch_id),
                progress_token: None,
            },
        );

        let mut members = registry.batch_members(batch_id);
        members.sort_by_key(|id| id.to_string());
        assert_eq!(members, vec![a, b]);
    }
}

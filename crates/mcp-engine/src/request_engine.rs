//! The request engine: the application-facing half of the outbound call
//! lifecycle described in spec.md §4.5 — `call`, `notify`, `batch`,
//! `cancel`/`cancel_all`, `send_progress`.
//!
//! Grounded in `turbomcp-client::client::dispatcher::MessageDispatcher`'s
//! spawn-wait-send-await pattern over a oneshot channel, generalized from a
//! client-only call site into the symmetric shape either peer uses to make
//! outbound calls.

use std::sync::Arc;
use std::time::Duration;

use mcp_protocol::codec;
use mcp_protocol::ids::RequestIdAllocator;
use mcp_protocol::RequestId;
use mcp_transport::{Transport, TransportMessage};
use mcp_session::pending::{CancelReason, Outcome, PendingRegistry, PendingSpec};
use mcp_session::{ProgressCallback, Session, SessionId};
use serde_json::Value;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::dispatcher::feature_for_method;
use crate::error::EngineError;

/// Per-call overrides to the engine's defaults.
#[derive(Default)]
pub struct CallOptions {
    pub timeout: Option<Duration>,
    pub progress: Option<ProgressOptions>,
}

/// A progress callback to attach to one outbound call, per spec.md §4.5:
/// "if a progress callback is supplied, a token is generated when absent,
/// the callback is registered before the send, and is unregistered on
/// completion".
pub struct ProgressOptions {
    pub token: Option<String>,
    pub callback: ProgressCallback,
}

/// One outbound method call plus its parameters, for [`RequestEngine::batch`].
pub struct BatchOp {
    pub method: String,
    pub params: Option<Value>,
}

/// The outbound-call half of the engine: allocates ids, registers pending
/// entries, writes frames to the transport, and resolves callers from the
/// pending registry's terminal outcomes.
pub struct RequestEngine {
    session: Arc<Session>,
    transport: Arc<dyn Transport>,
    id_allocator: RequestIdAllocator,
    config: EngineConfig,
}

impl RequestEngine {
    /// Build a fresh session wired to write `notifications/cancelled` back
    /// through `transport` whenever the pending registry times out or
    /// cancels an entry locally, plus the request engine that owns it.
    pub fn new(session_id: SessionId, transport: Arc<dyn Transport>, config: EngineConfig) -> (Arc<Session>, Self) {
        let notify_transport = Arc::clone(&transport);
        let pending = PendingRegistry::with_cancel_notifier(Arc::new(move |id, reason| {
            let transport = Arc::clone(&notify_transport);
            let frame = codec::encode_notification(
                "notifications/cancelled",
                Some(serde_json::json!({ "requestId": request_id_to_value(&id), "reason": reason.as_wire_str() })),
            );
            tokio::spawn(async move {
                let bytes = frame.to_string().into_bytes();
                if let Err(e) = transport.send(TransportMessage::new(bytes)).await {
                    tracing::warn!(error = %e, "failed to send notifications/cancelled");
                }
            });
        }));

        let session = Arc::new(Session::new(session_id, pending));
        let engine = Self {
            session: Arc::clone(&session),
            transport,
            id_allocator: RequestIdAllocator::new(),
            config,
        };
        (session, engine)
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Send `method` and block until the peer resolves it, times out, or
    /// the caller cancels it.
    pub async fn call(&self, method: impl Into<String>, params: Option<Value>, opts: CallOptions) -> Result<Value, EngineError> {
        let method = method.into();
        self.session.check_phase_allows(&method)?;
        if let Some(feature) = feature_for_method(&method) {
            self.session.check_capability(&method, feature)?;
        }

        let id = self.id_allocator.next();
        let timeout = opts.timeout.unwrap_or(self.config.default_request_timeout);

        let progress_token = opts.progress.as_ref().map(|p| {
            p.token.clone().unwrap_or_else(mcp_protocol::ids::new_progress_token)
        });
        if let Some(progress) = &opts.progress {
            let token = progress_token.clone().expect("set above");
            self.session.register_progress_callback(token, Arc::clone(&progress.callback));
        }

        let rx = self.session.pending.add(
            id.clone(),
            PendingSpec {
                method: method.clone(),
                timeout,
                batch_id: None,
                progress_token: progress_token.clone(),
            },
        );

        let encoded = codec::encode_request(method, params, id.clone());
        let send_result = self.transport.send(TransportMessage::new(encoded.to_string().into_bytes())).await;

        let result = if let Err(err) = send_result {
            // The peer never received this request; resolve it locally so the
            // armed timeout never fires a spurious `notifications/cancelled`.
            self.session
                .pending
                .resolve_error(&id, -32000, format!("transport send failed: {err}"), None);
            let _ = rx.await;
            Err(EngineError::Transport(err))
        } else {
            let outcome = rx.await.map_err(|_| EngineError::ChannelClosed)?;
            outcome_to_result(outcome)
        };

        if let Some(token) = progress_token {
            self.session.unregister_progress_callback(&token);
        }

        result
    }

    /// Encode and send a notification; no response is expected.
    pub async fn notify(&self, method: impl Into<String>, params: Option<Value>) -> Result<(), EngineError> {
        let encoded = codec::encode_notification(method, params);
        self.transport
            .send(TransportMessage::new(encoded.to_string().into_bytes()))
            .await?;
        Ok(())
    }

    /// Send every op as one JSON-RPC batch array and await every member's
    /// resolution, returning results in request order (§4.5).
    pub async fn batch(&self, ops: Vec<BatchOp>, timeout: Option<Duration>) -> Result<Vec<Result<Value, EngineError>>, EngineError> {
        if ops.is_empty() {
            return Err(EngineError::InvalidBatch("batch must contain at least one operation".into()));
        }
        if ops.iter().any(|op| op.method == "initialize") {
            return Err(EngineError::InvalidBatch("a batch may not include `initialize`".into()));
        }
        for op in &ops {
            self.session.check_phase_allows(&op.method)?;
            if let Some(feature) = feature_for_method(&op.method) {
                self.session.check_capability(&op.method, feature)?;
            }
        }

        let timeout = timeout.unwrap_or(self.config.default_request_timeout);
        let batch_id = Uuid::new_v4();

        let mut encoded_frames = Vec::with_capacity(ops.len());
        let mut receivers = Vec::with_capacity(ops.len());
        for op in ops {
            let id = self.id_allocator.next();
            let rx = self.session.pending.add(
                id.clone(),
                PendingSpec {
                    method: op.method.clone(),
                    timeout,
                    batch_id: Some(batch_id),
                    progress_token: None,
                },
            );
            encoded_frames.push(codec::encode_request(op.method, op.params, id));
            receivers.push(rx);
        }

        let payload = codec::encode_batch(encoded_frames);
        self.transport
            .send(TransportMessage::new(payload.to_string().into_bytes()))
            .await?;

        let mut results = Vec::with_capacity(receivers.len());
        for rx in receivers {
            let outcome = rx.await.map_err(|_| EngineError::ChannelClosed)?;
            results.push(outcome_to_result(outcome));
        }
        Ok(results)
    }

    /// User-initiated cancellation of a single outbound request.
    pub fn cancel(&self, id: &RequestId, reason: &str) -> bool {
        let reason = if reason == "timeout" { CancelReason::Timeout } else { CancelReason::Local };
        self.session.pending.cancel(id, reason)
    }

    pub fn cancel_all(&self) {
        self.session.pending.cancel_all(CancelReason::SessionClosing);
    }

    /// Emit a `notifications/progress` for `token`.
    pub async fn send_progress(&self, token: &str, progress: f64, total: Option<f64>) -> Result<(), EngineError> {
        let mut params = serde_json::json!({ "progressToken": token, "progress": progress });
        if let Some(total) = total {
            params["total"] = serde_json::json!(total);
        }
        self.notify("notifications/progress", Some(params)).await
    }
}

fn request_id_to_value(id: &RequestId) -> Value {
    match id {
        RequestId::String(s) => Value::String(s.clone()),
        RequestId::Number(n) => serde_json::json!(n),
    }
}

fn outcome_to_result(outcome: Outcome) -> Result<Value, EngineError> {
    match outcome {
        Outcome::Resolved(value) => Ok(value),
        Outcome::Errored { code, message, data } => Err(EngineError::Remote { code, message, data }),
        Outcome::TimedOut => Err(EngineError::Timeout),
        Outcome::Cancelled { reason } => Err(EngineError::Cancelled { reason: reason.as_wire_str().to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mcp_transport::{TransportResult, TransportState, TransportType};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        fn transport_type(&self) -> TransportType {
            TransportType::Stdio
        }
        async fn state(&self) -> TransportState {
            TransportState::Connected
        }
        async fn connect(&self) -> TransportResult<()> {
            Ok(())
        }
        async fn disconnect(&self) -> TransportResult<()> {
            Ok(())
        }
        async fn send(&self, message: TransportMessage) -> TransportResult<()> {
            self.sent.lock().await.push(String::from_utf8(message.payload.to_vec()).unwrap());
            Ok(())
        }
        async fn receive(&self) -> TransportResult<Option<TransportMessage>> {
            Ok(None)
        }
    }

    impl std::fmt::Debug for RecordingTransport {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("RecordingTransport")
        }
    }

    #[tokio::test]
    async fn call_resolves_when_registry_delivers_response() {
        let transport = Arc::new(RecordingTransport::default());
        let (session, engine) = RequestEngine::new(SessionId::new(), transport.clone(), EngineConfig::default());
        let engine = Arc::new(engine);

        let call_future = engine.call("ping", None, CallOptions::default());
        tokio::pin!(call_future);

        // Give the call a chance to register its pending entry, then resolve it
        // as if the response had just arrived over the wire.
        tokio::task::yield_now().await;
        let ids: Vec<_> = session.pending.list();
        assert_eq!(ids.len(), 1);
        session.pending.resolve(&ids[0].0, serde_json::json!({"ok": true}));

        let result = call_future.await.unwrap();
        assert_eq!(result, serde_json::json!({"ok": true}));
        assert_eq!(transport.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn batch_rejects_empty_and_initialize() {
        let transport = Arc::new(RecordingTransport::default());
        let (_session, engine) = RequestEngine::new(SessionId::new(), transport, EngineConfig::default());

        assert!(matches!(engine.batch(vec![], None).await, Err(EngineError::InvalidBatch(_))));
        assert!(matches!(
            engine
                .batch(vec![BatchOp { method: "initialize".into(), params: None }], None)
                .await,
            Err(EngineError::InvalidBatch(_))
        ));
    }
}

//! The dispatcher: single entry point `on_frame` that decodes, classifies,
//! and routes wire bytes, per spec.md §4.4.
//!
//! Grounded in `turbomcp-client::client::dispatcher::MessageDispatcher`'s
//! background-task routing loop, adapted from a client-only response router
//! into a symmetric request/response/notification router that also serves
//! the built-in server-side methods via [`crate::registry::HandlerRegistry`].

use std::sync::Arc;

use mcp_protocol::codec::{self, CodecError};
use mcp_protocol::jsonrpc::{Frame, JsonRpcErrorCode, JsonRpcRequest, JsonRpcNotification, RequestId, ResponseId};
use mcp_protocol::types::{
    CallToolRequest, CallToolResult, GetPromptRequest, InitializeRequest, InitializeResult,
    ListPromptsRequest, ListPromptsResult, ListResourceTemplatesRequest, ListResourceTemplatesResult,
    ListResourcesRequest, ListResourcesResult, ListRootsResult, ListToolsRequest, ListToolsResult,
    LoggingNotification, ProgressNotification, ReadResourceRequest, ReadResourceResult, CancelledNotification,
    ServerCapabilities, SetLevelRequest, SubscribeRequest, UnsubscribeRequest,
};
use mcp_protocol::{CapabilitySet, ProtocolError, ProtocolVersion};
use mcp_protocol::version::{Feature, SUPPORTED_VERSIONS};
use mcp_session::Session;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::registry::HandlerRegistry;

/// What `on_frame` produces for the transport to write back, if anything.
#[derive(Debug)]
pub enum DispatchAction {
    /// Every frame in the payload was a notification/response: nothing to
    /// send, transports reply `202 Accepted` where that concept applies.
    NoReply,
    /// The input was a single (non-batch) request; one reply frame.
    Single(Value),
    /// The input was a batch payload that produced at least one reply.
    Batch(Vec<Value>),
}

/// Decodes, classifies, and routes JSON-RPC frames for one session.
///
/// Cheaply `Clone` (the registry is the only heap allocation, held behind an
/// `Arc`) so a spawned request worker can hold its own copy.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    local_info: mcp_protocol::types::Implementation,
    server_capabilities: ServerCapabilities,
    instructions: Option<String>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<HandlerRegistry>,
        local_info: mcp_protocol::types::Implementation,
        server_capabilities: ServerCapabilities,
    ) -> Self {
        Self {
            registry,
            local_info,
            server_capabilities,
            instructions: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Decode `bytes`, route every frame, and return what (if anything)
    /// should be written back to the transport.
    pub async fn on_frame(&self, bytes: &[u8], session: &Arc<Session>) -> DispatchAction {
        let is_batch_payload = looks_like_json_array(bytes);

        let frames = match codec::decode(bytes) {
            Ok(frames) => frames,
            Err(CodecError::Parse(e)) => {
                return DispatchAction::Single(codec::encode_error(
                    JsonRpcErrorCode::ParseError.code(),
                    JsonRpcErrorCode::ParseError.message(),
                    Some(serde_json::json!({ "detail": e.to_string() })),
                    ResponseId::null(),
                ));
            }
            Err(CodecError::InvalidRequest(message)) => {
                return DispatchAction::Single(codec::encode_error(
                    JsonRpcErrorCode::InvalidRequest.code(),
                    message,
                    None,
                    ResponseId::null(),
                ));
            }
        };

        if frames.len() > 1 {
            let supports_batch = session
                .protocol_version()
                .map(|v| v.supports(Feature::Batch))
                .unwrap_or(false);
            if !supports_batch {
                return DispatchAction::Single(codec::encode_error(
                    JsonRpcErrorCode::InvalidRequest.code(),
                    "batch payloads require the `batch` feature to be negotiated",
                    None,
                    ResponseId::null(),
                ));
            }
        }

        enum Slot {
            Empty,
            Pending(RequestId, tokio::task::JoinHandle<Value>),
        }

        let mut slots = Vec::with_capacity(frames.len());
        for frame in frames {
            match frame {
                Frame::Response(resp) => {
                    session.pending.resolve(&resp.id, resp.result);
                    slots.push(Slot::Empty);
                }
                Frame::Error(err) => {
                    if let Some(id) = err.id.0 {
                        session.pending.resolve_error(&id, err.error.code, err.error.message, err.error.data);
                    } else {
                        tracing::debug!("dropping error response with null id");
                    }
                    slots.push(Slot::Empty);
                }
                Frame::Notification(note) => {
                    self.spawn_notification(note, Arc::clone(session));
                    slots.push(Slot::Empty);
                }
                Frame::Request(req) => {
                    let id = req.id.clone();
                    let dispatcher = self.clone();
                    let session = Arc::clone(session);
                    let handle = tokio::spawn(async move { dispatcher.handle_request(req, session).await });
                    slots.push(Slot::Pending(id, handle));
                }
            }
        }

        let mut replies = Vec::new();
        for slot in slots {
            if let Slot::Pending(id, handle) = slot {
                let value = match handle.await {
                    Ok(value) => value,
                    Err(join_err) => {
                        tracing::error!(error = %join_err, "request handler task failed");
                        codec::encode_error(
                            JsonRpcErrorCode::InternalError.code(),
                            "handler task panicked",
                            None,
                            ResponseId::from(id),
                        )
                    }
                };
                replies.push(value);
            }
        }

        if replies.is_empty() {
            DispatchAction::NoReply
        } else if is_batch_payload {
            DispatchAction::Batch(replies)
        } else {
            DispatchAction::Single(replies.remove(0))
        }
    }

    async fn handle_request(&self, req: JsonRpcRequest, session: Arc<Session>) -> Value {
        let id = req.id.clone();
        match self.route_request(&req.method, req.params, &session).await {
            Ok(result) => codec::encode_response(result, id),
            Err(err) => {
                let (code, message, data) = err.to_jsonrpc_parts();
                codec::encode_error(code, message, data, ResponseId::from(id))
            }
        }
    }

    async fn route_request(
        &self,
        method: &str,
        params: Option<Value>,
        session: &Arc<Session>,
    ) -> Result<Value, ProtocolError> {
        session.check_phase_allows(method)?;
        if let Some(feature) = feature_for_method(method) {
            session.check_capability(method, feature)?;
        }

        match method {
            "initialize" => self.handle_initialize(params, session).await,
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => {
                let _req: ListToolsRequest = parse_optional(params)?;
                to_value(ListToolsResult {
                    tools: self.registry.list_tools(),
                    next_cursor: None,
                })
            }
            "tools/call" => {
                let req: CallToolRequest = parse_required(params)?;
                let tool = self
                    .registry
                    .tool(&req.name)
                    .ok_or_else(|| ProtocolError::invalid_params(format!("unknown tool: {}", req.name)))?;
                let result: CallToolResult = tool.call(req.arguments, Arc::clone(session)).await?;
                to_value(result)
            }
            "prompts/list" => {
                let _req: ListPromptsRequest = parse_optional(params)?;
                to_value(ListPromptsResult {
                    prompts: self.registry.list_prompts(),
                    next_cursor: None,
                })
            }
            "prompts/get" => {
                let req: GetPromptRequest = parse_required(params)?;
                let prompt = self
                    .registry
                    .prompt(&req.name)
                    .ok_or_else(|| ProtocolError::invalid_params(format!("unknown prompt: {}", req.name)))?;
                let result = prompt.get(req.arguments, Arc::clone(session)).await?;
                to_value(result)
            }
            "resources/list" => {
                let _req: ListResourcesRequest = parse_optional(params)?;
                to_value(ListResourcesResult {
                    resources: self.registry.list_resources(),
                    next_cursor: None,
                })
            }
            "resources/templates/list" => {
                let _req: ListResourceTemplatesRequest = parse_optional(params)?;
                to_value(ListResourceTemplatesResult {
                    resource_templates: self.registry.list_resource_templates(),
                    next_cursor: None,
                })
            }
            "resources/read" => {
                let req: ReadResourceRequest = parse_required(params)?;
                let resource = self
                    .registry
                    .resource(&req.uri)
                    .ok_or_else(|| ProtocolError::resource_not_found(&req.uri))?;
                let result: ReadResourceResult = resource.read(Arc::clone(session)).await?;
                to_value(result)
            }
            "resources/subscribe" => {
                let req: SubscribeRequest = parse_required(params)?;
                session.subscribe(req.uri);
                Ok(serde_json::json!({}))
            }
            "resources/unsubscribe" => {
                let req: UnsubscribeRequest = parse_required(params)?;
                session.unsubscribe(&req.uri);
                Ok(serde_json::json!({}))
            }
            "logging/setLevel" => {
                let req: SetLevelRequest = parse_required(params)?;
                session.set_log_level(req.level);
                Ok(serde_json::json!({}))
            }
            "roots/list" => to_value(ListRootsResult { roots: session.roots() }),
            _ => {
                if let Some(handler) = self.registry.request_handler(method) {
                    handler.handle(params, Arc::clone(session)).await
                } else {
                    Err(ProtocolError::method_not_found(method))
                }
            }
        }
    }

    async fn handle_initialize(&self, params: Option<Value>, session: &Arc<Session>) -> Result<Value, ProtocolError> {
        let req: InitializeRequest = parse_required(params)?;
        let version = ProtocolVersion::negotiate(&req.protocol_version, &SUPPORTED_VERSIONS)
            .ok_or_else(|| ProtocolError::protocol_version_mismatch(&req.protocol_version))?;
        let capabilities = CapabilitySet::negotiate(req.capabilities, self.server_capabilities.clone());
        session.record_handshake(version, capabilities, req.client_info)?;

        to_value(InitializeResult {
            protocol_version: version.as_str().to_string(),
            capabilities: self.server_capabilities.clone(),
            server_info: self.local_info.clone(),
            instructions: self.instructions.clone(),
        })
    }

    fn spawn_notification(&self, note: JsonRpcNotification, session: Arc<Session>) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            let method = note.method.clone();
            if let Err(err) = dispatcher.dispatch_notification(note, session).await {
                tracing::warn!(method = %method, error = %err, "failed to handle notification");
            }
        });
    }

    async fn dispatch_notification(&self, note: JsonRpcNotification, session: Arc<Session>) -> Result<(), ProtocolError> {
        let method = note.method.as_str();
        match method {
            "notifications/initialized" => {
                if let Err(e) = session.activate() {
                    tracing::debug!(error = %e, "notifications/initialized on an already-active session");
                }
                Ok(())
            }
            "notifications/cancelled" => {
                let cancelled: CancelledNotification = parse_required(note.params)?;
                tracing::debug!(
                    request_id = %cancelled.request_id,
                    reason = ?cancelled.reason,
                    "peer requested cancellation (best-effort, not interrupting in-flight handler)"
                );
                Ok(())
            }
            "notifications/progress" => {
                let progress: ProgressNotification = parse_required(note.params)?;
                session.dispatch_progress(&progress.progress_token, progress.progress, progress.total);
                Ok(())
            }
            "notifications/message" => {
                let log: LoggingNotification = parse_required(note.params)?;
                session.dispatch_log(log.level, log.data, log.logger);
                Ok(())
            }
            _ => {
                if let Some(handler) = self.registry.notification_handler(method) {
                    handler.handle(note.params, session).await;
                    Ok(())
                } else {
                    tracing::debug!(method, "no handler registered for notification, dropping");
                    Ok(())
                }
            }
        }
    }
}

/// The capability `feature` name gating `method`, or `None` if the method is
/// always allowed (`initialize`/`ping`) or routed through the generic
/// handler map with no capability of its own.
pub(crate) fn feature_for_method(method: &str) -> Option<&'static str> {
    match method {
        "initialize" | "ping" => None,
        "tools/list" | "tools/call" => Some("tools"),
        "prompts/list" | "prompts/get" => Some("prompts"),
        "resources/list" | "resources/templates/list" | "resources/read" => Some("resources"),
        "resources/subscribe" | "resources/unsubscribe" => Some("resources.subscribe"),
        "logging/setLevel" => Some("logging"),
        "completion/complete" => Some("completion"),
        "roots/list" => Some("roots"),
        "sampling/createMessage" => Some("sampling"),
        "elicitation/create" => Some("elicitation"),
        _ => None,
    }
}

fn looks_like_json_array(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .map(|b| *b == b'[')
        .unwrap_or(false)
}

fn parse_required<T: DeserializeOwned>(params: Option<Value>) -> Result<T, ProtocolError> {
    let value = params.ok_or_else(|| ProtocolError::invalid_params("missing params"))?;
    serde_json::from_value(value).map_err(|e| ProtocolError::invalid_params(e.to_string()))
}

fn parse_optional<T: DeserializeOwned + Default>(params: Option<Value>) -> Result<T, ProtocolError> {
    match params {
        None => Ok(T::default()),
        Some(value) => serde_json::from_value(value).map_err(|e| ProtocolError::invalid_params(e.to_string())),
    }
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, ProtocolError> {
    serde_json::to_value(value).map_err(|e| ProtocolError::internal_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_protocol::types::{ClientCapabilities, Implementation, ToolsCapabilities};
    use mcp_session::{PendingRegistry, SessionId};

    fn fresh_dispatcher() -> Dispatcher {
        Dispatcher::new(
            Arc::new(HandlerRegistry::new()),
            Implementation { name: "test-server".into(), title: None, version: "1.0".into() },
            ServerCapabilities {
                tools: Some(ToolsCapabilities::default()),
                ..Default::default()
            },
        )
    }

    fn fresh_session() -> Arc<Session> {
        Arc::new(Session::new(SessionId::new(), PendingRegistry::new()))
    }

    #[tokio::test]
    async fn initialize_then_ping_happy_path() {
        let dispatcher = fresh_dispatcher();
        let session = fresh_session();

        let init_body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "initialize",
            "id": 1,
            "params": {
                "protocolVersion": "2025-06-18",
                "capabilities": {},
                "clientInfo": {"name": "T", "version": "1.0"}
            }
        })
        .to_string();
        match dispatcher.on_frame(init_body.as_bytes(), &session).await {
            DispatchAction::Single(v) => assert_eq!(v["result"]["protocolVersion"], "2025-06-18"),
            other => panic!("expected single reply, got {other:?}"),
        }

        let initialized = serde_json::json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string();
        assert!(matches!(dispatcher.on_frame(initialized.as_bytes(), &session).await, DispatchAction::NoReply));

        let ping = serde_json::json!({"jsonrpc": "2.0", "method": "ping", "id": 2}).to_string();
        match dispatcher.on_frame(ping.as_bytes(), &session).await {
            DispatchAction::Single(v) => assert_eq!(v["result"], serde_json::json!({})),
            other => panic!("expected single reply, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn request_before_handshake_is_rejected() {
        let dispatcher = fresh_dispatcher();
        let session = fresh_session();
        let body = serde_json::json!({"jsonrpc": "2.0", "method": "tools/list", "id": 1}).to_string();
        match dispatcher.on_frame(body.as_bytes(), &session).await {
            DispatchAction::Single(v) => assert_eq!(v["error"]["code"], -32600),
            other => panic!("expected single error reply, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unsupported_capability_yields_method_not_found() {
        let dispatcher = fresh_dispatcher();
        let session = fresh_session();
        session
            .record_handshake(
                ProtocolVersion::parse("2025-06-18").unwrap(),
                CapabilitySet::negotiate(ClientCapabilities::default(), ServerCapabilities::default()),
                Implementation { name: "c".into(), title: None, version: "1".into() },
            )
            .unwrap();
        session.activate().unwrap();

        let body = serde_json::json!({"jsonrpc": "2.0", "method": "prompts/list", "id": 9}).to_string();
        match dispatcher.on_frame(body.as_bytes(), &session).await {
            DispatchAction::Single(v) => assert_eq!(v["error"]["code"], -32601),
            other => panic!("expected single error reply, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn batch_preserves_request_order_in_response_array() {
        let dispatcher = fresh_dispatcher();
        let session = fresh_session();
        session
            .record_handshake(
                ProtocolVersion::parse("2025-06-18").unwrap(),
                CapabilitySet::negotiate(ClientCapabilities::default(), ServerCapabilities::default()),
                Implementation { name: "c".into(), title: None, version: "1".into() },
            )
            .unwrap();
        session.activate().unwrap();

        let body = serde_json::json!([
            {"jsonrpc": "2.0", "method": "ping", "id": "a"},
            {"jsonrpc": "2.0", "method": "ping", "id": "b"},
        ])
        .to_string();
        match dispatcher.on_frame(body.as_bytes(), &session).await {
            DispatchAction::Batch(replies) => {
                assert_eq!(replies.len(), 2);
                assert_eq!(replies[0]["id"], "a");
                assert_eq!(replies[1]["id"], "b");
            }
            other => panic!("expected batch reply, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn batch_of_only_notifications_suppresses_reply() {
        let dispatcher = fresh_dispatcher();
        let session = fresh_session();
        session
            .record_handshake(
                ProtocolVersion::parse("2025-06-18").unwrap(),
                CapabilitySet::negotiate(ClientCapabilities::default(), ServerCapabilities::default()),
                Implementation { name: "c".into(), title: None, version: "1".into() },
            )
            .unwrap();
        session.activate().unwrap();

        let body = serde_json::json!([
            {"jsonrpc": "2.0", "method": "notifications/progress", "params": {"progressToken": "t", "progress": 0.5}},
        ])
        .to_string();
        assert!(matches!(dispatcher.on_frame(body.as_bytes(), &session).await, DispatchAction::NoReply));
    }

    #[tokio::test]
    async fn garbage_json_yields_parse_error() {
        let dispatcher = fresh_dispatcher();
        let session = fresh_session();
        match dispatcher.on_frame(b"not json", &session).await {
            DispatchAction::Single(v) => assert_eq!(v["error"]["code"], -32700),
            other => panic!("expected parse error reply, got {other:?}"),
        }
    }
}

//! Ergonomic initiator-side facade: wraps a [`Transport`] + [`Session`] +
//! [`RequestEngine`] + [`Dispatcher`] quartet into the handshake sequence
//! and typed MCP operations an embedding application actually calls, per
//! spec.md §4.6's initiator sequence and §4.5's request-engine surface.
//!
//! Grounded in `turbomcp-client::client::core::Client<T>`'s
//! `new`/`with_capabilities`/`initialize` shape and
//! `turbomcp-client::client::dispatcher::MessageDispatcher`'s single-reader
//! background task, generalized onto this workspace's `mcp_engine` pair
//! instead of the teacher's bespoke `ProtocolClient`.

use std::collections::HashMap;
use std::sync::Arc;

use mcp_engine::{
    CallOptions, DispatchAction, Dispatcher, EngineConfig, EngineError, HandlerRegistry,
    NotificationHandler, ProgressOptions, RequestEngine, RequestHandler,
};
use mcp_protocol::types::{
    CallToolRequest, CallToolResult, ClientCapabilities, GetPromptRequest, GetPromptResult,
    Implementation, InitializeRequest, InitializeResult, ListPromptsResult,
    ListResourceTemplatesResult, ListResourcesResult, ListToolsResult, LogLevel, Prompt,
    ReadResourceRequest, ReadResourceResult, Resource, ResourceTemplate, Root, ServerCapabilities,
    SetLevelRequest, SubscribeRequest, Tool, UnsubscribeRequest,
};
use mcp_protocol::version::SUPPORTED_VERSIONS;
use mcp_protocol::{CapabilitySet, ProtocolVersion, RequestId};
use mcp_session::{ProgressCallback, Session, SessionId};
use mcp_transport::{Transport, TransportMessage};
use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use crate::error::McpError;

/// What [`Client::initialize`] hands back once the handshake completes.
#[derive(Debug, Clone)]
pub struct InitializeOutcome {
    pub protocol_version: String,
    pub server_info: Implementation,
    pub server_capabilities: ServerCapabilities,
    pub instructions: Option<String>,
}

/// The initiator half of the engine: one instance per connection to a
/// single MCP server. Must be [`Client::initialize`]d before any other
/// operation is legal, per the phase invariant in spec.md §3.
pub struct Client {
    transport: Arc<dyn Transport>,
    session: Arc<Session>,
    engine: Arc<RequestEngine>,
    dispatcher: Dispatcher,
    registry: Arc<HandlerRegistry>,
    client_info: Implementation,
    capabilities: ClientCapabilities,
    reader_task: AsyncMutex<Option<JoinHandle<()>>>,
}

impl Client {
    /// Build a client with no capabilities advertised beyond the defaults.
    /// Call [`Client::on_sampling`]/[`Client::on_elicitation`] before
    /// `initialize` if the capability builder turns those on.
    pub fn new(transport: Arc<dyn Transport>, client_info: Implementation) -> Self {
        Self::with_capabilities(transport, client_info, ClientCapabilities::default())
    }

    pub fn with_capabilities(
        transport: Arc<dyn Transport>,
        client_info: Implementation,
        capabilities: ClientCapabilities,
    ) -> Self {
        Self::with_config(transport, client_info, capabilities, EngineConfig::default())
    }

    pub fn with_config(
        transport: Arc<dyn Transport>,
        client_info: Implementation,
        capabilities: ClientCapabilities,
        engine_config: EngineConfig,
    ) -> Self {
        let (session, engine) =
            RequestEngine::new(SessionId::new(), Arc::clone(&transport), engine_config);
        let registry = Arc::new(HandlerRegistry::new());
        // The client is never the responder to `initialize`, so the
        // dispatcher's own `server_capabilities` field is inert here — it
        // only matters for the built-in methods a server advertises.
        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            client_info.clone(),
            ServerCapabilities::default(),
        );
        Self {
            transport,
            session,
            engine: Arc::new(engine),
            dispatcher,
            registry,
            client_info,
            capabilities,
            reader_task: AsyncMutex::new(None),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Register the handler for server-initiated `sampling/createMessage`.
    /// Required before `initialize` whenever `capabilities.sampling` is set.
    pub fn on_sampling(&self, handler: Arc<dyn RequestHandler>) {
        self.registry.register_request_handler("sampling/createMessage", handler);
    }

    /// Register the handler for server-initiated `elicitation/create`.
    pub fn on_elicitation(&self, handler: Arc<dyn RequestHandler>) {
        self.registry.register_request_handler("elicitation/create", handler);
    }

    /// Register a handler for any other server-initiated notification
    /// (`notifications/tools/list_changed`, etc).
    pub fn on_notification(&self, method: impl Into<String>, handler: Arc<dyn NotificationHandler>) {
        self.registry.register_notification_handler(method, handler);
    }

    /// Replace the roots advertised to the server via `roots/list`.
    pub fn set_roots(&self, roots: Vec<Root>) {
        self.session.replace_roots(roots);
    }

    /// Connect the transport, start the single inbound reader task, and run
    /// the full initiator handshake: send `initialize`, negotiate, persist,
    /// send `notifications/initialized`, activate the session.
    pub async fn initialize(&self) -> Result<InitializeOutcome, McpError> {
        self.transport.connect().await.map_err(EngineError::Transport)?;
        self.spawn_reader().await;

        let requested_version = SUPPORTED_VERSIONS[SUPPORTED_VERSIONS.len() - 1].as_str().to_string();
        let params = serde_json::to_value(InitializeRequest {
            protocol_version: requested_version,
            capabilities: self.capabilities.clone(),
            client_info: self.client_info.clone(),
        })
        .map_err(McpError::UnexpectedResult)?;

        let raw_result = self.engine.call("initialize", Some(params), CallOptions::default()).await?;
        let result: InitializeResult =
            serde_json::from_value(raw_result).map_err(McpError::UnexpectedResult)?;

        let version = ProtocolVersion::parse(&result.protocol_version)
            .ok_or_else(|| McpError::UnsupportedVersion(result.protocol_version.clone()))?;
        let negotiated = CapabilitySet::negotiate(self.capabilities.clone(), result.capabilities.clone());
        self.session.record_handshake(version, negotiated, result.server_info.clone())?;

        self.engine.notify("notifications/initialized", None).await?;
        self.session.activate()?;

        Ok(InitializeOutcome {
            protocol_version: result.protocol_version,
            server_info: result.server_info,
            server_capabilities: result.capabilities,
            instructions: result.instructions,
        })
    }

    async fn spawn_reader(&self) {
        let mut guard = self.reader_task.lock().await;
        if guard.is_some() {
            return;
        }
        let transport = Arc::clone(&self.transport);
        let dispatcher = self.dispatcher.clone();
        let session = Arc::clone(&self.session);
        let handle = tokio::spawn(async move {
            loop {
                match transport.receive().await {
                    Ok(Some(message)) => {
                        let action = dispatcher.on_frame(&message.payload, &session).await;
                        if let Err(e) = write_back(&transport, action).await {
                            tracing::warn!(error = %e, "client reply send failed");
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "client transport receive failed");
                        break;
                    }
                }
            }
            tracing::debug!("client reader task finished");
        });
        *guard = Some(handle);
    }

    /// `ping` — the conventional liveness check; callers observe success as
    /// the `pong` indicator spec.md's scenario 1 describes.
    pub async fn ping(&self) -> Result<(), McpError> {
        self.engine.call("ping", None, CallOptions::default()).await?;
        Ok(())
    }

    pub async fn list_tools(&self) -> Result<Vec<Tool>, McpError> {
        let result: ListToolsResult = self.call_typed("tools/list", None).await?;
        Ok(result.tools)
    }

    pub async fn call_tool(
        &self,
        name: impl Into<String>,
        arguments: Option<HashMap<String, Value>>,
    ) -> Result<CallToolResult, McpError> {
        let params = serde_json::to_value(CallToolRequest { name: name.into(), arguments })
            .map_err(McpError::UnexpectedResult)?;
        self.call_typed("tools/call", Some(params)).await
    }

    /// Like [`Client::call_tool`], but registers `callback` for progress
    /// notifications carrying a freshly minted token.
    pub async fn call_tool_with_progress(
        &self,
        name: impl Into<String>,
        arguments: Option<HashMap<String, Value>>,
        callback: ProgressCallback,
    ) -> Result<CallToolResult, McpError> {
        let mut params = serde_json::to_value(CallToolRequest { name: name.into(), arguments })
            .map_err(McpError::UnexpectedResult)?;
        let token = mcp_protocol::new_progress_token();
        params["_meta"] = serde_json::json!({ "progressToken": token });
        let opts = CallOptions {
            timeout: None,
            progress: Some(ProgressOptions { token: Some(token), callback }),
        };
        let raw = self.engine.call("tools/call", Some(params), opts).await?;
        serde_json::from_value(raw).map_err(McpError::UnexpectedResult)
    }

    pub async fn list_prompts(&self) -> Result<Vec<Prompt>, McpError> {
        let result: ListPromptsResult = self.call_typed("prompts/list", None).await?;
        Ok(result.prompts)
    }

    pub async fn get_prompt(
        &self,
        name: impl Into<String>,
        arguments: Option<HashMap<String, String>>,
    ) -> Result<GetPromptResult, McpError> {
        let params = serde_json::to_value(GetPromptRequest { name: name.into(), arguments })
            .map_err(McpError::UnexpectedResult)?;
        self.call_typed("prompts/get", Some(params)).await
    }

    pub async fn list_resources(&self) -> Result<Vec<Resource>, McpError> {
        let result: ListResourcesResult = self.call_typed("resources/list", None).await?;
        Ok(result.resources)
    }

    pub async fn list_resource_templates(&self) -> Result<Vec<ResourceTemplate>, McpError> {
        let result: ListResourceTemplatesResult =
            self.call_typed("resources/templates/list", None).await?;
        Ok(result.resource_templates)
    }

    pub async fn read_resource(&self, uri: impl Into<String>) -> Result<ReadResourceResult, McpError> {
        let params =
            serde_json::to_value(ReadResourceRequest { uri: uri.into() }).map_err(McpError::UnexpectedResult)?;
        self.call_typed("resources/read", Some(params)).await
    }

    pub async fn subscribe(&self, uri: impl Into<String>) -> Result<(), McpError> {
        let params = serde_json::to_value(SubscribeRequest { uri: uri.into() }).map_err(McpError::UnexpectedResult)?;
        self.engine.call("resources/subscribe", Some(params), CallOptions::default()).await?;
        Ok(())
    }

    pub async fn unsubscribe(&self, uri: impl Into<String>) -> Result<(), McpError> {
        let params = serde_json::to_value(UnsubscribeRequest { uri: uri.into() }).map_err(McpError::UnexpectedResult)?;
        self.engine.call("resources/unsubscribe", Some(params), CallOptions::default()).await?;
        Ok(())
    }

    pub async fn set_log_level(&self, level: LogLevel) -> Result<(), McpError> {
        let params = serde_json::to_value(SetLevelRequest { level }).map_err(McpError::UnexpectedResult)?;
        self.engine.call("logging/setLevel", Some(params), CallOptions::default()).await?;
        Ok(())
    }

    /// `completion/complete` carries no dedicated types in the data model
    /// (per spec.md §4.4's note that it's routed through the generic
    /// handler map); callers pass and receive raw JSON.
    pub async fn complete(&self, params: Value) -> Result<Value, McpError> {
        Ok(self.engine.call("completion/complete", Some(params), CallOptions::default()).await?)
    }

    /// Run `ops` as one JSON-RPC batch (requires the peer to have
    /// negotiated the `batch` feature).
    pub async fn batch(
        &self,
        ops: Vec<mcp_engine::BatchOp>,
    ) -> Result<Vec<Result<Value, EngineError>>, McpError> {
        Ok(self.engine.batch(ops, None).await?)
    }

    /// Cancel one outbound call the caller still holds the id for.
    pub fn cancel(&self, id: &RequestId, reason: &str) -> bool {
        self.engine.cancel(id, reason)
    }

    async fn call_typed<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<T, McpError> {
        let raw = self.engine.call(method, params, CallOptions::default()).await?;
        serde_json::from_value(raw).map_err(McpError::UnexpectedResult)
    }

    /// Tear down per spec.md §4.6: `phase -> terminating`, cancel every
    /// pending request, disconnect the transport, stop the reader task.
    pub async fn shutdown(&self) -> Result<(), McpError> {
        self.session.begin_terminate();
        self.engine.cancel_all();
        if let Some(task) = self.reader_task.lock().await.take() {
            task.abort();
        }
        self.transport.disconnect().await.map_err(EngineError::Transport)?;
        Ok(())
    }
}

async fn write_back(
    transport: &Arc<dyn Transport>,
    action: DispatchAction,
) -> Result<(), mcp_transport::TransportError> {
    match action {
        DispatchAction::NoReply => Ok(()),
        DispatchAction::Single(value) => {
            transport.send(TransportMessage::new(value.to_string().into_bytes())).await
        }
        DispatchAction::Batch(values) => {
            let payload = Value::Array(values).to_string();
            transport.send(TransportMessage::new(payload.into_bytes())).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mcp_protocol::types::{ServerCapabilities, ToolsCapabilities};
    use mcp_transport::{TransportResult, TransportState, TransportType};
    use tokio::sync::mpsc;

    /// An in-memory pair of transports wired directly to each other, for
    /// exercising a full client/server handshake without real I/O.
    struct LoopbackTransport {
        outbox: mpsc::UnboundedSender<TransportMessage>,
        inbox: AsyncMutex<mpsc::UnboundedReceiver<TransportMessage>>,
    }

    impl std::fmt::Debug for LoopbackTransport {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("LoopbackTransport").finish()
        }
    }

    fn loopback_pair() -> (Arc<LoopbackTransport>, Arc<LoopbackTransport>) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        let a = Arc::new(LoopbackTransport { outbox: a_tx, inbox: AsyncMutex::new(a_rx) });
        let b = Arc::new(LoopbackTransport { outbox: b_tx, inbox: AsyncMutex::new(b_rx) });
        (a, b)
    }

    #[async_trait]
    impl Transport for LoopbackTransport {
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
            let _ = self.outbox.send(message);
            Ok(())
        }
        async fn receive(&self) -> TransportResult<Option<TransportMessage>> {
            Ok(self.inbox.lock().await.recv().await)
        }
    }

    fn demo_server() -> crate::server::Server {
        crate::server::Server::new("demo-server", "1.0")
            .with_capabilities(ServerCapabilities {
                tools: Some(ToolsCapabilities::default()),
                ..Default::default()
            })
    }

    #[tokio::test]
    async fn handshake_then_list_tools_round_trips() {
        let (client_side, server_side) = loopback_pair();
        let server = Arc::new(demo_server());
        tokio::spawn({
            let server = Arc::clone(&server);
            async move {
                let _ = server.serve_transport(server_side as Arc<dyn Transport>, "test").await;
            }
        });

        let client = Client::new(
            client_side as Arc<dyn Transport>,
            Implementation { name: "test-client".into(), title: None, version: "1.0".into() },
        );
        let outcome = client.initialize().await.unwrap();
        assert_eq!(outcome.server_info.name, "demo-server");

        let tools = client.list_tools().await.unwrap();
        assert!(tools.is_empty());

        client.shutdown().await.unwrap();
    }
}

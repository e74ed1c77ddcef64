//! Ergonomic responder-side facade: a builder over
//! [`mcp_engine::HandlerRegistry`] plus the two ways to serve it — stdio
//! (one peer per process) and the streamable-HTTP axum router (many
//! sessions per process, tracked by [`mcp_supervisor::Supervisor`]) — per
//! spec.md §4.6's responder sequence and §4.7's transport contract.
//!
//! The teacher repo splits this across `turbomcp-server`'s
//! `ServerBuilder`/`McpServer` pair; this facade collapses that into one
//! `Server` type since this workspace's dispatcher/registry already carry
//! the routing logic `turbomcp-server::routing` hand-rolls.

use std::sync::Arc;

use axum::Router;
use mcp_engine::{
    DispatchAction, Dispatcher, EngineConfig, HandlerRegistry, NotificationHandler, PromptHandler,
    RequestEngine, RequestHandler, ResourceHandler, ToolHandler,
};
use mcp_protocol::types::{Implementation, ResourceTemplate, ServerCapabilities};
use mcp_session::SessionId;
use mcp_supervisor::{ManagedSession, Supervisor};
use mcp_transport::{Transport, TransportMessage};
use mcp_transport_streamable::{AuthValidator, NoopValidator, StreamableHttpConfig};

use crate::error::McpError;

/// The responder half of the engine: a named handler registry plus
/// whichever transport(s) it's asked to serve over. Cheap to wrap in an
/// `Arc` — `serve_stdio`/`serve_transport`/`into_router` all take `self:
/// Arc<Self>` so one `Server` can back several concurrent connections.
pub struct Server {
    registry: Arc<HandlerRegistry>,
    local_info: Implementation,
    capabilities: ServerCapabilities,
    instructions: Option<String>,
    engine_config: EngineConfig,
    supervisor: Supervisor,
}

impl Server {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            registry: Arc::new(HandlerRegistry::new()),
            local_info: Implementation { name: name.into(), title: None, version: version.into() },
            capabilities: ServerCapabilities::default(),
            instructions: None,
            engine_config: EngineConfig::default(),
            supervisor: Supervisor::new(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: ServerCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_engine_config(mut self, config: EngineConfig) -> Self {
        self.engine_config = config;
        self
    }

    pub fn tool(self, handler: Arc<dyn ToolHandler>) -> Self {
        self.registry.register_tool(handler);
        self
    }

    pub fn prompt(self, handler: Arc<dyn PromptHandler>) -> Self {
        self.registry.register_prompt(handler);
        self
    }

    pub fn resource(self, handler: Arc<dyn ResourceHandler>) -> Self {
        self.registry.register_resource(handler);
        self
    }

    pub fn resource_template(self, template: ResourceTemplate) -> Self {
        self.registry.register_resource_template(template);
        self
    }

    pub fn request_handler(self, method: impl Into<String>, handler: Arc<dyn RequestHandler>) -> Self {
        self.registry.register_request_handler(method, handler);
        self
    }

    pub fn notification_handler(self, method: impl Into<String>, handler: Arc<dyn NotificationHandler>) -> Self {
        self.registry.register_notification_handler(method, handler);
        self
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    fn dispatcher(&self) -> Dispatcher {
        let mut dispatcher =
            Dispatcher::new(Arc::clone(&self.registry), self.local_info.clone(), self.capabilities.clone());
        if let Some(instructions) = &self.instructions {
            dispatcher = dispatcher.with_instructions(instructions.clone());
        }
        dispatcher
    }

    /// Serve one peer over the current process's stdin/stdout, per
    /// spec.md §4.7's note that stdio is "implicit" session-wise: one
    /// connection, one session, for the process's lifetime. Returns once
    /// the peer closes its end.
    pub async fn serve_stdio(self: Arc<Self>) -> Result<(), McpError> {
        let transport: Arc<dyn Transport> = Arc::new(mcp_stdio::StdioTransport::new());
        self.serve_transport(transport, "stdio").await
    }

    /// Serve one peer over an arbitrary transport, tracked in the
    /// supervisor under `(module, session_id)` for the connection's
    /// lifetime, per spec.md §6's supervisor registry.
    pub async fn serve_transport(self: Arc<Self>, transport: Arc<dyn Transport>, module: &str) -> Result<(), McpError> {
        transport.connect().await.map_err(mcp_engine::EngineError::Transport)?;

        let session_id = SessionId::new();
        let (session, engine) =
            RequestEngine::new(session_id.clone(), Arc::clone(&transport), self.engine_config.clone());
        let engine = Arc::new(engine);
        let managed = Arc::new(ManagedSession::new(
            Arc::clone(&session),
            Arc::clone(&engine),
            Arc::clone(&transport),
        ));
        self.supervisor.register(module, &session_id, Arc::clone(&managed))?;

        let dispatcher = self.dispatcher();
        loop {
            match transport.receive().await {
                Ok(Some(message)) => {
                    let action = dispatcher.on_frame(&message.payload, &session).await;
                    if let Err(e) = write_back(&transport, action).await {
                        tracing::warn!(error = %e, "server reply send failed");
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, session_id = %session_id.as_str(), "server transport receive failed");
                    break;
                }
            }
        }

        self.supervisor.remove(module, &session_id).await.ok();
        Ok(())
    }

    /// Build the streamable-HTTP axum router (§4.7), with no bearer-token
    /// validation.
    pub fn into_router(self: Arc<Self>, config: StreamableHttpConfig) -> Router {
        self.into_router_with_auth(config, Arc::new(NoopValidator))
    }

    /// Build the streamable-HTTP axum router with a pluggable
    /// [`AuthValidator`] for the OAuth resource-server seam in spec.md §4.7.
    pub fn into_router_with_auth(self: Arc<Self>, config: StreamableHttpConfig, validator: Arc<dyn AuthValidator>) -> Router {
        mcp_transport_streamable::build_router(config, self.dispatcher(), self.engine_config.clone(), validator)
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
            let payload = serde_json::Value::Array(values).to_string();
            transport.send(TransportMessage::new(payload.into_bytes())).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mcp_protocol::types::{ContentBlock, TextContent, ToolInputSchema};
    use mcp_protocol::types::{CallToolResult, Tool};
    use mcp_protocol::ProtocolError;
    use mcp_session::Session;
    use mcp_transport::{TransportResult, TransportState, TransportType};
    use std::collections::HashMap;

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        fn definition(&self) -> Tool {
            Tool::new("echo").with_input_schema(ToolInputSchema::default())
        }

        async fn call(
            &self,
            arguments: Option<HashMap<String, serde_json::Value>>,
            _session: Arc<Session>,
        ) -> Result<CallToolResult, ProtocolError> {
            let text = arguments
                .and_then(|a| a.get("text").cloned())
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            Ok(CallToolResult {
                content: vec![ContentBlock::Text(TextContent { text, annotations: None })],
                is_error: None,
                structured_content: None,
            })
        }
    }

    struct NoopTransport;

    #[async_trait]
    impl Transport for NoopTransport {
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
        async fn send(&self, _message: TransportMessage) -> TransportResult<()> {
            Ok(())
        }
        async fn receive(&self) -> TransportResult<Option<TransportMessage>> {
            Ok(None)
        }
    }

    impl std::fmt::Debug for NoopTransport {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("NoopTransport").finish()
        }
    }

    #[tokio::test]
    async fn serve_transport_registers_and_deregisters_session() {
        let server = Arc::new(Server::new("test-server", "0.1.0").tool(Arc::new(Echo)));
        let transport: Arc<dyn Transport> = Arc::new(NoopTransport);
        server.clone().serve_transport(transport, "unit-test").await.unwrap();
        assert_eq!(server.supervisor().session_count(), 0);
    }

    #[test]
    fn builder_registers_tool_before_dispatch() {
        let server = Server::new("test-server", "0.1.0").tool(Arc::new(Echo));
        assert_eq!(server.registry().list_tools().len(), 1);
    }
}

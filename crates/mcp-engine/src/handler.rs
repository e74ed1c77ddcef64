//! Trait definitions the embedding application implements to plug business
//! logic into the dispatcher: generic request/notification handlers for the
//! `on_request`/`on_notification` extension points, and the typed
//! tool/prompt/resource handler shapes the built-in methods route to.
//!
//! Grounded in `turbomcp-server::handlers::traits::tool::ToolHandler`,
//! generalized to prompts and resources and reworked around spec.md §9's
//! "reify as an explicit registry mapping names to typed handlers" design
//! note.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mcp_protocol::types::{CallToolResult, GetPromptResult, Prompt, ReadResourceResult, Resource, Tool};
use mcp_protocol::ProtocolError;
use mcp_session::Session;
use serde_json::Value;

/// A handler for a method the dispatcher has no built-in routing for.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, params: Option<Value>, session: Arc<Session>) -> Result<Value, ProtocolError>;
}

/// A handler for a notification method with no built-in routing.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    async fn handle(&self, params: Option<Value>, session: Arc<Session>);
}

/// One invocable tool, backing `tools/list` and `tools/call`.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Static definition advertised by `tools/list`.
    fn definition(&self) -> Tool;

    async fn call(
        &self,
        arguments: Option<HashMap<String, Value>>,
        session: Arc<Session>,
    ) -> Result<CallToolResult, ProtocolError>;
}

/// One prompt template, backing `prompts/list` and `prompts/get`.
#[async_trait]
pub trait PromptHandler: Send + Sync {
    fn definition(&self) -> Prompt;

    async fn get(
        &self,
        arguments: Option<HashMap<String, String>>,
        session: Arc<Session>,
    ) -> Result<GetPromptResult, ProtocolError>;
}

/// One resource, backing `resources/list` and `resources/read`.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    fn definition(&self) -> Resource;

    async fn read(&self, session: Arc<Session>) -> Result<ReadResourceResult, ProtocolError>;
}

//! The handler registry: tools/prompts/resources the dispatcher serves for
//! the built-in `*/list`, `*/call`, `*/get`, `*/read` methods, plus the
//! generic request/notification handler maps for the application's
//! `on_request`/`on_notification` extension points.
//!
//! Grounded in `turbomcp-server`'s registry-driven capability derivation
//! (`routing/handlers/initialize.rs`) and its `ToolHandler` trait
//! (`handlers/traits/tool.rs`), reworked as an explicit name-keyed map per
//! spec.md §9's "reify as an explicit registry" design note.

use std::sync::Arc;

use dashmap::DashMap;
use mcp_protocol::types::{Prompt, Resource, ResourceTemplate, Tool};

use crate::handler::{NotificationHandler, PromptHandler, RequestHandler, ResourceHandler, ToolHandler};

/// Name/URI-keyed handler tables plus the generic extension points.
#[derive(Default)]
pub struct HandlerRegistry {
    tools: DashMap<String, Arc<dyn ToolHandler>>,
    prompts: DashMap<String, Arc<dyn PromptHandler>>,
    resources: DashMap<String, Arc<dyn ResourceHandler>>,
    resource_templates: DashMap<String, ResourceTemplate>,
    requests: DashMap<String, Arc<dyn RequestHandler>>,
    notifications: DashMap<String, Arc<dyn NotificationHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_tool(&self, handler: Arc<dyn ToolHandler>) {
        self.tools.insert(handler.definition().name.clone(), handler);
    }

    pub fn register_prompt(&self, handler: Arc<dyn PromptHandler>) {
        self.prompts.insert(handler.definition().name.clone(), handler);
    }

    pub fn register_resource(&self, handler: Arc<dyn ResourceHandler>) {
        self.resources.insert(handler.definition().uri.clone(), handler);
    }

    pub fn register_resource_template(&self, template: ResourceTemplate) {
        self.resource_templates.insert(template.uri_template.clone(), template);
    }

    /// Register a handler for a method the dispatcher doesn't already route,
    /// per spec.md §6's `on_request` extension point (this is also how
    /// `completion/complete` gets served, since the data model carries no
    /// dedicated completion types).
    pub fn register_request_handler(&self, method: impl Into<String>, handler: Arc<dyn RequestHandler>) {
        self.requests.insert(method.into(), handler);
    }

    pub fn register_notification_handler(&self, method: impl Into<String>, handler: Arc<dyn NotificationHandler>) {
        self.notifications.insert(method.into(), handler);
    }

    pub fn tool(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools.get(name).map(|e| Arc::clone(e.value()))
    }

    pub fn prompt(&self, name: &str) -> Option<Arc<dyn PromptHandler>> {
        self.prompts.get(name).map(|e| Arc::clone(e.value()))
    }

    pub fn resource(&self, uri: &str) -> Option<Arc<dyn ResourceHandler>> {
        self.resources.get(uri).map(|e| Arc::clone(e.value()))
    }

    pub fn request_handler(&self, method: &str) -> Option<Arc<dyn RequestHandler>> {
        self.requests.get(method).map(|e| Arc::clone(e.value()))
    }

    pub fn notification_handler(&self, method: &str) -> Option<Arc<dyn NotificationHandler>> {
        self.notifications.get(method).map(|e| Arc::clone(e.value()))
    }

    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.iter().map(|e| e.value().definition()).collect()
    }

    pub fn list_prompts(&self) -> Vec<Prompt> {
        self.prompts.iter().map(|e| e.value().definition()).collect()
    }

    pub fn list_resources(&self) -> Vec<Resource> {
        self.resources.iter().map(|e| e.value().definition()).collect()
    }

    pub fn list_resource_templates(&self) -> Vec<ResourceTemplate> {
        self.resource_templates.iter().map(|e| e.value().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_protocol::types::{ContentBlock, TextContent, ToolInputSchema};
    use mcp_session::{PendingRegistry, SessionId};

    struct Echo;

    #[async_trait::async_trait]
    impl ToolHandler for Echo {
        fn definition(&self) -> Tool {
            Tool::new("echo").with_input_schema(ToolInputSchema::default())
        }

        async fn call(
            &self,
            arguments: Option<std::collections::HashMap<String, serde_json::Value>>,
            _session: Arc<mcp_session::Session>,
        ) -> Result<mcp_protocol::types::CallToolResult, mcp_protocol::ProtocolError> {
            let text = arguments
                .and_then(|a| a.get("text").cloned())
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            Ok(mcp_protocol::types::CallToolResult {
                content: vec![ContentBlock::Text(TextContent { text, annotations: None })],
                is_error: None,
                structured_content: None,
            })
        }
    }

    #[tokio::test]
    async fn registered_tool_is_listed_and_callable() {
        let registry = HandlerRegistry::new();
        registry.register_tool(Arc::new(Echo));

        assert_eq!(registry.list_tools().len(), 1);
        let tool = registry.tool("echo").expect("echo registered");

        let session = Arc::new(mcp_session::Session::new(SessionId::new(), PendingRegistry::new()));
        let result = tool.call(None, session).await.unwrap();
        assert!(matches!(&result.content[0], ContentBlock::Text(t) if t.text.is_empty()));
    }
}

//! Ergonomic facade over the workspace's protocol/session/engine/transport
//! crates: [`Client`] for the initiator side, [`Server`] for the responder
//! side, and [`McpError`] unifying what either can fail with.
//!
//! Grounded in `turbomcp-client`'s crate-root re-export shape
//! (`Client`/`ClientBuilder` plus a `prelude` module) generalized onto this
//! workspace's engine pair rather than the teacher's bespoke protocol core.

pub mod client;
pub mod error;
pub mod server;

pub use client::{Client, InitializeOutcome};
pub use error::McpError;
pub use server::Server;

/// Common imports for embedding applications, mirroring
/// `turbomcp_client::prelude`.
pub mod prelude {
    pub use crate::{Client, InitializeOutcome, McpError, Server};
    pub use mcp_engine::{
        CallOptions, EngineConfig, HandlerRegistry, NotificationHandler, PromptHandler,
        RequestHandler, ResourceHandler, ToolHandler,
    };
    pub use mcp_protocol::types::{
        CallToolRequest, CallToolResult, ClientCapabilities, ContentBlock, GetPromptResult,
        Implementation, ListToolsResult, Prompt, Resource, ResourceTemplate, ServerCapabilities,
        TextContent, Tool,
    };
    pub use mcp_session::{Session, SessionId};
    pub use mcp_transport::Transport;
    pub use mcp_transport_streamable::StreamableHttpConfig;

    pub use async_trait::async_trait;
    pub use std::sync::Arc;
}

//! The MCP data model: every type that appears in a request/result/
//! notification payload, grouped by subsystem.

pub mod capabilities;
pub mod content;
pub mod core;
pub mod initialization;
pub mod logging;
pub mod prompts;
pub mod requests;
pub mod resources;
pub mod roots;
pub mod tools;

pub use capabilities::{
    ClientCapabilities, CompletionCapabilities, ElicitationCapabilities, LoggingCapabilities,
    PromptsCapabilities, ResourcesCapabilities, RootsCapabilities, SamplingCapabilities,
    ServerCapabilities, ToolsCapabilities,
};
pub use content::{
    AudioContent, BlobResourceContents, Content, ContentBlock, EmbeddedResource, ImageContent,
    ResourceContent, ResourceLink, TextContent, TextResourceContents,
};
pub use core::{Annotations, Base64String, Cursor, Implementation, MimeType, Role, Uri};
pub use initialization::{InitializeRequest, InitializeResult, InitializedNotification};
pub use logging::{LogLevel, LoggingNotification, ProgressNotification, SetLevelRequest, SetLevelResult};
pub use prompts::{
    GetPromptRequest, GetPromptResult, ListPromptsRequest, ListPromptsResult, Prompt,
    PromptArgument, PromptMessage,
};
pub use requests::{CancelledNotification, EmptyResult, PaginatedRequest, PingRequest};
pub use resources::{
    ListResourceTemplatesRequest, ListResourceTemplatesResult, ListResourcesRequest,
    ListResourcesResult, ReadResourceRequest, ReadResourceResult, Resource,
    ResourceListChangedNotification, ResourceTemplate, ResourceUpdatedNotification,
    SubscribeRequest, UnsubscribeRequest,
};
pub use roots::{ListRootsRequest, ListRootsResult, Root, RootsListChangedNotification};
pub use tools::{
    CallToolRequest, CallToolResult, ListToolsRequest, ListToolsResult, Tool, ToolAnnotations,
    ToolInputSchema, ToolOutputSchema,
};

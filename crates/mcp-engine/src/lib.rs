//! The dispatcher and request engine: decode/classify/route inbound frames,
//! and the `call`/`notify`/`batch`/`cancel` surface an embedding application
//! uses to make outbound calls, per spec.md §4.4-§4.5.
//!
//! `mcp-protocol` supplies the wire codec and data model, `mcp-session`
//! supplies per-connection state, `mcp-transport` supplies the byte-level
//! `Transport` trait; this crate is where they're wired together.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod registry;
pub mod request_engine;

pub use config::{EngineConfig, SseReconnectConfig};
pub use dispatcher::{DispatchAction, Dispatcher};
pub use error::EngineError;
pub use handler::{NotificationHandler, PromptHandler, RequestHandler, ResourceHandler, ToolHandler};
pub use registry::HandlerRegistry;
pub use request_engine::{BatchOp, CallOptions, ProgressOptions, RequestEngine};

//! Process-lifecycle registry: one supervisor per embedded engine instance,
//! mapping `(server_module, session_id)` to the live session it owns, per
//! spec.md §6's "one supervisor per peer instance... registry maps
//! `(server_module, session_id) → process`".
//!
//! The teacher repo has no direct analog for this — `turbomcp-server`
//! dispatches through a single process-wide [`crate::HandlerRegistry`]-style
//! map rather than tracking per-session child processes. This crate is
//! grounded in that same DashMap-keyed-registry idiom
//! (`turbomcp-server::routing::RequestRouter`, and this workspace's own
//! `mcp_engine::registry::HandlerRegistry` / `mcp_session::pending::PendingRegistry`),
//! generalized from "registry of handlers" to "registry of managed
//! sessions".

mod managed_session;
mod supervisor;

pub use managed_session::ManagedSession;
pub use supervisor::{Supervisor, SupervisorError};

//! Streamable HTTP transport adapter: a single axum endpoint speaking the
//! POST/GET/DELETE + SSE-upgrade contract of spec.md §4.7.
//!
//! Layered the way `turbomcp-transport-streamable` (pure session/SSE types)
//! and `turbomcp-transport::streamable_http_v2` (the axum wiring) split the
//! concern in the teacher: [`sse`] and [`config`] are pure and don't depend
//! on axum's own SSE types, while [`router`] is where they're converted to
//! `axum::response::sse::Event` at the point of writing to the wire.
//! [`session_store`] owns the per-session fan-out transport and replay
//! buffer; [`oauth`] is the bearer-token validation seam.

pub mod config;
pub mod oauth;
pub mod router;
pub mod session_store;
pub mod sse;

pub use config::{OAuthResourceMetadata, PostResponseMode, ReplayWindow, StreamableHttpConfig};
pub use oauth::{AuthValidator, NoopValidator, TokenClaims};
pub use router::{build_router, AppState};
pub use session_store::{HttpSession, InMemorySessionStore, SessionStore, SseTransport, StoredEvent};
pub use sse::{SseEncoder, SseEvent};

//! Transport-agnostic core: the [`Transport`] trait every wire adapter
//! implements, plus the message/error/state types shared by all of them.
//!
//! Concrete adapters (`mcp-stdio`, `mcp-transport-streamable`) depend on
//! this crate rather than on each other, so the dispatcher and request
//! engine in `mcp-engine` can be written once against `dyn Transport`.

pub mod error;
pub mod message;
pub mod traits;
pub mod types;

pub use error::{TransportError, TransportResult};
pub use message::{TransportMessage, TransportMessageMetadata};
pub use traits::Transport;
pub use types::{TransportState, TransportType};

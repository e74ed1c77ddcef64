//! MCP wire protocol: the JSON-RPC 2.0 codec, the MCP data model,
//! capability negotiation, and the protocol-level error taxonomy.
//!
//! This crate is deliberately free of I/O and async — it is the pure,
//! synchronous core that `mcp-session`, `mcp-engine`, and the transport
//! crates all depend on.

pub mod capabilities;
pub mod codec;
pub mod error;
pub mod ids;
pub mod jsonrpc;
pub mod types;
pub mod version;

pub use capabilities::CapabilitySet;
pub use codec::{decode, decode_str, CodecError};
pub use error::{ErrorKind, ProtocolError};
pub use ids::{new_progress_token, RequestIdAllocator};
pub use jsonrpc::{Frame, JsonRpcErrorCode, RequestId, ResponseId};
pub use version::{Feature, ProtocolVersion, SUPPORTED_VERSIONS};

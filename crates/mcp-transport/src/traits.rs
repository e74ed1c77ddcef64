//! The core `Transport` trait every wire adapter implements.
//!
//! Grounded in `turbomcp-transport-traits::traits::Transport`, but written
//! against `async_trait` (the teacher's newer crates move to `-> impl
//! Future`, but `mcp-stdio`/`mcp-transport-streamable` are ordinary
//! `std`-targeting crates where `async_trait` is the idiom the rest of the
//! pack — `em3ndez-materialize`, `npolshakova-agentgateway` — uses
//! throughout).

use async_trait::async_trait;

use crate::error::TransportResult;
use crate::message::TransportMessage;
use crate::types::{TransportState, TransportType};

/// A bidirectional, message-oriented communication channel.
///
/// One instance exists per connected peer. `send`/`receive` operate on
/// whole JSON-RPC frames already encoded to bytes by the caller (the
/// dispatcher/request engine in `mcp-engine`); the transport's only job is
/// getting those bytes across the wire intact and in order.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Which kind of transport this is.
    fn transport_type(&self) -> TransportType;

    /// Current connection state.
    async fn state(&self) -> TransportState;

    /// Establish the underlying connection.
    async fn connect(&self) -> TransportResult<()>;

    /// Tear down the underlying connection. Idempotent.
    async fn disconnect(&self) -> TransportResult<()>;

    /// Write one message to the wire. Per spec.md §5, outbound writes are
    /// serialized per session — callers must not invoke `send` concurrently
    /// from multiple tasks without external serialization.
    async fn send(&self, message: TransportMessage) -> TransportResult<()>;

    /// Read the next message, or `None` if the peer closed the connection
    /// cleanly.
    async fn receive(&self) -> TransportResult<Option<TransportMessage>>;

    /// Convenience: whether the transport is in the `Connected` state.
    async fn is_connected(&self) -> bool {
        matches!(self.state().await, TransportState::Connected)
    }
}

//! Protocol-level error taxonomy and its mapping onto JSON-RPC wire codes.
//!
//! Mirrors the shape of `turbomcp-protocol::error::Error` (an id, a kind,
//! free-form context) but trimmed to the kinds this engine's subsystems
//! actually raise: codec, handshake/capability negotiation, and dispatch.
//! Domain crates (`mcp-session`, `mcp-engine`, `mcp-transport-streamable`)
//! define their own error enums and convert into this one at the boundary
//! where a JSON-RPC error response has to be produced.

use serde_json::Value;
use uuid::Uuid;

use crate::jsonrpc::JsonRpcErrorCode;

/// The category of a protocol error, independent of its wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The payload was not valid JSON.
    ParseError,
    /// The payload was valid JSON but not a well-formed JSON-RPC frame.
    InvalidRequest,
    /// No handler is registered for the method name.
    MethodNotFound,
    /// `params` failed validation for the matched method.
    InvalidParams,
    /// A handler panicked or returned an unexpected internal failure.
    InternalError,
    /// A referenced resource (tool, prompt, resource URI) does not exist.
    ResourceNotFound,
    /// The negotiated protocol version does not support the requested feature.
    CapabilityNotSupported,
    /// `initialize` was called with a version neither peer can agree on.
    ProtocolVersionMismatch,
    /// A request was made before the handshake (`initialize` /
    /// `notifications/initialized`) completed.
    NotInitialized,
    /// A generic, non-standard server error outside the reserved range.
    Generic,
}

impl ErrorKind {
    /// Map this kind onto the JSON-RPC error code it's reported as.
    pub fn jsonrpc_code(self) -> JsonRpcErrorCode {
        match self {
            Self::ParseError => JsonRpcErrorCode::ParseError,
            Self::InvalidRequest | Self::NotInitialized => JsonRpcErrorCode::InvalidRequest,
            Self::MethodNotFound => JsonRpcErrorCode::MethodNotFound,
            Self::InvalidParams => JsonRpcErrorCode::InvalidParams,
            Self::InternalError => JsonRpcErrorCode::InternalError,
            Self::ResourceNotFound => JsonRpcErrorCode::ResourceNotFound,
            Self::CapabilityNotSupported | Self::ProtocolVersionMismatch => {
                JsonRpcErrorCode::Generic(-32000)
            }
            Self::Generic => JsonRpcErrorCode::Generic(-32000),
        }
    }
}

/// A protocol-level error, carrying enough context to become either a
/// JSON-RPC error response or a log line.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct ProtocolError {
    /// Unique id for this error occurrence, useful for log correlation.
    pub id: Uuid,
    pub kind: ErrorKind,
    pub message: String,
    /// Extra structured data to attach to the JSON-RPC `error.data` field.
    pub data: Option<Value>,
}

impl ProtocolError {
    /// Build a new error of `kind` with a message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            data: None,
        }
    }

    /// Attach structured data for the JSON-RPC `error.data` field.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(ErrorKind::MethodNotFound, format!("method not found: {method}"))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParams, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, message)
    }

    pub fn resource_not_found(uri: &str) -> Self {
        Self::new(ErrorKind::ResourceNotFound, format!("resource not found: {uri}"))
    }

    pub fn not_initialized() -> Self {
        Self::new(
            ErrorKind::NotInitialized,
            "request received before initialization completed",
        )
    }

    pub fn protocol_version_mismatch(requested: &str) -> Self {
        Self::new(
            ErrorKind::ProtocolVersionMismatch,
            format!("no common protocol version for requested {requested}"),
        )
    }

    pub fn capability_not_supported(feature: &str) -> Self {
        Self::new(
            ErrorKind::CapabilityNotSupported,
            format!("capability not negotiated: {feature}"),
        )
    }

    /// The `(code, message, data)` triple to embed in a JSON-RPC error response.
    pub fn to_jsonrpc_parts(&self) -> (i64, String, Option<Value>) {
        (
            self.kind.jsonrpc_code().code_raw(),
            self.message.clone(),
            self.data.clone(),
        )
    }
}

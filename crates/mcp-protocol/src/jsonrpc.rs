//! JSON-RPC 2.0 message shapes.
//!
//! This module holds the wire types only; encoding/decoding logic that
//! classifies raw bytes into [`Frame`]s lives in [`crate::codec`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The literal `"jsonrpc": "2.0"` field, validated on deserialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JsonRpcVersion;

impl Serialize for JsonRpcVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str("2.0")
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s == "2.0" {
            Ok(JsonRpcVersion)
        } else {
            Err(serde::de::Error::custom(format!(
                "unsupported jsonrpc version: {s}"
            )))
        }
    }
}

/// A request ID: either a JSON string or a JSON number, never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// String-valued ID.
    String(String),
    /// Integer-valued ID.
    Number(i64),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

/// A request, response, error, or notification ID, allowing `null` for the
/// response to a frame whose own id could not be recovered during parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseId(pub Option<RequestId>);

impl ResponseId {
    /// The `null` id used on parse-error responses.
    pub fn null() -> Self {
        Self(None)
    }
}

impl From<RequestId> for ResponseId {
    fn from(id: RequestId) -> Self {
        Self(Some(id))
    }
}

/// A JSON-RPC request: expects a response correlated by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: JsonRpcVersion,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    pub id: RequestId,
}

/// A JSON-RPC notification: no `id`, no response expected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: JsonRpcVersion,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A successful JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: JsonRpcVersion,
    pub result: Value,
    pub id: RequestId,
}

/// A standard JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A JSON-RPC error response, carrying the error object and (possibly null) id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcErrorResponse {
    pub jsonrpc: JsonRpcVersion,
    pub error: JsonRpcError,
    pub id: ResponseId,
}

/// The four shapes a decoded JSON-RPC value can take.
///
/// This is an explicit enum rather than a `#[serde(untagged)]` union:
/// classification is done by [`crate::codec::decode`] inspecting the raw
/// object's keys, which is unambiguous where untagged matching on
/// presence/absence of `id` alone is not.
#[derive(Debug, Clone)]
pub enum Frame {
    Request(JsonRpcRequest),
    Response(JsonRpcResponse),
    Error(JsonRpcErrorResponse),
    Notification(JsonRpcNotification),
}

impl Frame {
    /// The correlation id of this frame, if it has one (notifications don't).
    pub fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Request(r) => Some(&r.id),
            Self::Response(r) => Some(&r.id),
            Self::Error(r) => r.id.0.as_ref(),
            Self::Notification(_) => None,
        }
    }

    /// The method name, for requests and notifications.
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request(r) => Some(&r.method),
            Self::Notification(n) => Some(&n.method),
            Self::Response(_) | Self::Error(_) => None,
        }
    }
}

/// Standard JSON-RPC 2.0 error codes plus the MCP-specific extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ResourceNotFound,
    Generic(i64),
}

impl JsonRpcErrorCode {
    /// The numeric wire code.
    pub fn code(self) -> i64 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ResourceNotFound => -32002,
            Self::Generic(_) => -32000,
        }
    }

    /// The raw code including custom `Generic` values.
    pub fn code_raw(self) -> i64 {
        match self {
            Self::Generic(c) => c,
            other => other.code(),
        }
    }

    /// The default human-readable message for this code.
    pub fn message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
            Self::ResourceNotFound => "Resource not found",
            Self::Generic(_) => "Server error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jsonrpc_version_round_trips() {
        let v = JsonRpcVersion;
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"2.0\"");
        let back: JsonRpcVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, JsonRpcVersion);
    }

    #[test]
    fn jsonrpc_version_rejects_wrong_value() {
        let result: Result<JsonRpcVersion, _> = serde_json::from_str("\"1.0\"");
        assert!(result.is_err());
    }

    #[test]
    fn request_id_untagged_round_trip() {
        let s = RequestId::String("abc".into());
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"abc\"");
        let n = RequestId::Number(42);
        assert_eq!(serde_json::to_string(&n).unwrap(), "42");
    }

    #[test]
    fn response_id_serializes_null() {
        let id = ResponseId::null();
        assert_eq!(serde_json::to_string(&id).unwrap(), "null");
    }

    #[test]
    fn frame_id_for_notification_is_none() {
        let n = JsonRpcNotification {
            jsonrpc: JsonRpcVersion,
            method: "notifications/initialized".into(),
            params: None,
        };
        assert!(Frame::Notification(n).id().is_none());
    }

    #[test]
    fn error_code_numeric_values_match_spec() {
        assert_eq!(JsonRpcErrorCode::ParseError.code(), -32700);
        assert_eq!(JsonRpcErrorCode::InvalidRequest.code(), -32600);
        assert_eq!(JsonRpcErrorCode::MethodNotFound.code(), -32601);
        assert_eq!(JsonRpcErrorCode::InvalidParams.code(), -32602);
        assert_eq!(JsonRpcErrorCode::InternalError.code(), -32603);
        assert_eq!(JsonRpcErrorCode::ResourceNotFound.code(), -32002);
        assert_eq!(JsonRpcErrorCode::Generic(-32000).code_raw(), -32000);
    }
}

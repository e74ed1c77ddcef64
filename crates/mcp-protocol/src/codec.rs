//! Wire codec: classifies raw JSON into [`Frame`]s and serializes them back.
//!
//! The codec is pure and stateless — it holds no session state and knows
//! nothing about negotiated protocol versions. Batch-permission gating by
//! negotiated version is the dispatcher's job (`mcp-engine`), not the
//! codec's.

use serde_json::Value;

use crate::jsonrpc::{
    Frame, JsonRpcError, JsonRpcErrorResponse, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, JsonRpcVersion, RequestId, ResponseId,
};

/// Errors the codec itself can raise while classifying or encoding frames.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The bytes were not valid JSON at all.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// The bytes were valid JSON but not a JSON-RPC object or a non-empty
    /// array of them.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Decode a UTF-8 JSON-RPC payload (single frame or batch array) into one
/// or more classified [`Frame`]s.
pub fn decode_str(text: &str) -> Result<Vec<Frame>, CodecError> {
    let value: Value = serde_json::from_str(text)?;
    decode_value(value)
}

/// Decode raw bytes, delegating UTF-8 validation to `serde_json`.
pub fn decode(bytes: &[u8]) -> Result<Vec<Frame>, CodecError> {
    let value: Value = serde_json::from_slice(bytes)?;
    decode_value(value)
}

fn decode_value(value: Value) -> Result<Vec<Frame>, CodecError> {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(CodecError::InvalidRequest(
                    "batch array must not be empty".into(),
                ));
            }
            items.into_iter().map(classify).collect()
        }
        other => Ok(vec![classify(other)?]),
    }
}

/// Classify a single JSON value by inspecting its keys, rather than relying
/// on untagged-enum ambiguity between requests and notifications.
fn classify(value: Value) -> Result<Frame, CodecError> {
    let obj = value
        .as_object()
        .ok_or_else(|| CodecError::InvalidRequest("frame must be a JSON object".into()))?;

    let has_method = obj.contains_key("method");
    let has_id = obj.contains_key("id");
    let has_result = obj.contains_key("result");
    let has_error = obj.contains_key("error");

    if has_method && has_id {
        let req: JsonRpcRequest = serde_json::from_value(value)?;
        Ok(Frame::Request(req))
    } else if has_method {
        let note: JsonRpcNotification = serde_json::from_value(value)?;
        Ok(Frame::Notification(note))
    } else if has_error {
        let err: JsonRpcErrorResponse = serde_json::from_value(value)?;
        Ok(Frame::Error(err))
    } else if has_result {
        let resp: JsonRpcResponse = serde_json::from_value(value)?;
        Ok(Frame::Response(resp))
    } else {
        Err(CodecError::InvalidRequest(
            "frame has neither method, result, nor error".into(),
        ))
    }
}

/// Encode a request frame.
pub fn encode_request(method: impl Into<String>, params: Option<Value>, id: RequestId) -> Value {
    serde_json::to_value(JsonRpcRequest {
        jsonrpc: JsonRpcVersion,
        method: method.into(),
        params,
        id,
    })
    .expect("JsonRpcRequest always serializes")
}

/// Encode a notification frame.
pub fn encode_notification(method: impl Into<String>, params: Option<Value>) -> Value {
    serde_json::to_value(JsonRpcNotification {
        jsonrpc: JsonRpcVersion,
        method: method.into(),
        params,
    })
    .expect("JsonRpcNotification always serializes")
}

/// Encode a success response.
pub fn encode_response(result: Value, id: RequestId) -> Value {
    serde_json::to_value(JsonRpcResponse {
        jsonrpc: JsonRpcVersion,
        result,
        id,
    })
    .expect("JsonRpcResponse always serializes")
}

/// Encode an error response. `id` is `None` when the triggering frame's id
/// could not be recovered (e.g. a parse error).
pub fn encode_error(code: i64, message: impl Into<String>, data: Option<Value>, id: ResponseId) -> Value {
    serde_json::to_value(JsonRpcErrorResponse {
        jsonrpc: JsonRpcVersion,
        error: JsonRpcError {
            code,
            message: message.into(),
            data,
        },
        id,
    })
    .expect("JsonRpcErrorResponse always serializes")
}

/// Encode a batch of already-encoded frame values as a JSON array.
pub fn encode_batch(frames: Vec<Value>) -> Value {
    Value::Array(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonrpc::JsonRpcErrorCode;

    #[test]
    fn classifies_request() {
        let frames = decode_str(r#"{"jsonrpc":"2.0","method":"ping","id":1}"#).unwrap();
        assert_eq!(frames.len(), 1);
        assert!(matches!(frames[0], Frame::Request(_)));
    }

    #[test]
    fn classifies_notification() {
        let frames =
            decode_str(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
        assert!(matches!(frames[0], Frame::Notification(_)));
    }

    #[test]
    fn classifies_response_and_error() {
        let ok = decode_str(r#"{"jsonrpc":"2.0","result":{},"id":1}"#).unwrap();
        assert!(matches!(ok[0], Frame::Response(_)));

        let err =
            decode_str(r#"{"jsonrpc":"2.0","error":{"code":-32601,"message":"nope"},"id":1}"#)
                .unwrap();
        assert!(matches!(err[0], Frame::Error(_)));
    }

    #[test]
    fn decodes_non_empty_batch() {
        let frames = decode_str(
            r#"[{"jsonrpc":"2.0","method":"a","id":1},{"jsonrpc":"2.0","method":"b"}]"#,
        )
        .unwrap();
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn rejects_empty_batch() {
        let err = decode_str("[]").unwrap_err();
        assert!(matches!(err, CodecError::InvalidRequest(_)));
    }

    #[test]
    fn rejects_garbage_json() {
        let err = decode_str("not json").unwrap_err();
        assert!(matches!(err, CodecError::Parse(_)));
    }

    #[test]
    fn rejects_frame_with_no_recognizable_shape() {
        let err = decode_str(r#"{"jsonrpc":"2.0"}"#).unwrap_err();
        assert!(matches!(err, CodecError::InvalidRequest(_)));
    }

    #[test]
    fn encode_error_carries_null_id_on_parse_failure() {
        let v = encode_error(
            JsonRpcErrorCode::ParseError.code(),
            JsonRpcErrorCode::ParseError.message(),
            None,
            ResponseId::null(),
        );
        assert_eq!(v["id"], Value::Null);
        assert_eq!(v["error"]["code"], -32700);
    }

    #[test]
    fn encode_decode_round_trip_for_request() {
        let encoded = encode_request("tools/list", None, RequestId::Number(7));
        let text = encoded.to_string();
        let frames = decode_str(&text).unwrap();
        match &frames[0] {
            Frame::Request(r) => {
                assert_eq!(r.method, "tools/list");
                assert_eq!(r.id, RequestId::Number(7));
            }
            _ => panic!("expected request"),
        }
    }
}

//! Utility request/notification types that aren't tied to one subsystem:
//! liveness checks and in-flight request cancellation.

use serde::{Deserialize, Serialize};

use super::core::Cursor;
use crate::jsonrpc::RequestId;

/// `ping`: a no-op liveness check either peer may send.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PingRequest {}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EmptyResult {}

/// `notifications/cancelled`: ask the peer to stop processing a request.
///
/// Per the invariants, cancellation is advisory — the cancelled side may
/// already have completed or may be unable to stop early, and the
/// notification carries no guarantee of effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelledNotification {
    #[serde(rename = "requestId")]
    pub request_id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Reusable pagination params for list-style requests.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PaginatedRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Cursor>,
}

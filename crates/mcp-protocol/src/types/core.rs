//! Shared scalar aliases and small cross-cutting types used throughout the
//! data model.

use serde::{Deserialize, Serialize};

/// An opaque pagination cursor, echoed back verbatim by the client.
pub type Cursor = String;

/// A resource or resource-template URI.
pub type Uri = String;

/// A MIME type string (`text/plain`, `image/png`, ...).
pub type MimeType = String;

/// Base64-encoded binary payload.
pub type Base64String = String;

/// Identifies the party that authored a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Identifies a client or server implementation during the handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Implementation {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub version: String,
}

/// Client/server hints about how a piece of content should be treated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<Vec<Role>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<f64>,
}

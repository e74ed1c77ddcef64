//! Session identifiers.
//!
//! Grounded in the teacher's streamable-HTTP `SessionId`: 128 bits of
//! `getrandom` entropy formatted as a short opaque token, independent of
//! the request-id namespace used for JSON-RPC correlation.

use std::fmt;

/// Maximum length of the `Mcp-Session-Id` header value this engine will
/// accept from a peer, guarding against unbounded header abuse.
pub const MAX_SESSION_ID_LEN: usize = 256;

/// An opaque session identifier, minted by the server and echoed by the
/// client on every subsequent request via the `Mcp-Session-Id` header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    /// Mint a fresh session id: `mcp-<32 hex chars>`.
    pub fn new() -> Self {
        let mut bytes = [0u8; 16];
        getrandom::fill(&mut bytes).expect("system RNG unavailable");
        Self(format!("mcp-{}", hex_encode(&bytes)))
    }

    /// Parse a session id received from a peer, rejecting anything over
    /// [`MAX_SESSION_ID_LEN`] or empty.
    pub fn try_from_str(s: &str) -> Option<Self> {
        if s.is_empty() || s.len() > MAX_SESSION_ID_LEN {
            return None;
        }
        Some(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_prefixed_and_unique() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert!(a.as_str().starts_with("mcp-"));
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_oversized_ids() {
        let too_long = "a".repeat(MAX_SESSION_ID_LEN + 1);
        assert!(SessionId::try_from_str(&too_long).is_none());
    }

    #[test]
    fn rejects_empty_id() {
        assert!(SessionId::try_from_str("").is_none());
    }

    #[test]
    fn accepts_well_formed_id() {
        let id = SessionId::try_from_str("mcp-deadbeef").unwrap();
        assert_eq!(id.as_str(), "mcp-deadbeef");
    }
}

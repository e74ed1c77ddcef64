//! Protocol version negotiation.
//!
//! MCP versions this engine understands, in ascending order. Each newer
//! version strictly extends the feature set of the one before it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A protocol version tag understood by this engine.
///
/// The normative set is exactly these three strings; any other value
/// (e.g. a draft tag like `2024-05-11`) is rejected during negotiation
/// rather than guessed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion(Version);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Version {
    V2024_11_05,
    V2025_03_26,
    V2025_06_18,
}

/// The full ordered list of versions this engine negotiates, oldest first.
pub const SUPPORTED_VERSIONS: [ProtocolVersion; 3] = [
    ProtocolVersion(Version::V2024_11_05),
    ProtocolVersion(Version::V2025_03_26),
    ProtocolVersion(Version::V2025_06_18),
];

/// A feature gated by protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// JSON-RPC batching (array of requests/notifications in one payload).
    Batch,
    /// Tool annotations (`readOnlyHint`, `destructiveHint`, etc).
    ToolAnnotations,
    /// Audio content blocks.
    AudioContent,
    /// Elicitation (`elicitation/create`).
    Elicitation,
    /// Structured tool output (`structuredContent` on `CallToolResult`).
    StructuredToolOutput,
}

impl ProtocolVersion {
    /// Parse a version string, rejecting anything outside the normative set.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "2024-11-05" => Some(Self(Version::V2024_11_05)),
            "2025-03-26" => Some(Self(Version::V2025_03_26)),
            "2025-06-18" => Some(Self(Version::V2025_06_18)),
            _ => None,
        }
    }

    /// The wire representation of this version.
    pub fn as_str(self) -> &'static str {
        match self.0 {
            Version::V2024_11_05 => "2024-11-05",
            Version::V2025_03_26 => "2025-03-26",
            Version::V2025_06_18 => "2025-06-18",
        }
    }

    /// Whether this version advertises `feature`.
    pub fn supports(self, feature: Feature) -> bool {
        match feature {
            Feature::Batch | Feature::ToolAnnotations => self.0 >= Version::V2025_03_26,
            Feature::AudioContent
            | Feature::Elicitation
            | Feature::StructuredToolOutput => self.0 >= Version::V2025_06_18,
        }
    }

    /// Negotiate the highest version both peers understand.
    ///
    /// Returns `None` if the two sets share no common version, which is a
    /// fatal handshake error per the protocol invariants.
    pub fn negotiate(requested: &str, supported: &[ProtocolVersion]) -> Option<Self> {
        let requested = Self::parse(requested)?;
        supported
            .iter()
            .copied()
            .filter(|v| *v <= requested)
            .max()
            .or_else(|| supported.iter().copied().min().filter(|_| false))
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for ProtocolVersion {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProtocolVersion {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(d)?;
        Self::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("unsupported protocol version: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_normative_versions() {
        assert!(ProtocolVersion::parse("2024-11-05").is_some());
        assert!(ProtocolVersion::parse("2025-03-26").is_some());
        assert!(ProtocolVersion::parse("2025-06-18").is_some());
    }

    #[test]
    fn rejects_draft_versions() {
        assert!(ProtocolVersion::parse("2024-05-11").is_none());
        assert!(ProtocolVersion::parse("2025-11-25").is_none());
        assert!(ProtocolVersion::parse("garbage").is_none());
    }

    #[test]
    fn negotiates_highest_common() {
        let v = ProtocolVersion::negotiate("2025-06-18", &SUPPORTED_VERSIONS).unwrap();
        assert_eq!(v.as_str(), "2025-06-18");
    }

    #[test]
    fn negotiates_down_to_requested_when_older() {
        let v = ProtocolVersion::negotiate("2024-11-05", &SUPPORTED_VERSIONS).unwrap();
        assert_eq!(v.as_str(), "2024-11-05");
    }

    #[test]
    fn rejects_unknown_requested_version() {
        assert!(ProtocolVersion::negotiate("2024-05-11", &SUPPORTED_VERSIONS).is_none());
    }

    #[test]
    fn feature_gating_is_monotonic() {
        let old = ProtocolVersion::parse("2024-11-05").unwrap();
        let mid = ProtocolVersion::parse("2025-03-26").unwrap();
        let new = ProtocolVersion::parse("2025-06-18").unwrap();

        assert!(!old.supports(Feature::Batch));
        assert!(mid.supports(Feature::Batch));
        assert!(new.supports(Feature::Batch));

        assert!(!mid.supports(Feature::Elicitation));
        assert!(new.supports(Feature::Elicitation));
    }

    #[test]
    fn serde_round_trip() {
        let v = ProtocolVersion::parse("2025-06-18").unwrap();
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"2025-06-18\"");
    }
}

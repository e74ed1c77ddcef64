//! Configuration for the streamable-HTTP transport: endpoint path, session
//! header name, SSE keepalive/replay window, and the optional OAuth
//! resource-metadata document, per spec.md §4.7 and SPEC_FULL.md §4.7/§11.
//!
//! Grounded in `turbomcp-transport::streamable_http_v2::StreamableHttpConfig`,
//! trimmed of the security-validator/rate-limiter fields that aren't part of
//! this core's scope (those live in the teacher's `turbomcp-transport::security`
//! module, which this crate does not carry forward).

use std::time::Duration;

/// How a POST carrying at least one request decides between a plain `200`
/// JSON reply and an SSE upgrade, resolving the Open Question in spec.md §9
/// ("the source has both... behaviors across versions").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostResponseMode {
    /// Always reply `200` with a single JSON body, regardless of `Accept`.
    AlwaysJson,
    /// Upgrade to `text/event-stream` whenever the client's `Accept` header
    /// allows it; otherwise fall back to `200` JSON. This is the default —
    /// it matches the negotiation spec.md §4.7 describes as the server's
    /// choice to make per request.
    PreferSseWhenAccepted,
}

/// Static OAuth protected-resource metadata served at
/// `/.well-known/oauth-protected-resource`, per spec.md §4.7. This engine
/// validates bearer tokens against this document; it never issues them.
#[derive(Debug, Clone)]
pub struct OAuthResourceMetadata {
    pub authorization_servers: Vec<String>,
    pub bearer_methods_supported: Vec<String>,
    pub scopes_supported: Vec<String>,
    pub resource_signing_alg_values_supported: Vec<String>,
}

impl Default for OAuthResourceMetadata {
    fn default() -> Self {
        Self {
            authorization_servers: Vec::new(),
            bearer_methods_supported: vec!["header".to_string()],
            scopes_supported: Vec::new(),
            resource_signing_alg_values_supported: vec!["RS256".to_string()],
        }
    }
}

/// Replay-window policy for the GET SSE stream's `Last-Event-ID` resumption,
/// resolving the Open Question in spec.md §9: "the replay window is
/// implementation-defined and should be documented by the implementer."
///
/// Default per SPEC_FULL.md §4.7: the smaller of 256 events or 5 minutes.
#[derive(Debug, Clone, Copy)]
pub struct ReplayWindow {
    pub max_events: usize,
    pub max_age: Duration,
}

impl Default for ReplayWindow {
    fn default() -> Self {
        Self {
            max_events: 256,
            max_age: Duration::from_secs(5 * 60),
        }
    }
}

/// Configuration for one streamable-HTTP endpoint.
#[derive(Debug, Clone)]
pub struct StreamableHttpConfig {
    /// HTTP header name carrying the session id (§4.7: "configurable name").
    pub session_header_name: String,
    /// Path the single MCP endpoint is mounted at.
    pub endpoint_path: String,
    /// SSE keepalive ping interval for the long-lived GET stream.
    pub keepalive_interval: Duration,
    pub replay_window: ReplayWindow,
    pub post_response_mode: PostResponseMode,
    /// Resource metadata served at `/.well-known/oauth-protected-resource`
    /// when authorization is enabled. `None` disables the well-known route.
    pub oauth_resource_metadata: Option<OAuthResourceMetadata>,
    /// The externally reachable base URL of this server, used to build the
    /// absolute `resource` field of the OAuth metadata document and the
    /// `WWW-Authenticate` challenge. Left relative (just `endpoint_path`)
    /// when the embedding application hasn't configured one.
    pub external_base_url: Option<String>,
}

impl Default for StreamableHttpConfig {
    fn default() -> Self {
        Self {
            session_header_name: "Mcp-Session-Id".to_string(),
            endpoint_path: "/mcp".to_string(),
            keepalive_interval: Duration::from_secs(15),
            replay_window: ReplayWindow::default(),
            post_response_mode: PostResponseMode::PreferSseWhenAccepted,
            oauth_resource_metadata: None,
            external_base_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_session_header() {
        let cfg = StreamableHttpConfig::default();
        assert_eq!(cfg.session_header_name, "Mcp-Session-Id");
        assert_eq!(cfg.endpoint_path, "/mcp");
    }

    #[test]
    fn replay_window_defaults_to_256_events_or_5_minutes() {
        let window = ReplayWindow::default();
        assert_eq!(window.max_events, 256);
        assert_eq!(window.max_age, Duration::from_secs(300));
    }
}

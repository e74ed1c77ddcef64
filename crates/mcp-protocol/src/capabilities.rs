//! Capability negotiation: deciding which methods and notifications are
//! legal once `initialize` completes, given what each peer advertised.

use std::collections::HashSet;

use crate::types::{ClientCapabilities, ServerCapabilities};

/// How a named feature's availability is decided from the two capability
/// payloads.
#[derive(Debug, Clone, Copy)]
pub enum CompatibilityRule {
    /// Needs the server to have advertised the feature.
    RequireServer,
    /// Needs the client to have advertised the feature.
    RequireClient,
    /// Needs both sides to have advertised it.
    RequireBoth,
    /// Always available once the handshake completes.
    Always,
}

/// The fixed MCP feature-to-rule table. Unlike the wider protocol surface
/// this engine only negotiates the features spec.md's dispatcher names.
fn rule_for(feature: &str) -> CompatibilityRule {
    match feature {
        "tools" | "prompts" | "resources" | "resources.subscribe" | "logging" | "completion" => {
            CompatibilityRule::RequireServer
        }
        "roots" | "sampling" | "elicitation" => CompatibilityRule::RequireClient,
        "progress" | "cancellation" | "ping" => CompatibilityRule::Always,
        _ => CompatibilityRule::Always,
    }
}

/// A negotiated view over the client/server capability payloads exchanged
/// during `initialize`, answering "is feature X usable" for the lifetime of
/// the session.
#[derive(Debug, Clone)]
pub struct CapabilitySet {
    client: ClientCapabilities,
    server: ServerCapabilities,
    enabled: HashSet<&'static str>,
}

impl CapabilitySet {
    /// Compute the negotiated set from what each peer advertised.
    pub fn negotiate(client: ClientCapabilities, server: ServerCapabilities) -> Self {
        let mut enabled = HashSet::new();
        for feature in [
            "tools",
            "prompts",
            "resources",
            "resources.subscribe",
            "logging",
            "completion",
            "roots",
            "sampling",
            "elicitation",
            "progress",
            "cancellation",
            "ping",
        ] {
            if Self::is_enabled(feature, &client, &server) {
                enabled.insert(feature);
            }
        }
        Self {
            client,
            server,
            enabled,
        }
    }

    fn is_enabled(feature: &str, client: &ClientCapabilities, server: &ServerCapabilities) -> bool {
        match rule_for(feature) {
            CompatibilityRule::RequireServer => Self::server_has(feature, server),
            CompatibilityRule::RequireClient => Self::client_has(feature, client),
            CompatibilityRule::RequireBoth => {
                Self::client_has(feature, client) && Self::server_has(feature, server)
            }
            CompatibilityRule::Always => true,
        }
    }

    fn client_has(feature: &str, client: &ClientCapabilities) -> bool {
        match feature {
            "roots" => client.roots.is_some(),
            "sampling" => client.sampling.is_some(),
            "elicitation" => client.elicitation.is_some(),
            _ => true,
        }
    }

    fn server_has(feature: &str, server: &ServerCapabilities) -> bool {
        match feature {
            "tools" => server.tools.is_some(),
            "prompts" => server.prompts.is_some(),
            "resources" => server.resources.is_some(),
            "resources.subscribe" => server
                .resources
                .as_ref()
                .and_then(|r| r.subscribe)
                .unwrap_or(false),
            "logging" => server.logging.is_some(),
            "completion" => server.completions.is_some(),
            _ => true,
        }
    }

    /// Whether `feature` is usable on this negotiated session.
    pub fn supports(&self, feature: &str) -> bool {
        self.enabled.contains(feature)
    }

    pub fn client_capabilities(&self) -> &ClientCapabilities {
        &self.client
    }

    pub fn server_capabilities(&self) -> &ServerCapabilities {
        &self.server
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ResourcesCapabilities, RootsCapabilities, ToolsCapabilities};

    #[test]
    fn server_only_feature_requires_server_advertisement() {
        let client = ClientCapabilities::default();
        let server = ServerCapabilities {
            tools: Some(ToolsCapabilities::default()),
            ..Default::default()
        };
        let set = CapabilitySet::negotiate(client, server);
        assert!(set.supports("tools"));
        assert!(!set.supports("prompts"));
    }

    #[test]
    fn client_only_feature_requires_client_advertisement() {
        let client = ClientCapabilities {
            roots: Some(RootsCapabilities::default()),
            ..Default::default()
        };
        let server = ServerCapabilities::default();
        let set = CapabilitySet::negotiate(client, server);
        assert!(set.supports("roots"));
        assert!(!set.supports("sampling"));
    }

    #[test]
    fn subscribe_gated_on_nested_flag() {
        let server = ServerCapabilities {
            resources: Some(ResourcesCapabilities {
                subscribe: Some(true),
                list_changed: None,
            }),
            ..Default::default()
        };
        let set = CapabilitySet::negotiate(ClientCapabilities::default(), server);
        assert!(set.supports("resources"));
        assert!(set.supports("resources.subscribe"));
    }

    #[test]
    fn ping_and_cancellation_are_always_on() {
        let set = CapabilitySet::negotiate(ClientCapabilities::default(), ServerCapabilities::default());
        assert!(set.supports("ping"));
        assert!(set.supports("cancellation"));
        assert!(set.supports("progress"));
    }
}

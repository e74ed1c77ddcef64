//! OAuth resource-server plumbing: this engine validates bearer tokens
//! against a pluggable validator hook and serves the static protected-resource
//! metadata document; it never issues or refreshes tokens itself, per
//! spec.md §4.7 and SPEC_FULL.md §4.7's explicit Non-goal on token issuance.

use async_trait::async_trait;

use crate::config::OAuthResourceMetadata;

/// The result of validating one bearer token.
#[derive(Debug, Clone)]
pub struct TokenClaims {
    pub subject: String,
    pub scopes: Vec<String>,
}

/// Errors surfaced back to the router as a `401` with `WWW-Authenticate`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    Missing,
    #[error("malformed authorization header")]
    Malformed,
    #[error("token rejected: {0}")]
    Rejected(String),
}

/// Pluggable bearer-token validation. Applications wire in whatever JWT/
/// introspection library fits their authorization server; this crate only
/// defines the seam and the `WWW-Authenticate` response shape around it.
#[async_trait]
pub trait AuthValidator: Send + Sync {
    async fn validate(&self, bearer_token: &str) -> Result<TokenClaims, AuthError>;
}

/// Accepts every token unconditionally. Used when `oauth_resource_metadata`
/// is configured but the embedding application hasn't wired a real validator
/// yet, and in tests.
pub struct NoopValidator;

#[async_trait]
impl AuthValidator for NoopValidator {
    async fn validate(&self, bearer_token: &str) -> Result<TokenClaims, AuthError> {
        if bearer_token.is_empty() {
            return Err(AuthError::Missing);
        }
        Ok(TokenClaims { subject: "anonymous".to_string(), scopes: Vec::new() })
    }
}

/// Pull the bearer token out of an `Authorization` header value.
pub fn parse_bearer(header_value: Option<&str>) -> Result<&str, AuthError> {
    let value = header_value.ok_or(AuthError::Missing)?;
    value.strip_prefix("Bearer ").ok_or(AuthError::Malformed)
}

/// Render the `/.well-known/oauth-protected-resource` JSON document. The
/// `resource` field is the MCP endpoint's own URL, per RFC 9728.
pub fn protected_resource_document(resource: &str, metadata: &OAuthResourceMetadata) -> serde_json::Value {
    serde_json::json!({
        "resource": resource,
        "authorization_servers": metadata.authorization_servers,
        "bearer_methods_supported": metadata.bearer_methods_supported,
        "scopes_supported": metadata.scopes_supported,
        "resource_signing_alg_values_supported": metadata.resource_signing_alg_values_supported,
    })
}

/// The `WWW-Authenticate` header value for a `401` challenge, pointing the
/// client at the protected-resource metadata document per RFC 9728 §5.1.
pub fn www_authenticate_header(resource_metadata_url: &str) -> String {
    format!(r#"Bearer resource_metadata="{resource_metadata_url}""#)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bearer_strips_prefix() {
        assert_eq!(parse_bearer(Some("Bearer abc123")).unwrap(), "abc123");
    }

    #[test]
    fn parse_bearer_rejects_missing_header() {
        assert!(matches!(parse_bearer(None), Err(AuthError::Missing)));
    }

    #[test]
    fn parse_bearer_rejects_non_bearer_scheme() {
        assert!(matches!(parse_bearer(Some("Basic abc123")), Err(AuthError::Malformed)));
    }

    #[tokio::test]
    async fn noop_validator_accepts_nonempty_token() {
        let claims = NoopValidator.validate("token").await.unwrap();
        assert_eq!(claims.subject, "anonymous");
    }

    #[test]
    fn protected_resource_document_carries_resource_url() {
        let doc = protected_resource_document("https://example.com/mcp", &OAuthResourceMetadata::default());
        assert_eq!(doc["resource"], "https://example.com/mcp");
    }

    #[test]
    fn www_authenticate_header_points_at_metadata_url() {
        let header = www_authenticate_header("https://example.com/.well-known/oauth-protected-resource");
        assert_eq!(
            header,
            r#"Bearer resource_metadata="https://example.com/.well-known/oauth-protected-resource""#
        );
    }
}

//! Environment knobs the engine and its transports read at construction
//! time: session-header name, default request timeout, SSE reconnection
//! backoff, HTTP pool size — per spec.md §6's "Environment knobs" list.

use std::time::Duration;

/// Backoff schedule for the streamable-HTTP/legacy-SSE transports' GET
/// stream reconnection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SseReconnectConfig {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_attempts: u32,
}

impl Default for SseReconnectConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(15),
            max_attempts: 5,
        }
    }
}

impl SseReconnectConfig {
    /// The delay before the `attempt`-th (0-indexed) reconnect, doubling
    /// each time up to `max_backoff`.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let millis = self.initial_backoff.as_millis().saturating_mul(1u128 << attempt.min(16));
        Duration::from_millis(millis.min(self.max_backoff.as_millis()) as u64)
    }
}

/// Engine-wide configuration shared by the dispatcher and request engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// HTTP header name carrying the streamable-HTTP session id.
    pub session_header_name: String,
    /// Default `call` timeout when the caller doesn't override it.
    pub default_request_timeout: Duration,
    pub sse_reconnect: SseReconnectConfig,
    /// Max idle HTTP connections the initiator side's pool keeps open.
    pub http_pool_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            session_header_name: "Mcp-Session-Id".to_string(),
            default_request_timeout: Duration::from_secs(30),
            sse_reconnect: SseReconnectConfig::default(),
            http_pool_size: 32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        let cfg = SseReconnectConfig::default();
        assert_eq!(cfg.backoff_for_attempt(0), Duration::from_secs(1));
        assert_eq!(cfg.backoff_for_attempt(1), Duration::from_secs(2));
        assert_eq!(cfg.backoff_for_attempt(10), Duration::from_secs(15));
    }
}

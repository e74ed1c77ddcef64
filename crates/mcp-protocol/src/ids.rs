//! Request ID and progress token allocation.
//!
//! Two independent namespaces: request IDs (correlated against the pending
//! registry) and progress tokens (correlated against in-flight progress
//! notifications). Neither overlaps with the session-id namespace minted by
//! the streamable HTTP transport.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::jsonrpc::RequestId;

/// Allocates monotonically increasing request IDs for one session's
/// outbound requests, salted with randomness to avoid collisions across
/// allocator restarts within the same process.
#[derive(Debug)]
pub struct RequestIdAllocator {
    counter: AtomicU64,
    salt: u32,
}

impl RequestIdAllocator {
    /// Create a new allocator with a fresh random salt.
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
            salt: fastrand::u32(..),
        }
    }

    /// Mint the next request ID as `req_<counter>_<salt>`.
    pub fn next(&self) -> RequestId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        RequestId::String(format!("req_{n}_{:08x}", self.salt))
    }
}

impl Default for RequestIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Mints opaque progress tokens for `notifications/progress` correlation.
///
/// Unlike request IDs, progress tokens are pure random strings — nothing
/// downstream depends on their ordering.
pub fn new_progress_token() -> String {
    format!("progress_{:016x}", fastrand::u64(..))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_unique_and_monotonic() {
        let alloc = RequestIdAllocator::new();
        let a = alloc.next();
        let b = alloc.next();
        assert_ne!(a, b);
        match (a, b) {
            (RequestId::String(a), RequestId::String(b)) => {
                assert!(a.starts_with("req_0_"));
                assert!(b.starts_with("req_1_"));
            }
            _ => panic!("expected string ids"),
        }
    }

    #[test]
    fn progress_tokens_are_distinct() {
        let a = new_progress_token();
        let b = new_progress_token();
        assert_ne!(a, b);
        assert!(a.starts_with("progress_"));
    }
}

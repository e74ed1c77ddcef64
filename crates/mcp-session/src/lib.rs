//! Per-connection session state machine: handshake phase, negotiated
//! capabilities, the pending-request registry, progress/log callbacks,
//! subscriptions, and roots.
//!
//! This crate owns exactly one cross-worker mutable structure per session —
//! the [`PendingRegistry`] — plus the serialized session fields that are
//! only ever mutated through [`Session`]'s own methods, per spec.md §5.

pub mod error;
pub mod pending;
pub mod roots;
pub mod session;
pub mod session_id;

pub use error::SessionError;
pub use pending::{CancelNotifyFn, CancelReason, Outcome, PendingRegistry, PendingRequest, PendingSpec};
pub use roots::RootSet;
pub use session::{Phase, ProgressCallback, Session, TransportContext};
pub use session_id::SessionId;

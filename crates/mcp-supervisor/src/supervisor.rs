//! The supervisor: a `(server_module, session_id) → ManagedSession` registry
//! plus whole-tree teardown, per spec.md §6's "process-wide state" note.

use std::sync::Arc;

use dashmap::DashMap;
use mcp_session::SessionId;
use thiserror::Error;

use crate::managed_session::ManagedSession;

/// Errors raised registering or looking up a managed session.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("a session is already registered for module '{module}', id {session_id}")]
    AlreadyRegistered { module: String, session_id: String },
    #[error("no session registered for module '{module}', id {session_id}")]
    NotFound { module: String, session_id: String },
}

/// One supervisor per embedded engine instance. Cheap to `Clone` (the map
/// is the only allocation, held behind an `Arc`-backed `DashMap`) so every
/// transport adapter that spawns sessions can hold its own handle.
#[derive(Clone, Default)]
pub struct Supervisor {
    sessions: Arc<DashMap<(String, String), Arc<ManagedSession>>>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly created session under `(module, session_id)`.
    /// Fails if that key is already occupied — callers mint a fresh
    /// `SessionId` per connection, so a collision means a caller bug.
    pub fn register(&self, module: impl Into<String>, session_id: &SessionId, managed: Arc<ManagedSession>) -> Result<(), SupervisorError> {
        let module = module.into();
        let key = (module.clone(), session_id.as_str().to_string());
        if self.sessions.contains_key(&key) {
            return Err(SupervisorError::AlreadyRegistered { module, session_id: session_id.as_str().to_string() });
        }
        self.sessions.insert(key, managed);
        Ok(())
    }

    pub fn get(&self, module: &str, session_id: &SessionId) -> Option<Arc<ManagedSession>> {
        self.sessions.get(&(module.to_string(), session_id.as_str().to_string())).map(|e| Arc::clone(e.value()))
    }

    /// Remove and shut down one session. Returns an error if it wasn't
    /// registered.
    pub async fn remove(&self, module: &str, session_id: &SessionId) -> Result<(), SupervisorError> {
        let key = (module.to_string(), session_id.as_str().to_string());
        let Some((_, managed)) = self.sessions.remove(&key) else {
            return Err(SupervisorError::NotFound { module: module.to_string(), session_id: session_id.as_str().to_string() });
        };
        managed.shutdown().await;
        Ok(())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Shut down every managed session, in registration order within each
    /// shard (DashMap gives no global order). Used on process shutdown.
    pub async fn shutdown_all(&self) {
        let all: Vec<Arc<ManagedSession>> = self.sessions.iter().map(|e| Arc::clone(e.value())).collect();
        self.sessions.clear();
        for managed in all {
            managed.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_engine::{EngineConfig, RequestEngine};
    use mcp_transport::{Transport, TransportMessage, TransportResult, TransportState, TransportType};

    struct NoopTransport;

    #[async_trait::async_trait]
    impl Transport for NoopTransport {
        fn transport_type(&self) -> TransportType {
            TransportType::Stdio
        }
        async fn state(&self) -> TransportState {
            TransportState::Connected
        }
        async fn connect(&self) -> TransportResult<()> {
            Ok(())
        }
        async fn disconnect(&self) -> TransportResult<()> {
            Ok(())
        }
        async fn send(&self, _message: TransportMessage) -> TransportResult<()> {
            Ok(())
        }
        async fn receive(&self) -> TransportResult<Option<TransportMessage>> {
            Ok(None)
        }
    }

    impl std::fmt::Debug for NoopTransport {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("NoopTransport").finish()
        }
    }

    fn managed() -> (SessionId, Arc<ManagedSession>) {
        let transport: Arc<dyn Transport> = Arc::new(NoopTransport);
        let id = SessionId::new();
        let (session, engine) = RequestEngine::new(id.clone(), Arc::clone(&transport), EngineConfig::default());
        (id, Arc::new(ManagedSession::new(session, Arc::new(engine), transport)))
    }

    #[tokio::test]
    async fn register_then_get_round_trips() {
        let supervisor = Supervisor::new();
        let (id, managed) = managed();
        supervisor.register("demo-server", &id, managed).unwrap();
        assert!(supervisor.get("demo-server", &id).is_some());
        assert_eq!(supervisor.session_count(), 1);
    }

    #[tokio::test]
    async fn register_twice_is_rejected() {
        let supervisor = Supervisor::new();
        let (id, managed) = managed();
        supervisor.register("demo-server", &id, Arc::clone(&managed)).unwrap();
        assert!(matches!(
            supervisor.register("demo-server", &id, managed),
            Err(SupervisorError::AlreadyRegistered { .. })
        ));
    }

    #[tokio::test]
    async fn remove_shuts_down_and_drops_entry() {
        let supervisor = Supervisor::new();
        let (id, managed) = managed();
        supervisor.register("demo-server", &id, Arc::clone(&managed)).unwrap();
        supervisor.remove("demo-server", &id).await.unwrap();
        assert!(supervisor.get("demo-server", &id).is_none());
        assert_eq!(managed.session.phase(), mcp_session::Phase::Terminating);
    }

    #[tokio::test]
    async fn shutdown_all_clears_the_registry() {
        let supervisor = Supervisor::new();
        for _ in 0..3 {
            let (id, managed) = managed();
            supervisor.register("demo-server", &id, managed).unwrap();
        }
        supervisor.shutdown_all().await;
        assert_eq!(supervisor.session_count(), 0);
    }
}

//! One peer's full lifecycle: its [`Session`] state, the [`Transport`] it
//! speaks over, the [`RequestEngine`] making outbound calls, and whatever
//! background tasks the transport spawned on its behalf (e.g. the stdio
//! reader loop) — everything teardown needs to stop cleanly.

use std::sync::Arc;

use mcp_engine::RequestEngine;
use mcp_session::{CancelReason, Session};
use mcp_transport::Transport;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// A session plus the process-level resources it owns.
pub struct ManagedSession {
    pub session: Arc<Session>,
    pub engine: Arc<RequestEngine>,
    pub transport: Arc<dyn Transport>,
    background_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ManagedSession {
    pub fn new(session: Arc<Session>, engine: Arc<RequestEngine>, transport: Arc<dyn Transport>) -> Self {
        Self {
            session,
            engine,
            transport,
            background_tasks: Mutex::new(Vec::new()),
        }
    }

    /// Track a background task (e.g. a transport's reader loop) so
    /// [`Self::shutdown`] can abort it on teardown.
    pub async fn track_task(&self, handle: JoinHandle<()>) {
        self.background_tasks.lock().await.push(handle);
    }

    /// Per spec.md §4.6: `phase → terminating`, `cancel_all("session_closing")`,
    /// transport shutdown, then abort any tracked background tasks.
    pub async fn shutdown(&self) {
        self.session.begin_terminate();
        self.session.pending.cancel_all(CancelReason::SessionClosing);
        if let Err(e) = self.transport.disconnect().await {
            tracing::warn!(error = %e, session_id = %self.session.session_id.as_str(), "transport disconnect failed during shutdown");
        }
        for task in self.background_tasks.lock().await.drain(..) {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_engine::EngineConfig;
    use mcp_session::SessionId;

    struct NoopTransport;

    #[async_trait::async_trait]
    impl Transport for NoopTransport {
        fn transport_type(&self) -> mcp_transport::TransportType {
            mcp_transport::TransportType::Stdio
        }
        async fn state(&self) -> mcp_transport::TransportState {
            mcp_transport::TransportState::Connected
        }
        async fn connect(&self) -> mcp_transport::TransportResult<()> {
            Ok(())
        }
        async fn disconnect(&self) -> mcp_transport::TransportResult<()> {
            Ok(())
        }
        async fn send(&self, _message: mcp_transport::TransportMessage) -> mcp_transport::TransportResult<()> {
            Ok(())
        }
        async fn receive(&self) -> mcp_transport::TransportResult<Option<mcp_transport::TransportMessage>> {
            Ok(None)
        }
    }

    impl std::fmt::Debug for NoopTransport {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("NoopTransport").finish()
        }
    }

    #[tokio::test]
    async fn shutdown_transitions_phase_and_aborts_tasks() {
        let transport: Arc<dyn Transport> = Arc::new(NoopTransport);
        let (session, engine) = RequestEngine::new(SessionId::new(), Arc::clone(&transport), EngineConfig::default());
        let managed = ManagedSession::new(session, Arc::new(engine), transport);

        let handle = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        });
        managed.track_task(handle).await;

        managed.shutdown().await;
        assert_eq!(managed.session.phase(), mcp_session::Phase::Terminating);
    }
}

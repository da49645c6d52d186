use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use qar_proto::SessionId;

use crate::error::{Error, Result};
use crate::session::host::SessionHost;

/// Resolves invite endpoints to live session hosts.
///
/// Network transports implement this against their own wire; the SDK ships
/// [`LoopbackTransport`] for hosts and peers living in one process, which
/// is also what the handshake tests run against.
pub trait Transport: Send + Sync + 'static {
    /// Make a hosted session reachable.
    fn publish(&self, host: Arc<SessionHost>);

    /// Resolve a session by its invite endpoint. Fails with a retryable
    /// [`Error::ConnectFailed`] when the host is not reachable.
    fn resolve(&self, endpoint: &str, session_id: SessionId) -> Result<Arc<SessionHost>>;

    /// Withdraw a session; subsequent resolves fail.
    fn withdraw(&self, session_id: SessionId);
}

/// In-process transport: a map from session id to host.
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    hosts: DashMap<SessionId, Arc<SessionHost>>,
}

/// Endpoint string written into invites hosted on the loopback transport.
pub const LOOPBACK_ENDPOINT: &str = "loopback";

impl LoopbackTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide instance shared by every runtime that does not bring
    /// its own transport. This is what lets independent join calls in one
    /// process reach sessions hosted by another runtime instance.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<LoopbackTransport>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(Self::new())).clone()
    }
}

impl Transport for LoopbackTransport {
    fn publish(&self, host: Arc<SessionHost>) {
        self.hosts.insert(host.id(), host);
    }

    fn resolve(&self, endpoint: &str, session_id: SessionId) -> Result<Arc<SessionHost>> {
        self.hosts
            .get(&session_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                Error::ConnectFailed(format!(
                    "session {session_id} is not reachable via '{endpoint}'"
                ))
            })
    }

    fn withdraw(&self, session_id: SessionId) {
        self.hosts.remove(&session_id);
    }
}

//! Runtime host: process-wide library state, runtime instances, and
//! session hosting.

pub mod discovery;
pub mod transport;

use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

use qar_proto::invite::{self, InvitePayload, SessionInvite};
use qar_proto::SessionId;

use crate::config::{LibraryConfig, RuntimeConfig, SessionCreateConfig};
use crate::error::{Error, Result};
use crate::logging::init_logging;
use crate::session::host::SessionHost;

pub use discovery::{Backend, BackendDiscovery, DirectoryDiscovery};
pub use transport::{LoopbackTransport, Transport, LOOPBACK_ENDPOINT};

/// Process-wide SDK handle.
///
/// Initializes logging and owns the transport that runtimes created from
/// it publish their sessions on. Dropping the library flushes any pending
/// log output.
pub struct Library {
    transport: Arc<dyn Transport>,
    _log_guard: Option<WorkerGuard>,
}

impl Library {
    /// Initialize the SDK with the process-wide loopback transport.
    pub fn init(config: LibraryConfig) -> Result<Self> {
        Self::with_transport(config, LoopbackTransport::global())
    }

    /// Initialize the SDK with an explicit transport.
    pub fn with_transport<T: Transport>(
        config: LibraryConfig,
        transport: Arc<T>,
    ) -> Result<Self> {
        let log_guard = init_logging(&config)
            .map_err(|err| Error::Internal(format!("logging initialization failed: {err}")))?;
        info!("library initialized");
        Ok(Self {
            transport,
            _log_guard: log_guard,
        })
    }

    /// Create a runtime instance. Discovery of backend binaries happens
    /// here, once, against the configured directory.
    pub fn create_runtime(&self, config: RuntimeConfig) -> Result<Runtime> {
        let backends = match &config.runtime_binaries_dir {
            Some(dir) => {
                let backends = DirectoryDiscovery::new(dir).discover()?;
                if backends.is_empty() {
                    return Err(Error::ResourceExhausted(format!(
                        "no backend binaries found in {}",
                        dir.display()
                    )));
                }
                backends
            }
            None => Vec::new(),
        };
        info!(backend_count = backends.len(), "runtime created");
        Ok(Runtime {
            backends,
            transport: self.transport.clone(),
            hosted: DashMap::new(),
        })
    }

    /// Tear the library down. Runtimes and sessions created from it stay
    /// valid; only process-wide resources are released.
    pub fn destroy(self) {
        info!("library destroyed");
    }
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library").finish()
    }
}

/// One runtime instance: hosts sessions and hands out invites for them.
pub struct Runtime {
    backends: Vec<Backend>,
    transport: Arc<dyn Transport>,
    hosted: DashMap<SessionId, Arc<SessionHost>>,
}

impl Runtime {
    /// Backend binaries discovered at creation.
    #[must_use]
    pub fn backends(&self) -> &[Backend] {
        &self.backends
    }

    /// Host a new session and return its invite.
    ///
    /// The invite blob is the only artifact a remote peer needs; handing
    /// the same bytes to several peers admits each of them independently.
    pub fn create_session(&self, config: SessionCreateConfig) -> Result<SessionInvite> {
        if config.max_peers == 0 {
            return Err(Error::InvalidArgument(
                "session capacity must admit at least one peer".to_string(),
            ));
        }
        if config.invite_ttl_secs <= 0 {
            return Err(Error::InvalidArgument(
                "invite ttl must be positive".to_string(),
            ));
        }

        let payload = InvitePayload::new(
            SessionId::new(),
            LOOPBACK_ENDPOINT.to_string(),
            config.invite_ttl_secs,
        );
        let host = Arc::new(SessionHost::new(payload.session_id, payload.secret, &config));

        self.hosted.insert(payload.session_id, host.clone());
        self.transport.publish(host);

        let invite = invite::encode(&payload);
        info!(
            session_id = %payload.session_id,
            max_peers = config.max_peers,
            ttl_secs = config.invite_ttl_secs,
            "session created"
        );
        Ok(invite)
    }

    /// Stop admitting peers to a hosted session. Peers already joined are
    /// unaffected; presenting the invite afterwards is denied.
    pub fn revoke_invite(&self, session_id: SessionId) -> Result<()> {
        let host = self
            .hosted
            .get(&session_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::NotFound(format!("hosted session {session_id}")))?;
        host.revoke();
        Ok(())
    }

    /// Sessions currently hosted by this runtime.
    #[must_use]
    pub fn hosted_session_count(&self) -> usize {
        self.hosted.len()
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        for entry in self.hosted.iter() {
            self.transport.withdraw(*entry.key());
        }
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("backends", &self.backends)
            .field("hosted", &self.hosted.len())
            .finish()
    }
}

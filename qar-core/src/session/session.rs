use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use qar_proto::sync::Stamp;
use qar_proto::{invite, AppVolume, GuiPanel, PeerId, SessionId, SyncOp};

use crate::config::{PeerConfig, RenderSenderConfig};
use crate::error::{Error, Result};
use crate::render::{FrameReceiver, RenderSender, VisualizerPeer};
use crate::runtime::transport::{LoopbackTransport, Transport};
use crate::session::entities::{AppVolumes, GuiPanels};
use crate::session::host::{SessionHost, VISUALIZER_TOKEN_LENGTH};
use crate::sync::{apply_op, EntityTable, LamportClock};

/// Prefix of every visualizer connection string.
const VISUALIZER_PREFIX: &str = "qar-viz.";

/// Configuration for an asynchronous peer invitation.
#[derive(Debug, Clone)]
pub struct InvitePeerConfig {
    /// Connection string the remote visualizer advertised.
    pub connection_string: String,
    pub display_name: String,
    /// Frame queue depth between render senders and this peer.
    pub queue_depth: usize,
}

impl Default for InvitePeerConfig {
    fn default() -> Self {
        Self {
            connection_string: String::new(),
            display_name: "Visualizer".to_string(),
            queue_depth: 4,
        }
    }
}

/// Shared state behind one joined session.
pub(crate) struct SessionInner {
    session_id: SessionId,
    peer_id: PeerId,
    pub(crate) host: Arc<SessionHost>,
    pub(crate) clock: LamportClock,
    pub(crate) panels: EntityTable<GuiPanel>,
    pub(crate) volumes: EntityTable<AppVolume>,
    cancel: CancellationToken,
    closed: AtomicBool,
}

impl SessionInner {
    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::InvalidState(
                "session has been destroyed".to_string(),
            ));
        }
        Ok(())
    }

    /// Stamp for a local mutation.
    pub(crate) fn stamp(&self) -> Stamp {
        Stamp::new(self.clock.tick(), self.peer_id)
    }

    /// Commit a locally applied op: fold it into the authoritative tables
    /// and fan it out to the other replicas.
    pub(crate) fn commit(&self, op: SyncOp) {
        self.host.apply_and_publish(op);
    }

    /// Re-import the authoritative snapshot, e.g. after the propagation
    /// task lagged behind the hub.
    fn resync(&self) {
        let (panels, volumes) = self.host.export_tables();
        self.panels.import(panels);
        self.volumes.import(volumes);
    }
}

/// A live, joined membership in a shared session.
///
/// Owns its peer identity and a local replica of the session's entity
/// tables. Destroyed explicitly with [`Session::destroy`] or implicitly on
/// drop; destruction cancels pending invitations and detaches the peer.
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Join a session with an invite blob, via the process-wide loopback
    /// transport.
    ///
    /// Joining is a pure function of the blob: the same bytes may be
    /// joined concurrently by any number of peers, each receiving a
    /// distinct peer identity.
    pub async fn join(invite_bytes: &[u8], config: PeerConfig) -> Result<Self> {
        Self::join_via(LoopbackTransport::global(), invite_bytes, config).await
    }

    /// Join via an explicit transport.
    pub async fn join_via<T: Transport + ?Sized>(
        transport: Arc<T>,
        invite_bytes: &[u8],
        config: PeerConfig,
    ) -> Result<Self> {
        if invite_bytes.is_empty() {
            return Err(Error::InvalidArgument("invite blob is empty".to_string()));
        }

        let payload = invite::decode(invite_bytes)?;
        let host = transport.resolve(&payload.endpoint, payload.session_id)?;
        let peer_id = host.admit(&payload.secret, &config.display_name)?;

        // Subscribe before snapshotting so no op falls between the two;
        // ops replayed on top of the snapshot are idempotent.
        let ops_rx = host.hub().subscribe();
        let (panel_snapshot, volume_snapshot) = host.export_tables();

        let inner = Arc::new(SessionInner {
            session_id: payload.session_id,
            peer_id,
            host,
            clock: LamportClock::new(),
            panels: EntityTable::new(),
            volumes: EntityTable::new(),
            cancel: CancellationToken::new(),
            closed: AtomicBool::new(false),
        });
        inner.panels.import(panel_snapshot);
        inner.volumes.import(volume_snapshot);

        spawn_propagation_task(inner.clone(), ops_rx);

        info!(
            session_id = %inner.session_id,
            peer_id = %inner.peer_id,
            display_name = %config.display_name,
            "joined session"
        );
        Ok(Self { inner })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.inner.session_id
    }

    #[must_use]
    pub fn peer_id(&self) -> PeerId {
        self.inner.peer_id
    }

    /// GUI panel table of this session.
    #[must_use]
    pub fn gui_panels(&self) -> GuiPanels<'_> {
        GuiPanels::new(&self.inner)
    }

    /// App volume table of this session.
    #[must_use]
    pub fn app_volumes(&self) -> AppVolumes<'_> {
        AppVolumes::new(&self.inner)
    }

    /// Create a render sender streaming frames to this session's
    /// visualizer peers.
    pub fn create_render_sender(&self, config: RenderSenderConfig) -> Result<RenderSender> {
        self.inner.ensure_open()?;
        RenderSender::new(self.inner.host.clone(), config)
    }

    /// Mint a printable connection string a visualizer peer can present to
    /// [`Session::invite_peer`]. Each string is single-use.
    pub fn visualizer_connection_string(&self) -> Result<String> {
        self.inner.ensure_open()?;
        let token = self.inner.host.issue_visualizer_token();
        Ok(format!("{VISUALIZER_PREFIX}{}", URL_SAFE_NO_PAD.encode(token)))
    }

    /// Invite a visualizer peer asynchronously.
    ///
    /// `on_update` receives progress messages; `on_result` fires exactly
    /// once with the admitted peer (carrying its frame receiver) or an
    /// error. Both callbacks run on an internal task, never the caller's
    /// thread, and must not block. Destroying the session delivers
    /// [`Error::Cancelled`] to invitations still pending.
    pub fn invite_peer<R, U>(
        &self,
        config: InvitePeerConfig,
        on_result: R,
        on_update: U,
    ) -> Result<()>
    where
        R: FnOnce(Result<VisualizerPeer>) + Send + 'static,
        U: Fn(&str) + Send + 'static,
    {
        self.inner.ensure_open()?;
        let token = parse_connection_string(&config.connection_string)?;

        let inner = self.inner.clone();
        let cancel = self.inner.cancel.clone();
        tokio::spawn(async move {
            // Let a destroy racing with the spawn win.
            tokio::task::yield_now().await;
            if cancel.is_cancelled() {
                on_result(Err(Error::Cancelled));
                return;
            }

            on_update("connecting");
            let attached =
                inner
                    .host
                    .attach_visualizer(&token, &config.display_name, config.queue_depth);

            match attached {
                Ok((peer_id, rx)) => {
                    if cancel.is_cancelled() {
                        inner.host.leave(peer_id);
                        on_result(Err(Error::Cancelled));
                        return;
                    }
                    on_update("visualizer admitted");
                    on_result(Ok(VisualizerPeer {
                        peer_id,
                        frames: FrameReceiver::new(rx),
                    }));
                }
                Err(err) => on_result(Err(err)),
            }
        });
        Ok(())
    }

    /// Tear the session down: cancel pending invitations, stop the
    /// propagation task, and detach this peer. Safe to call twice; entity
    /// operations after destruction fail cleanly.
    pub fn destroy(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.cancel.cancel();
        self.inner.host.leave(self.inner.peer_id);
        info!(
            session_id = %self.inner.session_id,
            peer_id = %self.inner.peer_id,
            "session destroyed"
        );
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.inner.session_id)
            .field("peer_id", &self.inner.peer_id)
            .finish()
    }
}

fn parse_connection_string(s: &str) -> Result<[u8; VISUALIZER_TOKEN_LENGTH]> {
    let encoded = s.strip_prefix(VISUALIZER_PREFIX).ok_or_else(|| {
        Error::InvalidArgument("connection string is not a visualizer endpoint".to_string())
    })?;
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|_| Error::InvalidArgument("connection string is not decodable".to_string()))?;
    bytes.try_into().map_err(|_| {
        Error::InvalidArgument("connection string token has the wrong length".to_string())
    })
}

/// Apply hub ops to this replica until the session is destroyed.
fn spawn_propagation_task(inner: Arc<SessionInner>, mut ops_rx: broadcast::Receiver<SyncOp>) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = inner.cancel.cancelled() => break,
                result = ops_rx.recv() => match result {
                    Ok(op) => {
                        inner.clock.observe(op.stamp().clock);
                        if op.stamp().origin == inner.peer_id {
                            // Already applied on the local mutation path.
                            continue;
                        }
                        apply_op(&inner.panels, &inner.volumes, &op);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(
                            session_id = %inner.session_id,
                            peer_id = %inner.peer_id,
                            missed,
                            "replica lagged behind the sync hub, resyncing from snapshot"
                        );
                        inner.resync();
                    }
                }
            }
        }
        debug!(
            session_id = %inner.session_id,
            peer_id = %inner.peer_id,
            "propagation task stopped"
        );
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_string_round_trip() {
        let token = [9u8; VISUALIZER_TOKEN_LENGTH];
        let s = format!("{VISUALIZER_PREFIX}{}", URL_SAFE_NO_PAD.encode(token));
        assert_eq!(parse_connection_string(&s).expect("parse"), token);
    }

    #[test]
    fn test_connection_string_rejects_garbage() {
        assert!(parse_connection_string("not-a-connection-string").is_err());
        assert!(parse_connection_string("qar-viz.!!!").is_err());
        assert!(parse_connection_string("qar-viz.AAAA").is_err());
    }
}

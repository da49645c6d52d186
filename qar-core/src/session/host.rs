use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use rand::Rng;
use tokio::sync::mpsc;
use tracing::info;

use qar_proto::frame::VideoFrame;
use qar_proto::invite::SECRET_LENGTH;
use qar_proto::{AppVolume, GuiPanel, PeerId, SessionId, SyncOp};

use crate::config::SessionCreateConfig;
use crate::error::{Error, Result};
use crate::session::hub::SessionHub;
use crate::sync::{apply_op, EntityTable, TableSnapshot};

/// Byte length of a single-use visualizer connection token.
pub const VISUALIZER_TOKEN_LENGTH: usize = 16;

/// Why a peer is in the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerKind {
    /// A full participant admitted through the invite blob.
    Participant,
    /// A frame consumer admitted through a visualizer connection string.
    Visualizer,
}

#[derive(Debug, Clone)]
pub struct PeerInfo {
    pub display_name: String,
    pub kind: PeerKind,
    pub joined_at: DateTime<Utc>,
}

/// Hosting side of one session.
///
/// Owns admission (secret check, capacity, revocation), the peer roster,
/// the sync op hub, and the frame sinks of attached visualizers. Joined
/// [`Session`](crate::session::Session) objects hold an `Arc` to it; the
/// runtime's transport resolves invites to it.
#[derive(Debug)]
pub struct SessionHost {
    id: SessionId,
    secret: [u8; SECRET_LENGTH],
    max_peers: usize,
    revoked: AtomicBool,
    roster: DashMap<PeerId, PeerInfo>,
    hub: SessionHub,
    /// Authoritative entity state, used to bootstrap late joiners.
    panels: EntityTable<GuiPanel>,
    volumes: EntityTable<AppVolume>,
    visualizer_tokens: DashSet<[u8; VISUALIZER_TOKEN_LENGTH]>,
    frame_sinks: DashMap<PeerId, mpsc::Sender<VideoFrame>>,
}

impl SessionHost {
    #[must_use]
    pub fn new(id: SessionId, secret: [u8; SECRET_LENGTH], config: &SessionCreateConfig) -> Self {
        Self {
            id,
            secret,
            max_peers: config.max_peers,
            revoked: AtomicBool::new(false),
            roster: DashMap::new(),
            hub: SessionHub::new(config.sync_queue_depth),
            panels: EntityTable::new(),
            volumes: EntityTable::new(),
            visualizer_tokens: DashSet::new(),
            frame_sinks: DashMap::new(),
        }
    }

    /// Fold an op into the authoritative tables and fan it out to every
    /// subscribed replica.
    pub fn apply_and_publish(&self, op: SyncOp) {
        apply_op(&self.panels, &self.volumes, &op);
        self.hub.publish(op);
    }

    /// Snapshot of the authoritative tables for replica bootstrap.
    #[must_use]
    pub fn export_tables(&self) -> (TableSnapshot<GuiPanel>, TableSnapshot<AppVolume>) {
        (self.panels.export(), self.volumes.export())
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn hub(&self) -> &SessionHub {
        &self.hub
    }

    #[must_use]
    pub fn peer_count(&self) -> usize {
        self.roster.len()
    }

    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked.load(Ordering::Acquire)
    }

    /// Stop admitting new peers. Already-joined peers are unaffected.
    pub fn revoke(&self) {
        self.revoked.store(true, Ordering::Release);
        info!(session_id = %self.id, "session invite revoked");
    }

    /// Admit a peer presenting the invite secret. Assigns a fresh unique
    /// peer identity.
    pub fn admit(&self, secret: &[u8; SECRET_LENGTH], display_name: &str) -> Result<PeerId> {
        if secret != &self.secret {
            return Err(Error::Denied("invite secret rejected".to_string()));
        }
        self.admit_internal(display_name, PeerKind::Participant)
    }

    fn admit_internal(&self, display_name: &str, kind: PeerKind) -> Result<PeerId> {
        if self.is_revoked() {
            return Err(Error::Denied("session invite has been revoked".to_string()));
        }
        if self.roster.len() >= self.max_peers {
            return Err(Error::TooManyPeers {
                capacity: self.max_peers,
            });
        }

        let info = PeerInfo {
            display_name: display_name.to_string(),
            kind,
            joined_at: Utc::now(),
        };

        // Random ids collide with negligible probability; the entry loop
        // still guarantees uniqueness within the roster.
        loop {
            let peer_id = PeerId::new();
            match self.roster.entry(peer_id) {
                dashmap::mapref::entry::Entry::Vacant(entry) => {
                    entry.insert(info);
                    info!(
                        session_id = %self.id,
                        peer_id = %peer_id,
                        display_name,
                        ?kind,
                        "peer admitted"
                    );
                    return Ok(peer_id);
                }
                dashmap::mapref::entry::Entry::Occupied(_) => continue,
            }
        }
    }

    /// Remove a departed peer and its frame sink, if any.
    pub fn leave(&self, peer_id: PeerId) {
        if self.roster.remove(&peer_id).is_some() {
            info!(session_id = %self.id, peer_id = %peer_id, "peer left");
        }
        self.frame_sinks.remove(&peer_id);
    }

    /// Mint a single-use token a visualizer presents to attach.
    #[must_use]
    pub fn issue_visualizer_token(&self) -> [u8; VISUALIZER_TOKEN_LENGTH] {
        let token: [u8; VISUALIZER_TOKEN_LENGTH] = rand::rng().random();
        self.visualizer_tokens.insert(token);
        token
    }

    /// Attach a visualizer peer: consumes its token, admits it, and wires a
    /// bounded frame queue between render senders and the new peer.
    pub fn attach_visualizer(
        &self,
        token: &[u8; VISUALIZER_TOKEN_LENGTH],
        display_name: &str,
        queue_depth: usize,
    ) -> Result<(PeerId, mpsc::Receiver<VideoFrame>)> {
        if self.visualizer_tokens.remove(token).is_none() {
            return Err(Error::Denied("unknown visualizer token".to_string()));
        }

        let peer_id = self.admit_internal(display_name, PeerKind::Visualizer)?;
        let (tx, rx) = mpsc::channel(queue_depth.max(1));
        self.frame_sinks.insert(peer_id, tx);
        Ok((peer_id, rx))
    }

    /// Current frame sinks. Senders clone the channels and drop sinks whose
    /// receivers have gone away.
    #[must_use]
    pub fn frame_sinks(&self) -> Vec<(PeerId, mpsc::Sender<VideoFrame>)> {
        self.frame_sinks
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    /// Forget the sink of a visualizer whose receiver was dropped.
    pub fn drop_sink(&self, peer_id: PeerId) {
        self.frame_sinks.remove(&peer_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host_with_capacity(max_peers: usize) -> SessionHost {
        let config = SessionCreateConfig {
            max_peers,
            ..SessionCreateConfig::default()
        };
        SessionHost::new(SessionId::new(), [7u8; SECRET_LENGTH], &config)
    }

    #[test]
    fn test_admit_assigns_distinct_ids() {
        let host = host_with_capacity(8);
        let a = host.admit(&[7u8; SECRET_LENGTH], "a").expect("admit a");
        let b = host.admit(&[7u8; SECRET_LENGTH], "b").expect("admit b");
        assert_ne!(a, b);
        assert_eq!(host.peer_count(), 2);
    }

    #[test]
    fn test_wrong_secret_is_denied() {
        let host = host_with_capacity(8);
        let err = host.admit(&[0u8; SECRET_LENGTH], "x").expect_err("denied");
        assert!(matches!(err, Error::Denied(_)));
    }

    #[test]
    fn test_capacity_exhaustion() {
        let host = host_with_capacity(1);
        host.admit(&[7u8; SECRET_LENGTH], "a").expect("first");
        let err = host.admit(&[7u8; SECRET_LENGTH], "b").expect_err("full");
        assert!(matches!(err, Error::TooManyPeers { capacity: 1 }));
    }

    #[test]
    fn test_capacity_frees_on_leave() {
        let host = host_with_capacity(1);
        let peer = host.admit(&[7u8; SECRET_LENGTH], "a").expect("first");
        host.leave(peer);
        host.admit(&[7u8; SECRET_LENGTH], "b").expect("second");
    }

    #[test]
    fn test_revoked_host_denies_even_valid_secret() {
        let host = host_with_capacity(8);
        host.revoke();
        let err = host.admit(&[7u8; SECRET_LENGTH], "x").expect_err("revoked");
        assert!(matches!(err, Error::Denied(_)));
    }

    #[test]
    fn test_visualizer_token_is_single_use() {
        let host = host_with_capacity(8);
        let token = host.issue_visualizer_token();
        host.attach_visualizer(&token, "viz", 4).expect("first attach");
        let err = host
            .attach_visualizer(&token, "viz", 4)
            .expect_err("token consumed");
        assert!(matches!(err, Error::Denied(_)));
    }
}

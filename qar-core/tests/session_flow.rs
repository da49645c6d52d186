//! End-to-end flows: hosting, joining, entity propagation, and frame
//! streaming between peers living in one process.

use std::time::Duration;

use tokio::sync::oneshot;

use qar_core::proto::invite::{self, InvitePayload};
use qar_core::proto::{PanelSize, PanelState, Pose, SessionId, MAX_URI_BYTES};
use qar_core::{
    Error, InvitePeerConfig, Library, LibraryConfig, PanelInit, PeerConfig, RenderSenderConfig,
    ResultCode, RuntimeConfig, Session, SessionCreateConfig, ShowConfig, TextureExtent,
    VisualizerPeer,
};

fn quiet_library() -> Library {
    Library::init(LibraryConfig {
        enable_console_logging: false,
        ..LibraryConfig::default()
    })
    .expect("library init")
}

fn small_sender_config() -> RenderSenderConfig {
    RenderSenderConfig {
        textures: vec![TextureExtent {
            width: 8,
            height: 4,
        }],
        row_alignment: 64,
        ..RenderSenderConfig::default()
    }
}

/// Poll until the guest's replica reports `expected` panels.
async fn wait_for_panel_count(session: &Session, expected: usize) {
    for _ in 0..100 {
        if session.gui_panels().count().expect("count") == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!(
        "replica never reached {expected} panels, still at {}",
        session.gui_panels().count().expect("count")
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_host_join_and_panel_propagation() {
    let library = quiet_library();
    let runtime = library
        .create_runtime(RuntimeConfig::default())
        .expect("runtime");
    let invite = runtime
        .create_session(SessionCreateConfig::default())
        .expect("session");
    assert!(!invite.is_empty());

    // The blob is pure data: concurrent joins of the same bytes each get
    // their own peer identity.
    let (host_peer, guest) = tokio::join!(
        Session::join(
            invite.data(),
            PeerConfig {
                display_name: "Host".to_string()
            }
        ),
        Session::join(
            invite.data(),
            PeerConfig {
                display_name: "Guest".to_string()
            }
        ),
    );
    let host_peer = host_peer.expect("host joins");
    let guest = guest.expect("guest joins");
    assert_eq!(host_peer.id(), guest.id());
    assert_ne!(host_peer.peer_id(), guest.peer_id());

    let panel_id = host_peer
        .gui_panels()
        .add(PanelInit {
            display_name: "Tutorial Panel".to_string(),
            pose: Pose::at(0.5, 1.5, -1.2),
            size: PanelSize {
                width_meters: 1.2,
                height_meters: 0.7,
            },
            uri: "https://example.com".to_string(),
        })
        .expect("add panel");

    // Visible locally before any propagation round trip.
    assert_eq!(host_peer.gui_panels().count().expect("count"), 1);

    wait_for_panel_count(&guest, 1).await;
    let listed = guest.gui_panels().list(8).expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, panel_id);
    assert_eq!(listed[0].display_name, "Tutorial Panel");

    // Closing removes the panel everywhere; later writes miss cleanly.
    host_peer.gui_panels().close(panel_id).expect("close");
    assert!(matches!(
        host_peer
            .gui_panels()
            .update_pose(panel_id, Pose::default()),
        Err(Error::NotFound(_))
    ));
    wait_for_panel_count(&guest, 0).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_late_joiner_bootstraps_existing_entities() {
    let library = quiet_library();
    let runtime = library
        .create_runtime(RuntimeConfig::default())
        .expect("runtime");
    let invite = runtime
        .create_session(SessionCreateConfig::default())
        .expect("session");

    let first = Session::join(invite.data(), PeerConfig::default())
        .await
        .expect("first joins");
    first
        .gui_panels()
        .add(PanelInit {
            display_name: "Already Here".to_string(),
            ..PanelInit::default()
        })
        .expect("add");

    // A peer joining after the fact sees state created before its join.
    let late = Session::join(invite.data(), PeerConfig::default())
        .await
        .expect("late joins");
    assert_eq!(late.gui_panels().count().expect("count"), 1);
    assert_eq!(
        late.gui_panels().list(4).expect("list")[0].display_name,
        "Already Here"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_zero_capacity_list_is_rejected() {
    let library = quiet_library();
    let runtime = library
        .create_runtime(RuntimeConfig::default())
        .expect("runtime");
    let invite = runtime
        .create_session(SessionCreateConfig::default())
        .expect("session");
    let session = Session::join(invite.data(), PeerConfig::default())
        .await
        .expect("join");

    assert!(matches!(
        session.gui_panels().list(0),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        session.app_volumes().list(0),
        Err(Error::InvalidArgument(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_closing_via_state_change_stops_enumeration() {
    let library = quiet_library();
    let runtime = library
        .create_runtime(RuntimeConfig::default())
        .expect("runtime");
    let invite = runtime
        .create_session(SessionCreateConfig::default())
        .expect("session");
    let session = Session::join(invite.data(), PeerConfig::default())
        .await
        .expect("join");

    let id = session
        .gui_panels()
        .add(PanelInit {
            display_name: "Short Lived".to_string(),
            ..PanelInit::default()
        })
        .expect("add");

    session
        .gui_panels()
        .set_state(id, PanelState::Minimized)
        .expect("minimize");
    assert_eq!(session.gui_panels().count().expect("count"), 1);

    // Setting Closed removes the panel outright, like close().
    session
        .gui_panels()
        .set_state(id, PanelState::Closed)
        .expect("close via state");
    assert_eq!(session.gui_panels().count().expect("count"), 0);
    assert!(session.gui_panels().list(8).expect("list").is_empty());
    assert!(matches!(
        session.gui_panels().get(id),
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        session.gui_panels().set_state(id, PanelState::Visible),
        Err(Error::NotFound(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_navigate_to_uri_updates_and_bounds() {
    let library = quiet_library();
    let runtime = library
        .create_runtime(RuntimeConfig::default())
        .expect("runtime");
    let invite = runtime
        .create_session(SessionCreateConfig::default())
        .expect("session");
    let session = Session::join(invite.data(), PeerConfig::default())
        .await
        .expect("join");

    let id = session
        .gui_panels()
        .add(PanelInit {
            display_name: "Browser".to_string(),
            uri: "https://example.com/start".to_string(),
            ..PanelInit::default()
        })
        .expect("add");

    session
        .gui_panels()
        .navigate_to_uri(id, "https://example.com/next")
        .expect("navigate");
    assert_eq!(
        session.gui_panels().get(id).expect("get").uri,
        "https://example.com/next"
    );

    let oversized = "a".repeat(MAX_URI_BYTES + 1);
    assert!(matches!(
        session.gui_panels().navigate_to_uri(id, &oversized),
        Err(Error::InvalidArgument(_))
    ));
    // The rejected write left the panel untouched.
    assert_eq!(
        session.gui_panels().get(id).expect("get").uri,
        "https://example.com/next"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_malformed_and_expired_invites_are_rejected() {
    let _library = quiet_library();

    let err = Session::join(b"definitely not an invite", PeerConfig::default())
        .await
        .expect_err("garbage blob");
    assert_eq!(err.code(), ResultCode::InvalidInvite);

    let err = Session::join(&[], PeerConfig::default())
        .await
        .expect_err("empty blob");
    assert_eq!(err.code(), ResultCode::InvalidArgument);

    let stale = invite::encode(&InvitePayload::new(
        SessionId::new(),
        "loopback".to_string(),
        -10,
    ));
    let err = Session::join(stale.data(), PeerConfig::default())
        .await
        .expect_err("expired blob");
    assert_eq!(err.code(), ResultCode::InviteExpired);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_revoked_invite_denies_new_peers_only() {
    let library = quiet_library();
    let runtime = library
        .create_runtime(RuntimeConfig::default())
        .expect("runtime");
    let invite = runtime
        .create_session(SessionCreateConfig::default())
        .expect("session");

    let joined = Session::join(invite.data(), PeerConfig::default())
        .await
        .expect("joins before revocation");

    runtime.revoke_invite(invite.session_id()).expect("revoke");

    let err = Session::join(invite.data(), PeerConfig::default())
        .await
        .expect_err("denied after revocation");
    assert_eq!(err.code(), ResultCode::Denied);

    // The already-admitted peer keeps working.
    joined
        .gui_panels()
        .add(PanelInit::default())
        .expect("still a member");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_frame_streaming_to_invited_visualizer() {
    let library = quiet_library();
    let runtime = library
        .create_runtime(RuntimeConfig::default())
        .expect("runtime");
    let invite = runtime
        .create_session(SessionCreateConfig::default())
        .expect("session");
    let session = Session::join(invite.data(), PeerConfig::default())
        .await
        .expect("join");

    let connection_string = session
        .visualizer_connection_string()
        .expect("connection string");

    let (result_tx, result_rx) = oneshot::channel();
    session
        .invite_peer(
            InvitePeerConfig {
                connection_string,
                ..InvitePeerConfig::default()
            },
            move |result| {
                let _ = result_tx.send(result);
            },
            |_progress| {},
        )
        .expect("invite accepted");

    let VisualizerPeer {
        peer_id: _,
        mut frames,
    } = result_rx
        .await
        .expect("callback fired")
        .expect("visualizer admitted");

    let sender = session
        .create_render_sender(small_sender_config())
        .expect("sender");

    let mut guard = sender.begin_frame().expect("begin");
    assert!(matches!(
        sender.begin_frame(),
        Err(Error::FrameAlreadyInFlight)
    ));
    {
        let textures = guard.cpu_textures().expect("acquire");
        let tex = &mut textures[0];
        let pitch = tex.layout.pitch as usize;
        for y in 0..tex.layout.height as usize {
            for x in 0..tex.layout.width as usize {
                let px = y * pitch + x * 4;
                tex.data[px..px + 4].copy_from_slice(&[x as u8, y as u8, 0, 0xFF]);
            }
        }
    }
    sender
        .show_frame(
            guard,
            ShowConfig {
                near_plane: 0.1,
                far_plane: 10.0,
            },
        )
        .await
        .expect("show");

    let frame = frames.recv().await.expect("frame arrives");
    assert_eq!(frame.header.frame_index, 0);
    assert!((frame.header.near_plane - 0.1).abs() < f32::EPSILON);
    assert_eq!(frame.pixel(0, 3, 2), Some([3, 2, 0, 0xFF]));
    // Reads past the logical width fail even though the pitch has room.
    assert_eq!(frame.pixel(0, 8, 0), None);
}

#[tokio::test]
async fn test_destroy_cancels_pending_invitation() {
    let library = quiet_library();
    let runtime = library
        .create_runtime(RuntimeConfig::default())
        .expect("runtime");
    let invite = runtime
        .create_session(SessionCreateConfig::default())
        .expect("session");
    let session = Session::join(invite.data(), PeerConfig::default())
        .await
        .expect("join");
    let connection_string = session
        .visualizer_connection_string()
        .expect("connection string");

    let (result_tx, result_rx) = oneshot::channel();
    session
        .invite_peer(
            InvitePeerConfig {
                connection_string,
                ..InvitePeerConfig::default()
            },
            move |result| {
                let _ = result_tx.send(result);
            },
            |_progress| {},
        )
        .expect("invite accepted");

    // Single-threaded runtime: the invitation task has not run yet, so
    // destroying first must deliver a cancellation, not a peer.
    session.destroy();

    let result = result_rx.await.expect("callback fired exactly once");
    assert!(matches!(result, Err(Error::Cancelled)));

    // Entity access after destruction fails cleanly.
    assert!(matches!(
        session.gui_panels().count(),
        Err(Error::InvalidState(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_connection_string_fails_synchronously() {
    let library = quiet_library();
    let runtime = library
        .create_runtime(RuntimeConfig::default())
        .expect("runtime");
    let invite = runtime
        .create_session(SessionCreateConfig::default())
        .expect("session");
    let session = Session::join(invite.data(), PeerConfig::default())
        .await
        .expect("join");

    let err = session
        .invite_peer(
            InvitePeerConfig {
                connection_string: "not-a-visualizer".to_string(),
                ..InvitePeerConfig::default()
            },
            |_result| {},
            |_progress| {},
        )
        .expect_err("rejected before spawning");
    assert_eq!(err.code(), ResultCode::InvalidArgument);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_session_capacity_is_enforced() {
    let library = quiet_library();
    let runtime = library
        .create_runtime(RuntimeConfig::default())
        .expect("runtime");
    let invite = runtime
        .create_session(SessionCreateConfig {
            max_peers: 1,
            ..SessionCreateConfig::default()
        })
        .expect("session");

    let _only = Session::join(invite.data(), PeerConfig::default())
        .await
        .expect("first join");
    let err = Session::join(invite.data(), PeerConfig::default())
        .await
        .expect_err("second join");
    assert_eq!(err.code(), ResultCode::TooManyPeers);
}

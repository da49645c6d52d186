//! Session handshake manager: invite hosting, peer admission, and the live
//! session object a joined peer holds.

pub mod entities;
pub mod host;
pub mod hub;
#[allow(clippy::module_inception)]
pub mod session;

pub use entities::{AppVolumes, GuiPanels, PanelInit, VolumeInit};
pub use host::{PeerInfo, PeerKind, SessionHost};
pub use hub::SessionHub;
pub use session::{InvitePeerConfig, Session};

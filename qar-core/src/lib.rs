//! Core of the QAR streaming SDK.
//!
//! A host application initializes a [`Library`], creates a [`Runtime`],
//! hosts sessions and hands out invite blobs; remote peers join with
//! [`Session::join`], manipulate the shared GUI panel and app volume
//! tables, and stream rendered frames to visualizer peers through a
//! [`render::RenderSender`].

pub mod config;
pub mod error;
pub mod logging;
pub mod render;
pub mod runtime;
pub mod session;
pub mod sync;

pub use qar_proto as proto;

pub use config::{
    BackpressurePolicy, GraphicsBackend, LibraryConfig, PeerConfig, RenderSenderConfig,
    RuntimeConfig, SessionCreateConfig, TextureExtent,
};
pub use error::{Error, Result, ResultCode};
pub use render::{CpuTexture, FrameGuard, FrameReceiver, RenderSender, ShowConfig, VisualizerPeer};
pub use runtime::{Backend, Library, Runtime};
pub use session::{InvitePeerConfig, PanelInit, Session, VolumeInit};

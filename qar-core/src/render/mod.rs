//! Frame streaming pipeline: per-session render senders producing frames
//! for subscribed visualizer peers.

pub mod receiver;
pub mod sender;

pub use receiver::{FrameReceiver, VisualizerPeer};
pub use sender::{CpuTexture, FrameGuard, RenderSender, ShowConfig};

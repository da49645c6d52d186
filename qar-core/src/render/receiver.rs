use tokio::sync::mpsc;

use qar_proto::frame::VideoFrame;
use qar_proto::PeerId;

/// Receiving end of a visualizer's frame queue.
///
/// The queue is bounded; what happens when it fills is the sender's
/// backpressure policy, not the receiver's concern.
#[derive(Debug)]
pub struct FrameReceiver {
    rx: mpsc::Receiver<VideoFrame>,
}

impl FrameReceiver {
    pub(crate) fn new(rx: mpsc::Receiver<VideoFrame>) -> Self {
        Self { rx }
    }

    /// Wait for the next frame. `None` once every sender side is gone.
    pub async fn recv(&mut self) -> Option<VideoFrame> {
        self.rx.recv().await
    }

    /// Non-blocking poll for an already queued frame.
    pub fn try_recv(&mut self) -> Option<VideoFrame> {
        self.rx.try_recv().ok()
    }
}

/// A visualizer admitted through an asynchronous peer invitation.
#[derive(Debug)]
pub struct VisualizerPeer {
    pub peer_id: PeerId,
    pub frames: FrameReceiver,
}

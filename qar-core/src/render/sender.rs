use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

use qar_proto::frame::{FrameHeader, FrameLayout, TextureLayout, VideoFrame, MAX_TEXTURE_EXTENT};

use crate::config::{BackpressurePolicy, GraphicsBackend, RenderSenderConfig};
use crate::error::{Error, Result};
use crate::session::host::SessionHost;

/// Near/far clip planes a frame was rendered with, required so the
/// receiving side can unproject depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShowConfig {
    pub near_plane: f32,
    pub far_plane: f32,
}

/// One CPU texture of a pending frame.
///
/// `data` is `layout.pitch * layout.height` bytes; rows start at multiples
/// of the pitch, not of the packed row size.
#[derive(Debug)]
pub struct CpuTexture {
    pub layout: TextureLayout,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameStage {
    Begun,
    Ready,
}

/// A frame between `begin_frame` and `show_frame`.
///
/// Dropping the guard without showing discards the frame and returns the
/// sender to idle.
#[derive(Debug)]
pub struct FrameGuard {
    textures: Vec<CpuTexture>,
    stage: FrameStage,
    in_flight: Arc<AtomicBool>,
}

impl FrameGuard {
    /// Acquire the CPU pixel buffers of this frame, one per configured
    /// texture. Valid exactly once per frame.
    pub fn cpu_textures(&mut self) -> Result<&mut [CpuTexture]> {
        match self.stage {
            FrameStage::Begun => {
                self.stage = FrameStage::Ready;
                Ok(&mut self.textures)
            }
            FrameStage::Ready => Err(Error::InvalidState(
                "frame pixel buffers were already acquired".to_string(),
            )),
        }
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

/// Per-session producer of rendered frames.
///
/// Enforces a single frame in flight per sender; independent senders
/// proceed fully in parallel.
pub struct RenderSender {
    host: Arc<SessionHost>,
    layout: FrameLayout,
    backpressure: BackpressurePolicy,
    in_flight: Arc<AtomicBool>,
    frame_index: AtomicU64,
}

impl RenderSender {
    pub(crate) fn new(host: Arc<SessionHost>, config: RenderSenderConfig) -> Result<Self> {
        if config.graphics == GraphicsBackend::Gpu {
            return Err(Error::ResourceExhausted(
                "no GPU backend discovered; this build provides the CPU backend".to_string(),
            ));
        }
        if config.textures.is_empty() {
            return Err(Error::InvalidArgument(
                "a frame needs at least one texture".to_string(),
            ));
        }
        if !config.row_alignment.is_power_of_two() {
            return Err(Error::InvalidArgument(
                "row alignment must be a power of two".to_string(),
            ));
        }
        if config
            .textures
            .iter()
            .any(|t| t.width == 0 || t.height == 0)
        {
            return Err(Error::InvalidArgument(
                "texture extents must be nonzero".to_string(),
            ));
        }
        if config
            .textures
            .iter()
            .any(|t| t.width > MAX_TEXTURE_EXTENT || t.height > MAX_TEXTURE_EXTENT)
        {
            return Err(Error::InvalidArgument(format!(
                "texture extents are limited to {MAX_TEXTURE_EXTENT} pixels per side"
            )));
        }

        let layout = FrameLayout {
            format: config.pixel_format,
            textures: config
                .textures
                .iter()
                .map(|t| {
                    TextureLayout::with_alignment(
                        t.width,
                        t.height,
                        config.pixel_format,
                        config.row_alignment,
                    )
                })
                .collect(),
        };

        Ok(Self {
            host,
            layout,
            backpressure: config.backpressure,
            in_flight: Arc::new(AtomicBool::new(false)),
            frame_index: AtomicU64::new(0),
        })
    }

    /// Resolved frame layout, pitches included.
    #[must_use]
    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// Start a frame. Fails while another frame of this sender is begun
    /// but not yet shown or discarded.
    pub fn begin_frame(&self) -> Result<FrameGuard> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            return Err(Error::FrameAlreadyInFlight);
        }

        let textures = self
            .layout
            .textures
            .iter()
            .map(|layout| CpuTexture {
                layout: *layout,
                data: vec![0u8; layout.byte_size()],
            })
            .collect();

        Ok(FrameGuard {
            textures,
            stage: FrameStage::Begun,
            in_flight: self.in_flight.clone(),
        })
    }

    /// Transmit an acquired frame to every subscribed visualizer and
    /// return the sender to idle.
    ///
    /// Backpressure follows the configured policy: `Drop` reports
    /// [`Error::Overrun`] immediately when a subscriber queue is full,
    /// `Block` waits up to its timeout first. A dropped frame is never
    /// retransmitted or duplicated.
    pub async fn show_frame(&self, mut guard: FrameGuard, show: ShowConfig) -> Result<()> {
        if !Arc::ptr_eq(&guard.in_flight, &self.in_flight) {
            return Err(Error::InvalidArgument(
                "frame guard belongs to a different sender".to_string(),
            ));
        }
        if guard.stage != FrameStage::Ready {
            return Err(Error::InvalidState(
                "show_frame requires acquired pixel buffers".to_string(),
            ));
        }
        if !(show.near_plane > 0.0 && show.far_plane > show.near_plane) {
            return Err(Error::InvalidArgument(
                "near/far planes must satisfy 0 < near < far".to_string(),
            ));
        }

        let planes: Vec<Bytes> = std::mem::take(&mut guard.textures)
            .into_iter()
            .map(|t| Bytes::from(t.data))
            .collect();
        // Pixel data is copied out; the sender is idle again.
        drop(guard);

        let frame = VideoFrame {
            header: FrameHeader {
                frame_index: self.frame_index.fetch_add(1, Ordering::AcqRel),
                timestamp_us: Utc::now().timestamp_micros(),
                near_plane: show.near_plane,
                far_plane: show.far_plane,
            },
            layout: self.layout.clone(),
            planes,
        };

        let mut overrun = false;
        for (peer_id, sink) in self.host.frame_sinks() {
            match self.backpressure {
                BackpressurePolicy::Drop => match sink.try_send(frame.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        debug!(peer_id = %peer_id, "frame dropped, subscriber queue full");
                        overrun = true;
                    }
                    Err(TrySendError::Closed(_)) => self.host.drop_sink(peer_id),
                },
                BackpressurePolicy::Block { timeout } => {
                    match tokio::time::timeout(timeout, sink.send(frame.clone())).await {
                        Ok(Ok(())) => {}
                        Ok(Err(_)) => self.host.drop_sink(peer_id),
                        Err(_) => {
                            debug!(peer_id = %peer_id, "frame dropped after blocking timeout");
                            overrun = true;
                        }
                    }
                }
            }
        }

        if overrun {
            Err(Error::Overrun)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for RenderSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSender")
            .field("layout", &self.layout)
            .finish()
    }
}

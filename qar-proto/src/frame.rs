//! Video frame packets exchanged between a render sender and visualizers.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Pixel format of a CPU texture. Both formats are 4 bytes per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    #[default]
    Rgba8,
    Bgra8,
}

impl PixelFormat {
    /// Bytes per pixel.
    #[must_use]
    pub const fn pixel_size(self) -> u32 {
        match self {
            Self::Rgba8 | Self::Bgra8 => 4,
        }
    }
}

/// Upper bound for texture width and height, in pixels. Keeps every pitch
/// computation comfortably inside `u32` for any power-of-two alignment.
pub const MAX_TEXTURE_EXTENT: u32 = 16_384;

/// Resolved layout of one texture inside a frame.
///
/// `pitch` is the row stride in bytes and may exceed `width * pixel_size`
/// due to alignment. Writers must advance rows by pitch, never by the
/// packed row size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureLayout {
    pub width: u32,
    pub height: u32,
    pub pitch: u32,
}

impl TextureLayout {
    /// Compute the layout for a texture, rounding the row stride up to
    /// `row_alignment` bytes (alignment must be a power of two, width at
    /// most [`MAX_TEXTURE_EXTENT`]).
    #[must_use]
    pub fn with_alignment(width: u32, height: u32, format: PixelFormat, row_alignment: u32) -> Self {
        // Widened so an oversized width cannot wrap mid-computation; with
        // width bounded by MAX_TEXTURE_EXTENT the result always fits u32.
        let packed = u64::from(width) * u64::from(format.pixel_size());
        let align = u64::from(row_alignment.max(1));
        let pitch = packed.div_ceil(align) * align;
        Self {
            width,
            height,
            pitch: u32::try_from(pitch).unwrap_or(u32::MAX),
        }
    }

    /// Total byte size of a buffer holding this texture.
    #[must_use]
    pub const fn byte_size(&self) -> usize {
        self.pitch as usize * self.height as usize
    }
}

/// Resolved layout of a whole frame (one entry per texture, e.g. stereo
/// left/right).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameLayout {
    pub format: PixelFormat,
    pub textures: Vec<TextureLayout>,
}

/// Timing and projection metadata attached to every transmitted frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameHeader {
    /// Monotonically increasing per-sender frame counter.
    pub frame_index: u64,
    /// Capture timestamp, microseconds since the unix epoch.
    pub timestamp_us: i64,
    /// Near clip plane the frame was rendered with.
    pub near_plane: f32,
    /// Far clip plane the frame was rendered with.
    pub far_plane: f32,
}

/// One transmitted frame: header, layout, and pixel planes (one per
/// texture). Planes are cheaply cloneable so fan-out to several
/// visualizers shares the underlying allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub header: FrameHeader,
    pub layout: FrameLayout,
    pub planes: Vec<Bytes>,
}

impl VideoFrame {
    /// Read back pixel `(x, y)` of a texture, honoring the pitch.
    #[must_use]
    pub fn pixel(&self, texture: usize, x: u32, y: u32) -> Option<[u8; 4]> {
        let layout = self.layout.textures.get(texture)?;
        let plane = self.planes.get(texture)?;
        if x >= layout.width || y >= layout.height {
            return None;
        }
        let offset = y as usize * layout.pitch as usize
            + x as usize * self.layout.format.pixel_size() as usize;
        let bytes = plane.get(offset..offset + 4)?;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

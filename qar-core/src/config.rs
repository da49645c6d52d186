use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use qar_proto::PixelFormat;

/// Process-wide SDK configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Emit logs to the console.
    pub enable_console_logging: bool,
    /// Optional directory for rolling log files.
    pub log_directory: Option<PathBuf>,
    /// Log filter, e.g. "info" or "qar_core=debug".
    pub log_level: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            enable_console_logging: true,
            log_directory: None,
            log_level: "info".to_string(),
        }
    }
}

/// Runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Directory scanned for backend binaries. `None` skips discovery and
    /// leaves only the built-in CPU backend available.
    pub runtime_binaries_dir: Option<PathBuf>,
}

/// Session hosting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionCreateConfig {
    /// Maximum number of admitted peers.
    pub max_peers: usize,
    /// Invite validity window in seconds.
    pub invite_ttl_secs: i64,
    /// Fan-out queue depth for entity synchronization ops.
    pub sync_queue_depth: usize,
}

impl Default for SessionCreateConfig {
    fn default() -> Self {
        Self {
            max_peers: 16,
            invite_ttl_secs: 3600,
            sync_queue_depth: 1024,
        }
    }
}

/// Joining peer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerConfig {
    pub display_name: String,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            display_name: "Peer".to_string(),
        }
    }
}

/// Graphics backend a render sender is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GraphicsBackend {
    #[default]
    Cpu,
    Gpu,
}

/// What `show_frame` does when the transport cannot keep up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackpressurePolicy {
    /// Drop the frame immediately and report an overrun.
    Drop,
    /// Wait up to the timeout for queue space, then report an overrun.
    Block { timeout: Duration },
}

impl Default for BackpressurePolicy {
    fn default() -> Self {
        Self::Drop
    }
}

/// Requested extent of one texture in a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureExtent {
    pub width: u32,
    pub height: u32,
}

/// Render sender configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSenderConfig {
    pub graphics: GraphicsBackend,
    pub pixel_format: PixelFormat,
    /// One entry per texture (e.g. stereo left/right).
    pub textures: Vec<TextureExtent>,
    /// Row stride alignment in bytes; must be a power of two.
    pub row_alignment: u32,
    /// Per-subscriber frame queue depth.
    pub queue_depth: usize,
    pub backpressure: BackpressurePolicy,
}

impl Default for RenderSenderConfig {
    fn default() -> Self {
        Self {
            graphics: GraphicsBackend::Cpu,
            pixel_format: PixelFormat::Rgba8,
            textures: vec![TextureExtent {
                width: 1920,
                height: 1080,
            }],
            row_alignment: 64,
            queue_depth: 4,
            backpressure: BackpressurePolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_defaults() {
        let config = LibraryConfig::default();
        assert!(config.enable_console_logging);
        assert!(config.log_directory.is_none());
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_session_defaults() {
        let config = SessionCreateConfig::default();
        assert_eq!(config.max_peers, 16);
        assert_eq!(config.invite_ttl_secs, 3600);
    }

    #[test]
    fn test_render_sender_defaults() {
        let config = RenderSenderConfig::default();
        assert_eq!(config.graphics, GraphicsBackend::Cpu);
        assert_eq!(config.textures.len(), 1);
        assert_eq!(config.row_alignment, 64);
        assert_eq!(config.backpressure, BackpressurePolicy::Drop);
    }
}

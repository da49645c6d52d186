//! Shared-scene entity documents as they travel on the wire.

use serde::{Deserialize, Serialize};

use crate::geometry::{PanelSize, Pose, VolumeSize};
use crate::id::{PanelId, VolumeId};

/// Upper bound for entity display names, in bytes.
pub const MAX_DISPLAY_NAME_BYTES: usize = 256;

/// Upper bound for navigable panel URIs, in bytes.
pub const MAX_URI_BYTES: usize = 2048;

/// Visibility state of a GUI panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PanelState {
    #[default]
    Visible,
    Minimized,
    Closed,
}

/// A posed, sized 2-D content surface shared within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuiPanel {
    pub id: PanelId,
    pub display_name: String,
    pub pose: Pose,
    pub size: PanelSize,
    pub state: PanelState,
    /// Content target the panel currently shows.
    pub uri: String,
}

/// Lifetime policy of an app volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VolumeLifetime {
    /// The volume lives until explicitly closed.
    #[default]
    Persistent,
    /// The volume is torn down with the session that created it.
    SessionBound,
}

/// A posed, sized 3-D content region shared within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppVolume {
    pub id: VolumeId,
    pub display_name: String,
    pub pose: Pose,
    pub size: VolumeSize,
    pub lifetime: VolumeLifetime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_state_defaults_to_visible() {
        assert_eq!(PanelState::default(), PanelState::Visible);
    }

    #[test]
    fn test_panel_wire_round_trip() {
        let panel = GuiPanel {
            id: PanelId::new(),
            display_name: "Tutorial Panel".to_string(),
            pose: Pose::at(0.5, 1.5, -1.2),
            size: PanelSize {
                width_meters: 1.2,
                height_meters: 0.7,
            },
            state: PanelState::Visible,
            uri: "https://example.com/tutorial".to_string(),
        };
        let bytes = bincode::serialize(&panel).expect("serialize");
        let decoded: GuiPanel = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(decoded, panel);
    }
}

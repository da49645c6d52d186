//! Entity synchronization ops.
//!
//! Every mutation of the shared scene is shipped as one [`SyncOp`] stamped
//! with a logical clock. Replicas apply ops field-by-field: a field only
//! moves forward when the incoming stamp is larger than the stamp that last
//! wrote it, so two peers touching disjoint fields of the same entity never
//! lose each other's writes.

use serde::{Deserialize, Serialize};

use crate::entity::{AppVolume, GuiPanel, PanelState, VolumeLifetime};
use crate::geometry::{PanelSize, Pose, VolumeSize};
use crate::id::{PanelId, PeerId, VolumeId};

/// Logical-clock stamp attached to every op.
///
/// Ordering is `(clock, origin)` lexicographic; the origin peer id breaks
/// ties so concurrent writes with equal clocks still resolve identically on
/// every replica.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Stamp {
    pub clock: u64,
    pub origin: PeerId,
}

impl Stamp {
    #[must_use]
    pub const fn new(clock: u64, origin: PeerId) -> Self {
        Self { clock, origin }
    }
}

/// Field tag used to key per-field stamps inside a replica record.
pub type FieldTag = u8;

/// Single-field write to a GUI panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PanelPatch {
    Name(String),
    Pose(Pose),
    Size(PanelSize),
    State(PanelState),
    Uri(String),
}

impl PanelPatch {
    #[must_use]
    pub fn tag(&self) -> FieldTag {
        match self {
            Self::Name(_) => 0,
            Self::Pose(_) => 1,
            Self::Size(_) => 2,
            Self::State(_) => 3,
            Self::Uri(_) => 4,
        }
    }
}

/// Single-field write to an app volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VolumePatch {
    Name(String),
    Pose(Pose),
    Size(VolumeSize),
    Lifetime(VolumeLifetime),
}

impl VolumePatch {
    #[must_use]
    pub fn tag(&self) -> FieldTag {
        match self {
            Self::Name(_) => 0,
            Self::Pose(_) => 1,
            Self::Size(_) => 2,
            Self::Lifetime(_) => 3,
        }
    }
}

/// One replicated mutation of the shared scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncOp {
    PanelAdd {
        stamp: Stamp,
        panel: GuiPanel,
    },
    PanelSet {
        stamp: Stamp,
        id: PanelId,
        patch: PanelPatch,
    },
    PanelRemove {
        stamp: Stamp,
        id: PanelId,
    },
    VolumeAdd {
        stamp: Stamp,
        volume: AppVolume,
    },
    VolumeSet {
        stamp: Stamp,
        id: VolumeId,
        patch: VolumePatch,
    },
    VolumeRemove {
        stamp: Stamp,
        id: VolumeId,
    },
}

impl SyncOp {
    /// Stamp carried by this op.
    #[must_use]
    pub fn stamp(&self) -> Stamp {
        match self {
            Self::PanelAdd { stamp, .. }
            | Self::PanelSet { stamp, .. }
            | Self::PanelRemove { stamp, .. }
            | Self::VolumeAdd { stamp, .. }
            | Self::VolumeSet { stamp, .. }
            | Self::VolumeRemove { stamp, .. } => *stamp,
        }
    }
}

//! Entity synchronization: per-session replicated tables with per-field
//! last-writer-wins resolution ordered by a Lamport clock.

pub mod clock;
pub mod table;

pub use clock::LamportClock;
pub use table::{EntityTable, Handle, Replicated, TableSnapshot};

use qar_proto::{AppVolume, GuiPanel, SyncOp};

/// Apply one replicated op to a pair of per-kind tables.
///
/// Shared by the host's authoritative tables and every peer replica so the
/// two cannot drift in how ops are interpreted.
pub fn apply_op(panels: &EntityTable<GuiPanel>, volumes: &EntityTable<AppVolume>, op: &SyncOp) {
    match op {
        SyncOp::PanelAdd { stamp, panel } => {
            panels.apply_add(panel.clone(), *stamp);
        }
        SyncOp::PanelSet { stamp, id, patch } => {
            panels.apply_set(*id, patch, *stamp);
        }
        SyncOp::PanelRemove { id, .. } => {
            panels.apply_remove(*id);
        }
        SyncOp::VolumeAdd { stamp, volume } => {
            volumes.apply_add(volume.clone(), *stamp);
        }
        SyncOp::VolumeSet { stamp, id, patch } => {
            volumes.apply_set(*id, patch, *stamp);
        }
        SyncOp::VolumeRemove { id, .. } => {
            volumes.apply_remove(*id);
        }
    }
}

//! Entity table accessors exposed on a joined session.

use qar_proto::sync::{PanelPatch, VolumePatch};
use qar_proto::{
    AppVolume, GuiPanel, PanelId, PanelSize, PanelState, Pose, SyncOp, VolumeId, VolumeLifetime,
    VolumeSize, MAX_DISPLAY_NAME_BYTES, MAX_URI_BYTES,
};

use crate::error::{Error, Result};
use crate::session::session::SessionInner;
use crate::sync::Handle;

/// Creation parameters for a GUI panel.
#[derive(Debug, Clone, Default)]
pub struct PanelInit {
    pub display_name: String,
    pub pose: Pose,
    pub size: PanelSize,
    pub uri: String,
}

impl PanelInit {
    fn validate(&self) -> Result<()> {
        check_name(&self.display_name)?;
        check_uri(&self.uri)
    }
}

/// Creation parameters for an app volume.
#[derive(Debug, Clone, Default)]
pub struct VolumeInit {
    pub display_name: String,
    pub pose: Pose,
    pub size: VolumeSize,
    pub lifetime: VolumeLifetime,
}

fn check_name(name: &str) -> Result<()> {
    if name.len() > MAX_DISPLAY_NAME_BYTES {
        return Err(Error::InvalidArgument(format!(
            "display name exceeds {MAX_DISPLAY_NAME_BYTES} bytes"
        )));
    }
    Ok(())
}

fn check_uri(uri: &str) -> Result<()> {
    if uri.len() > MAX_URI_BYTES {
        return Err(Error::InvalidArgument(format!(
            "uri exceeds {MAX_URI_BYTES} bytes"
        )));
    }
    Ok(())
}

fn check_capacity(capacity: usize) -> Result<()> {
    if capacity == 0 {
        return Err(Error::InvalidArgument(
            "list capacity must be nonzero".to_string(),
        ));
    }
    Ok(())
}

/// GUI panel table of one session.
pub struct GuiPanels<'a> {
    inner: &'a SessionInner,
}

impl<'a> GuiPanels<'a> {
    pub(crate) fn new(inner: &'a SessionInner) -> Self {
        Self { inner }
    }

    /// Add a panel to the shared scene. The returned id is stable for the
    /// panel's lifetime and becomes visible to all peers once propagation
    /// completes.
    pub fn add(&self, init: PanelInit) -> Result<PanelId> {
        self.inner.ensure_open()?;
        init.validate()?;

        let stamp = self.inner.stamp();
        let panel = GuiPanel {
            id: PanelId::new(),
            display_name: init.display_name,
            pose: init.pose,
            size: init.size,
            state: PanelState::Visible,
            uri: init.uri,
        };
        let id = panel.id;
        self.inner.panels.apply_add(panel.clone(), stamp);
        self.inner.commit(SyncOp::PanelAdd { stamp, panel });
        Ok(id)
    }

    pub fn update_pose(&self, id: PanelId, pose: Pose) -> Result<()> {
        self.set(id, PanelPatch::Pose(pose))
    }

    pub fn change_size(&self, id: PanelId, size: PanelSize) -> Result<()> {
        self.set(id, PanelPatch::Size(size))
    }

    /// Change the panel's visibility state. `Closed` removes the panel
    /// from the table, the same as [`GuiPanels::close`].
    pub fn set_state(&self, id: PanelId, state: PanelState) -> Result<()> {
        if state == PanelState::Closed {
            return self.close(id);
        }
        self.set(id, PanelPatch::State(state))
    }

    pub fn navigate_to_uri(&self, id: PanelId, uri: &str) -> Result<()> {
        check_uri(uri)?;
        self.set(id, PanelPatch::Uri(uri.to_string()))
    }

    /// Remove the panel. Subsequent enumeration never returns it; handles
    /// already snapshotted stay valid until dropped.
    pub fn close(&self, id: PanelId) -> Result<()> {
        self.inner.ensure_open()?;
        if !self.inner.panels.apply_remove(id) {
            return Err(Error::NotFound(format!("gui panel {id}")));
        }
        let stamp = self.inner.stamp();
        self.inner.commit(SyncOp::PanelRemove { stamp, id });
        Ok(())
    }

    pub fn count(&self) -> Result<usize> {
        self.inner.ensure_open()?;
        Ok(self.inner.panels.count())
    }

    /// Point-in-time snapshot of up to `capacity` panels.
    pub fn list(&self, capacity: usize) -> Result<Vec<Handle<GuiPanel>>> {
        self.inner.ensure_open()?;
        check_capacity(capacity)?;
        Ok(self.inner.panels.list(capacity))
    }

    /// Snapshot one panel by id.
    pub fn get(&self, id: PanelId) -> Result<Handle<GuiPanel>> {
        self.inner.ensure_open()?;
        self.inner
            .panels
            .snapshot(id)
            .ok_or_else(|| Error::NotFound(format!("gui panel {id}")))
    }

    fn set(&self, id: PanelId, patch: PanelPatch) -> Result<()> {
        self.inner.ensure_open()?;
        if !self.inner.panels.contains(id) {
            return Err(Error::NotFound(format!("gui panel {id}")));
        }
        let stamp = self.inner.stamp();
        self.inner.panels.apply_set(id, &patch, stamp);
        self.inner.commit(SyncOp::PanelSet { stamp, id, patch });
        Ok(())
    }
}

/// App volume table of one session.
pub struct AppVolumes<'a> {
    inner: &'a SessionInner,
}

impl<'a> AppVolumes<'a> {
    pub(crate) fn new(inner: &'a SessionInner) -> Self {
        Self { inner }
    }

    /// Add an app volume to the shared scene.
    pub fn add(&self, init: VolumeInit) -> Result<VolumeId> {
        self.inner.ensure_open()?;
        check_name(&init.display_name)?;

        let stamp = self.inner.stamp();
        let volume = AppVolume {
            id: VolumeId::new(),
            display_name: init.display_name,
            pose: init.pose,
            size: init.size,
            lifetime: init.lifetime,
        };
        let id = volume.id;
        self.inner.volumes.apply_add(volume.clone(), stamp);
        self.inner.commit(SyncOp::VolumeAdd { stamp, volume });
        Ok(id)
    }

    pub fn update_pose(&self, id: VolumeId, pose: Pose) -> Result<()> {
        self.set(id, VolumePatch::Pose(pose))
    }

    pub fn change_size(&self, id: VolumeId, size: VolumeSize) -> Result<()> {
        self.set(id, VolumePatch::Size(size))
    }

    pub fn close(&self, id: VolumeId) -> Result<()> {
        self.inner.ensure_open()?;
        if !self.inner.volumes.apply_remove(id) {
            return Err(Error::NotFound(format!("app volume {id}")));
        }
        let stamp = self.inner.stamp();
        self.inner.commit(SyncOp::VolumeRemove { stamp, id });
        Ok(())
    }

    pub fn count(&self) -> Result<usize> {
        self.inner.ensure_open()?;
        Ok(self.inner.volumes.count())
    }

    /// Point-in-time snapshot of up to `capacity` volumes.
    pub fn list(&self, capacity: usize) -> Result<Vec<Handle<AppVolume>>> {
        self.inner.ensure_open()?;
        check_capacity(capacity)?;
        Ok(self.inner.volumes.list(capacity))
    }

    /// Snapshot one volume by id.
    pub fn get(&self, id: VolumeId) -> Result<Handle<AppVolume>> {
        self.inner.ensure_open()?;
        self.inner
            .volumes
            .snapshot(id)
            .ok_or_else(|| Error::NotFound(format!("app volume {id}")))
    }

    fn set(&self, id: VolumeId, patch: VolumePatch) -> Result<()> {
        self.inner.ensure_open()?;
        if !self.inner.volumes.contains(id) {
            return Err(Error::NotFound(format!("app volume {id}")));
        }
        let stamp = self.inner.stamp();
        self.inner.volumes.apply_set(id, &patch, stamp);
        self.inner.commit(SyncOp::VolumeSet { stamp, id, patch });
        Ok(())
    }
}

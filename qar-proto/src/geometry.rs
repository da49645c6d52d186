use serde::{Deserialize, Serialize};

/// 3-D position in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Unit quaternion orientation. Defaults to identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

/// Position plus orientation of an entity in the shared scene.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quaternion,
}

impl Pose {
    #[must_use]
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Vec3::new(x, y, z),
            orientation: Quaternion::default(),
        }
    }
}

/// GUI panel extent in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanelSize {
    pub width_meters: f32,
    pub height_meters: f32,
}

impl Default for PanelSize {
    fn default() -> Self {
        Self {
            width_meters: 1.0,
            height_meters: 0.6,
        }
    }
}

/// App volume extent in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeSize {
    pub width_meters: f32,
    pub length_meters: f32,
    pub height_meters: f32,
}

impl Default for VolumeSize {
    fn default() -> Self {
        Self {
            width_meters: 1.0,
            length_meters: 1.0,
            height_meters: 1.0,
        }
    }
}

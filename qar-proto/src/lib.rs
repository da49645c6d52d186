//! Wire-level value types for the QAR streaming SDK.
//!
//! Everything that crosses a session boundary lives here: fixed-length
//! identifiers, poses and sizes, the invite blob codec, entity
//! synchronization ops, and video frame packets. `qar-core` builds the
//! runtime, handshake, and replication machinery on top of these types.

pub mod entity;
pub mod frame;
pub mod geometry;
pub mod id;
pub mod invite;
pub mod sync;

pub use entity::{
    AppVolume, GuiPanel, PanelState, VolumeLifetime, MAX_DISPLAY_NAME_BYTES, MAX_URI_BYTES,
};
pub use frame::{
    FrameHeader, FrameLayout, PixelFormat, TextureLayout, VideoFrame, MAX_TEXTURE_EXTENT,
};
pub use geometry::{PanelSize, Pose, Quaternion, Vec3, VolumeSize};
pub use id::{PanelId, PeerId, SessionId, VolumeId, ID_LENGTH};
pub use invite::{InviteError, InvitePayload, SessionInvite, PROTOCOL_VERSION};
pub use sync::{FieldTag, PanelPatch, Stamp, SyncOp, VolumePatch};

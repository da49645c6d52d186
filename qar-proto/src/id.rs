use rand::Rng;
use serde::{Deserialize, Serialize};

/// Byte length of every identifier exchanged across the SDK boundary.
pub const ID_LENGTH: usize = 16;

/// Generate a fresh random identifier payload.
fn generate_id() -> [u8; ID_LENGTH] {
    rand::rng().random()
}

macro_rules! fixed_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub [u8; ID_LENGTH]);

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self(generate_id())
            }

            #[must_use]
            pub const fn from_bytes(bytes: [u8; ID_LENGTH]) -> Self {
                Self(bytes)
            }

            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; ID_LENGTH] {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }

        impl From<[u8; ID_LENGTH]> for $name {
            fn from(bytes: [u8; ID_LENGTH]) -> Self {
                Self(bytes)
            }
        }
    };
}

fixed_id! {
    /// Identifies one session for its entire lifetime.
    SessionId
}

fixed_id! {
    /// Identifies one joined peer within a session.
    PeerId
}

fixed_id! {
    /// Identifies one GUI panel in a session's shared scene.
    PanelId
}

fixed_id! {
    /// Identifies one app volume in a session's shared scene.
    VolumeId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_distinct() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_is_hex_of_fixed_length() {
        let id = PeerId::new();
        assert_eq!(id.to_string().len(), ID_LENGTH * 2);
    }

    #[test]
    fn test_round_trip_bytes() {
        let id = PanelId::new();
        let copy = PanelId::from_bytes(*id.as_bytes());
        assert_eq!(id, copy);
    }
}

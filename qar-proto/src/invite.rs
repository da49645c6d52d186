//! Session invite blob codec.
//!
//! An invite is a self-describing capability: it carries everything a remote
//! peer needs to reach the hosting runtime and authenticate against it. The
//! blob is pure data — decoding never mutates it, so the same bytes may be
//! handed to any number of concurrent join calls.
//!
//! Layout: `magic || version (u16 BE) || bincode payload || HMAC-SHA256 tag`.
//! The tag is keyed by the session secret carried in the payload, so a
//! truncated or bit-flipped blob fails verification before any connection
//! attempt is made.

use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::id::SessionId;

/// Protocol version advertised in every invite blob.
pub const PROTOCOL_VERSION: u16 = 1;

/// Leading magic bytes of an invite blob.
const MAGIC: &[u8; 4] = b"QARI";

/// Byte length of the session secret carried in the payload.
pub const SECRET_LENGTH: usize = 32;

/// Byte length of the trailing HMAC-SHA256 tag.
const TAG_LENGTH: usize = 32;

type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InviteError {
    #[error("invite blob is malformed: {0}")]
    Malformed(&'static str),

    #[error("invite protocol version {advertised} is not compatible with {PROTOCOL_VERSION}")]
    VersionMismatch { advertised: u16 },

    #[error("invite expired at unix time {expired_at}")]
    Expired { expired_at: i64 },
}

/// Decoded contents of an invite blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvitePayload {
    pub session_id: SessionId,
    /// Reachability hint for the hosting runtime.
    pub endpoint: String,
    /// Shared secret presented during handshake admission.
    pub secret: [u8; SECRET_LENGTH],
    pub issued_at: i64,
    pub expires_at: i64,
}

impl InvitePayload {
    /// Build a fresh payload with a random secret, valid for `ttl_secs`.
    #[must_use]
    pub fn new(session_id: SessionId, endpoint: String, ttl_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            session_id,
            endpoint,
            secret: rand::rng().random(),
            issued_at: now,
            expires_at: now + ttl_secs,
        }
    }
}

/// An encoded invite plus the session it targets.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInvite {
    session_id: SessionId,
    data: Vec<u8>,
}

impl SessionInvite {
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Opaque blob to hand to joining peers.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Encode a payload into a signed invite blob.
///
/// # Panics
///
/// Never panics: the payload is a closed set of serde-friendly fields, so
/// bincode serialization cannot fail, and the HMAC key length is fixed.
#[must_use]
pub fn encode(payload: &InvitePayload) -> SessionInvite {
    let body = bincode::serialize(payload).expect("invite payload is always serializable");

    let mut data = Vec::with_capacity(MAGIC.len() + 2 + body.len() + TAG_LENGTH);
    data.extend_from_slice(MAGIC);
    data.extend_from_slice(&PROTOCOL_VERSION.to_be_bytes());
    data.extend_from_slice(&body);

    let mut mac = HmacSha256::new_from_slice(&payload.secret)
        .expect("HMAC accepts any fixed-length key");
    mac.update(&data);
    data.extend_from_slice(&mac.finalize().into_bytes());

    SessionInvite {
        session_id: payload.session_id,
        data,
    }
}

/// Decode and validate an invite blob against the current wall clock.
pub fn decode(bytes: &[u8]) -> Result<InvitePayload, InviteError> {
    decode_at(bytes, Utc::now().timestamp())
}

/// Decode and validate an invite blob against an explicit unix timestamp.
pub fn decode_at(bytes: &[u8], now: i64) -> Result<InvitePayload, InviteError> {
    let min_len = MAGIC.len() + 2 + TAG_LENGTH;
    if bytes.len() <= min_len {
        return Err(InviteError::Malformed("blob is truncated"));
    }
    if &bytes[..MAGIC.len()] != MAGIC {
        return Err(InviteError::Malformed("bad magic"));
    }

    let version = u16::from_be_bytes([bytes[MAGIC.len()], bytes[MAGIC.len() + 1]]);
    if version != PROTOCOL_VERSION {
        return Err(InviteError::VersionMismatch {
            advertised: version,
        });
    }

    let (signed, tag) = bytes.split_at(bytes.len() - TAG_LENGTH);
    let body = &signed[MAGIC.len() + 2..];
    let payload: InvitePayload = bincode::deserialize(body)
        .map_err(|_| InviteError::Malformed("payload does not decode"))?;

    let mut mac = HmacSha256::new_from_slice(&payload.secret)
        .expect("HMAC accepts any fixed-length key");
    mac.update(signed);
    mac.verify_slice(tag)
        .map_err(|_| InviteError::Malformed("integrity tag mismatch"))?;

    if now >= payload.expires_at {
        return Err(InviteError::Expired {
            expired_at: payload.expires_at,
        });
    }

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload() -> InvitePayload {
        InvitePayload::new(SessionId::new(), "qar-local".to_string(), 600)
    }

    #[test]
    fn test_round_trip() {
        let payload = sample_payload();
        let invite = encode(&payload);
        assert!(invite.len() > 0);
        assert_eq!(invite.session_id(), payload.session_id);

        let decoded = decode(invite.data()).expect("valid invite");
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_decode_is_repeatable() {
        // Joining is a pure function of the blob; decoding twice must work.
        let invite = encode(&sample_payload());
        let first = decode(invite.data()).expect("first decode");
        let second = decode(invite.data()).expect("second decode");
        assert_eq!(first, second);
    }

    #[test]
    fn test_truncated_blob_is_malformed() {
        let invite = encode(&sample_payload());
        let cut = &invite.data()[..invite.len() - 7];
        assert!(matches!(decode(cut), Err(InviteError::Malformed(_))));
    }

    #[test]
    fn test_bad_magic_is_malformed() {
        let invite = encode(&sample_payload());
        let mut data = invite.data().to_vec();
        data[0] ^= 0xFF;
        assert!(matches!(decode(&data), Err(InviteError::Malformed(_))));
    }

    #[test]
    fn test_corrupted_payload_fails_integrity_check() {
        let invite = encode(&sample_payload());
        let mut data = invite.data().to_vec();
        let mid = data.len() / 2;
        data[mid] ^= 0x01;
        assert!(matches!(decode(&data), Err(InviteError::Malformed(_))));
    }

    #[test]
    fn test_version_mismatch() {
        let invite = encode(&sample_payload());
        let mut data = invite.data().to_vec();
        data[4] = 0xFF;
        assert_eq!(
            decode(&data),
            Err(InviteError::VersionMismatch {
                advertised: u16::from_be_bytes([0xFF, data[5]])
            })
        );
    }

    #[test]
    fn test_expired_invite() {
        let payload = sample_payload();
        let invite = encode(&payload);
        let later = payload.expires_at + 1;
        assert_eq!(
            decode_at(invite.data(), later),
            Err(InviteError::Expired {
                expired_at: payload.expires_at
            })
        );
    }
}

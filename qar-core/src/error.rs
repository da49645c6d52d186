use thiserror::Error;

use qar_proto::InviteError;

/// Stable numeric code carried by every result crossing the host boundary.
///
/// Host applications that cannot pattern-match Rust enums (FFI shims,
/// logging sinks) key off these values; the human-readable message comes
/// from the error's `Display` impl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ResultCode {
    Ok = 0,
    InvalidArgument = 1,
    NotFound = 2,
    InvalidState = 3,
    FrameAlreadyInFlight = 4,
    ConnectFailed = 10,
    InvalidInvite = 20,
    VersionMismatch = 21,
    InviteExpired = 22,
    Denied = 23,
    TooManyPeers = 24,
    ResourceExhausted = 30,
    Overrun = 31,
    Cancelled = 40,
    Internal = 50,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("a frame is already in flight on this sender")]
    FrameAlreadyInFlight,

    /// Transport-level failure. Retryable: the blob or session may become
    /// reachable again without caller-side changes.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// Invite blob rejected during decode. Terminal for that blob.
    #[error(transparent)]
    Invite(#[from] InviteError),

    #[error("admission denied: {0}")]
    Denied(String),

    #[error("session is full ({capacity} peers)")]
    TooManyPeers { capacity: usize },

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The transport could not keep up and the frame was dropped.
    #[error("frame transport overrun")]
    Overrun,

    #[error("operation cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Numeric code for the host boundary.
    #[must_use]
    pub fn code(&self) -> ResultCode {
        match self {
            Self::InvalidArgument(_) => ResultCode::InvalidArgument,
            Self::NotFound(_) => ResultCode::NotFound,
            Self::InvalidState(_) => ResultCode::InvalidState,
            Self::FrameAlreadyInFlight => ResultCode::FrameAlreadyInFlight,
            Self::ConnectFailed(_) => ResultCode::ConnectFailed,
            Self::Invite(InviteError::Malformed(_)) => ResultCode::InvalidInvite,
            Self::Invite(InviteError::VersionMismatch { .. }) => ResultCode::VersionMismatch,
            Self::Invite(InviteError::Expired { .. }) => ResultCode::InviteExpired,
            Self::Denied(_) => ResultCode::Denied,
            Self::TooManyPeers { .. } => ResultCode::TooManyPeers,
            Self::ResourceExhausted(_) => ResultCode::ResourceExhausted,
            Self::Overrun => ResultCode::Overrun,
            Self::Cancelled => ResultCode::Cancelled,
            Self::Internal(_) => ResultCode::Internal,
        }
    }

    /// Whether retrying the same call can reasonably succeed later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectFailed(_) | Self::Overrun)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(Error::FrameAlreadyInFlight.code(), ResultCode::FrameAlreadyInFlight);
        assert_eq!(
            Error::Invite(InviteError::Malformed("x")).code(),
            ResultCode::InvalidInvite
        );
        assert_eq!(
            Error::Invite(InviteError::VersionMismatch { advertised: 9 }).code(),
            ResultCode::VersionMismatch
        );
        assert_eq!(
            Error::Invite(InviteError::Expired { expired_at: 0 }).code(),
            ResultCode::InviteExpired
        );
        assert_eq!(Error::Cancelled.code(), ResultCode::Cancelled);
    }

    #[test]
    fn test_retryable_classification() {
        assert!(Error::ConnectFailed("unreachable".into()).is_retryable());
        assert!(Error::Overrun.is_retryable());
        assert!(!Error::Denied("bad secret".into()).is_retryable());
        assert!(!Error::Invite(InviteError::Malformed("x")).is_retryable());
    }
}

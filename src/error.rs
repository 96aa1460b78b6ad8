use std::fmt;

use crate::frame;

/// Result alias used across the whole crate.
pub type RSocketResult<T> = Result<T, RSocketError>;

/// Error codes carried on the wire by `ERROR` frames (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidSetup,
    UnsupportedSetup,
    RejectedSetup,
    RejectedResume,
    ConnectionError,
    ConnectionClose,
    ApplicationError,
    Rejected,
    Canceled,
    Invalid,
    Unknown(u32),
}

impl ErrorCode {
    pub fn as_u32(self) -> u32 {
        match self {
            ErrorCode::InvalidSetup => frame::ERR_INVALID_SETUP,
            ErrorCode::UnsupportedSetup => frame::ERR_UNSUPPORTED_SETUP,
            ErrorCode::RejectedSetup => frame::ERR_REJECT_SETUP,
            ErrorCode::RejectedResume => frame::ERR_REJECT_RESUME,
            ErrorCode::ConnectionError => frame::ERR_CONN_FAILED,
            ErrorCode::ConnectionClose => frame::ERR_CONN_CLOSED,
            ErrorCode::ApplicationError => frame::ERR_APPLICATION,
            ErrorCode::Rejected => frame::ERR_REJECTED,
            ErrorCode::Canceled => frame::ERR_CANCELED,
            ErrorCode::Invalid => frame::ERR_INVALID,
            ErrorCode::Unknown(code) => code,
        }
    }

    pub fn from_u32(code: u32) -> ErrorCode {
        match code {
            frame::ERR_INVALID_SETUP => ErrorCode::InvalidSetup,
            frame::ERR_UNSUPPORTED_SETUP => ErrorCode::UnsupportedSetup,
            frame::ERR_REJECT_SETUP => ErrorCode::RejectedSetup,
            frame::ERR_REJECT_RESUME => ErrorCode::RejectedResume,
            frame::ERR_CONN_FAILED => ErrorCode::ConnectionError,
            frame::ERR_CONN_CLOSED => ErrorCode::ConnectionClose,
            frame::ERR_APPLICATION => ErrorCode::ApplicationError,
            frame::ERR_REJECTED => ErrorCode::Rejected,
            frame::ERR_CANCELED => ErrorCode::Canceled,
            frame::ERR_INVALID => ErrorCode::Invalid,
            other => ErrorCode::Unknown(other),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.as_u32())
    }
}

/// The crate-wide error type. Codec failures, protocol violations and
/// application-level errors are all represented here; which of these are
/// fatal to the connection vs. scoped to a single stream is a decision made
/// by the caller (see spec §7), not encoded in the type itself.
#[derive(Debug)]
pub enum RSocketError {
    /// Buffer shorter than a frame header (6 bytes).
    InsufficientBytes,
    /// Header bits didn't parse into a recognized shape.
    InvalidHeader(String),
    /// A frame body was addressed to a stream id illegal for its type
    /// (e.g. SETUP on a non-zero stream).
    InvalidStreamID(u32),
    /// Frame type code not recognized and IGNORE was not set.
    UnsupportedFrameType(u16),
    /// Declared metadata length didn't fit the remaining buffer.
    InvalidMetadataLength,
    /// An `ERROR` frame arrived or was raised with an application-supplied
    /// code and message.
    WireError(ErrorCode, String),
    /// Transport-level I/O failure.
    Transport(String),
    /// Anything else, carried as a plain message (mirrors the teacher's
    /// `RSocketError::from(&str)` escape hatch).
    Other(String),
}

impl fmt::Display for RSocketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RSocketError::InsufficientBytes => write!(f, "insufficient bytes for frame header"),
            RSocketError::InvalidHeader(msg) => write!(f, "invalid frame header: {}", msg),
            RSocketError::InvalidStreamID(id) => {
                write!(f, "invalid stream id {} for frame type", id)
            }
            RSocketError::UnsupportedFrameType(kind) => {
                write!(f, "unsupported frame type {}", kind)
            }
            RSocketError::InvalidMetadataLength => write!(f, "invalid metadata length"),
            RSocketError::WireError(code, msg) => write!(f, "{}: {}", code, msg),
            RSocketError::Transport(msg) => write!(f, "transport error: {}", msg),
            RSocketError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for RSocketError {}

impl From<&str> for RSocketError {
    fn from(msg: &str) -> RSocketError {
        RSocketError::Other(msg.to_owned())
    }
}

impl From<String> for RSocketError {
    fn from(msg: String) -> RSocketError {
        RSocketError::Other(msg)
    }
}

impl From<std::io::Error> for RSocketError {
    fn from(err: std::io::Error) -> RSocketError {
        RSocketError::Transport(err.to_string())
    }
}

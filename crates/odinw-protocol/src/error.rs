//! Protocol error types.

use thiserror::Error;

/// Errors that can occur when encoding or decoding wire frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame body is too short to carry a message-type tag.
    #[error("frame body too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Expected minimum length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// Payload does not fit in the 16-bit EDM length field.
    #[error("payload too long: maximum {max} bytes, got {actual}")]
    PayloadTooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual payload length.
        actual: usize,
    },

    /// Message-type tag not in the known set.
    #[error("unknown message type tag: 0x{0:04X}")]
    UnknownMessageType(u16),

    /// Event payload does not match its documented layout.
    #[error("malformed {event} payload: expected {expected} bytes, got {actual}")]
    MalformedEvent {
        /// Event name.
        event: &'static str,
        /// Expected minimum length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },
}

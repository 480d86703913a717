//! Client error and receive-outcome types.

use thiserror::Error;

use odinw_protocol::{DataMode, Message, ProtocolError};

/// Errors that can occur when driving the module.
///
/// Timeouts and unmatched frames are NOT errors; they are ordinary outcomes
/// reported through [`Received`]. An error here means the caller invoked an
/// operation the active mode does not support, or the transport itself
/// failed.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The operation is not available in the active data mode. Raised before
    /// the transport is touched.
    #[error("unsupported operation ({operation}) in {mode}")]
    InvalidMode {
        /// The operation that was attempted.
        operation: &'static str,
        /// The mode that was active.
        mode: DataMode,
    },

    /// The transport failed outright (not a timeout).
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    /// Outbound encoding failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Outcome of one receive call.
///
/// One call consumes exactly one EDM frame, or one matched run of
/// command-mode lines. Unsolicited events surface as [`Received::NoMatch`];
/// callers skip them by calling again.
#[derive(Debug, Clone, PartialEq)]
pub enum Received {
    /// The transport yielded fewer bytes than a structural element requires
    /// before a complete frame/line could be obtained.
    Timeout,

    /// A frame was read but its body does not decode (unknown type tag or
    /// truncated tag). The frame is lost; the next call's marker scan is the
    /// recovery path.
    Desync(ProtocolError),

    /// A frame decoded cleanly but satisfied none of the expectations.
    NoMatch,

    /// One or more expectations were satisfied, each paired with the full
    /// decoded content.
    Matched(Vec<Message>),
}

impl Received {
    /// Whether at least one expectation was satisfied.
    pub fn is_matched(&self) -> bool {
        matches!(self, Received::Matched(_))
    }

    /// The matched messages, empty for every other outcome.
    pub fn into_matched(self) -> Vec<Message> {
        match self {
            Received::Matched(messages) => messages,
            _ => Vec::new(),
        }
    }
}

//! Protocol constants
//!
//! These constants define the frame delimiters, message-type tags, and AT
//! framing literals used on the ODIN-W2 serial interface.

// ============================================================================
// EDM framing
// ============================================================================

/// Start-of-frame delimiter for EDM binary frames.
pub const EDM_SFD: u8 = 0xAA;
/// End-of-frame delimiter for EDM binary frames.
pub const EDM_EFD: u8 = 0x55;
/// Size of the message-type tag inside an EDM frame.
pub const EDM_TAG_SIZE: usize = 2;
/// Largest payload an EDM frame can carry (the 16-bit length field counts
/// the 2-byte tag as well).
pub const EDM_MAX_PAYLOAD: usize = u16::MAX as usize - EDM_TAG_SIZE;

// ============================================================================
// Message-type tags (2 bytes on the wire, big-endian)
// ============================================================================

/// Peer connect event.
pub const TAG_CONNECT_EVENT: u16 = 0x0011;
/// Peer disconnect event.
pub const TAG_DISCONNECT_EVENT: u16 = 0x0021;
/// Inbound data on a channel.
pub const TAG_DATA_EVENT: u16 = 0x0031;
/// Outbound data on a channel.
pub const TAG_DATA_COMMAND: u16 = 0x0036;
/// Unsolicited AT event (URC).
pub const TAG_AT_EVENT: u16 = 0x0041;
/// AT command request.
pub const TAG_AT_REQUEST: u16 = 0x0044;
/// AT command confirmation (response).
pub const TAG_AT_CONFIRM: u16 = 0x0045;
/// Resend request from the module.
pub const TAG_RESEND_COMMAND: u16 = 0x0056;
/// iPhone/iAP session event.
pub const TAG_IPHONE_EVENT: u16 = 0x0061;
/// Emitted by the module once EDM is up.
pub const TAG_START_EVENT: u16 = 0x0071;

// ============================================================================
// Command-mode (AT) framing
// ============================================================================

/// Start-of-frame marker scanned for in command mode.
pub const CM_SFD: [u8; 2] = *b"\r\n";
/// Prefix of every outbound AT command line.
pub const AT_PREFIX: &str = "AT";
/// Terminator of an outbound AT command line.
pub const AT_TERMINATOR: u8 = b'\r';
/// Terminal response line for an accepted command.
pub const AT_OK: &[u8] = b"OK";
/// Terminal response line for a rejected command.
pub const AT_ERROR: &[u8] = b"ERROR";

//! Frame encoding/decoding utilities.
//!
//! EDM frames wrap every multiplexed message in a delimited binary envelope:
//!
//! ```text
//! +------+--------+--------+-------+-------+----------------+------+
//! | SFD  | len_hi | len_lo | tag_h | tag_l | payload        | EFD  |
//! | 0xAA | length (BE)     | type tag (BE) | len - 2 bytes  | 0x55 |
//! +------+--------+--------+-------+-------+----------------+------+
//! ```
//!
//! The 16-bit length counts the type tag plus the payload, so
//! `length = 2 + payload.len()`.
//!
//! Command-mode AT requests have no envelope at all: the ASCII bytes
//! `AT<command>\r` go on the wire as-is, and responses are CRLF-delimited
//! text lines.

use bytes::BufMut;
use log::warn;

use crate::constants::*;
use crate::error::ProtocolError;
use crate::types::MessageType;

/// Encode an EDM frame carrying `payload` under the given type tag.
pub fn encode_frame(msg_type: MessageType, payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    if payload.len() > EDM_MAX_PAYLOAD {
        return Err(ProtocolError::PayloadTooLong {
            max: EDM_MAX_PAYLOAD,
            actual: payload.len(),
        });
    }
    let length = (EDM_TAG_SIZE + payload.len()) as u16;
    let mut buf = Vec::with_capacity(payload.len() + 6);
    buf.push(EDM_SFD);
    buf.put_u16(length);
    buf.put_u16(msg_type.tag());
    buf.extend_from_slice(payload);
    buf.push(EDM_EFD);
    Ok(buf)
}

/// Encode an EDM data frame for a channel.
///
/// The payload is `channel_id(1) || data`, tagged [`MessageType::DataCommand`].
pub fn encode_data_frame(channel_id: u8, data: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let mut payload = Vec::with_capacity(data.len() + 1);
    payload.push(channel_id);
    payload.extend_from_slice(data);
    encode_frame(MessageType::DataCommand, &payload)
}

/// Build the raw AT command line `AT<command>\r`.
pub fn at_line(command: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(AT_PREFIX.len() + command.len() + 1);
    buf.extend_from_slice(AT_PREFIX.as_bytes());
    buf.extend_from_slice(command.as_bytes());
    buf.push(AT_TERMINATOR);
    buf
}

/// Encode an AT request wrapped in the EDM envelope.
///
/// The frame payload is the full command line produced by [`at_line`],
/// tagged [`MessageType::AtRequest`].
pub fn encode_at_request(command: &str) -> Result<Vec<u8>, ProtocolError> {
    encode_frame(MessageType::AtRequest, &at_line(command))
}

/// Decode an EDM frame body (type tag + payload, delimiters and length
/// already stripped).
///
/// Returns the message type and the payload, with an empty payload mapped
/// to `None`. An unknown tag or a body too short to carry one is a
/// [`ProtocolError`].
pub fn decode_body(body: &[u8]) -> Result<(MessageType, Option<Vec<u8>>), ProtocolError> {
    if body.len() < EDM_TAG_SIZE {
        return Err(ProtocolError::FrameTooShort {
            expected: EDM_TAG_SIZE,
            actual: body.len(),
        });
    }
    let tag = u16::from_be_bytes([body[0], body[1]]);
    let msg_type = MessageType::try_from(tag).map_err(|err| {
        warn!("discarding frame with unknown type tag 0x{tag:04X}");
        err
    })?;
    let content = &body[EDM_TAG_SIZE..];
    if content.is_empty() {
        Ok((msg_type, None))
    } else {
        Ok((msg_type, Some(content.to_vec())))
    }
}

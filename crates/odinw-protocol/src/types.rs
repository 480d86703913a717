//! Core protocol types.

use std::net::Ipv4Addr;

use crate::constants::*;
use crate::error::ProtocolError;

/// Operating mode of the module's serial interface.
///
/// Exactly one mode is active at a time and it governs which framing
/// discipline (and therefore which operations) are legal. The module starts
/// in [`DataMode::CommandMode`]; transitions happen via the `ATO<n>` command
/// where `n` is the value returned by [`DataMode::transition_arg`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMode {
    /// Textual AT command mode (initial state).
    CommandMode,
    /// Transparent data mode: the stream carries raw payload bytes only.
    DataMode,
    /// Extended data mode: binary EDM framing multiplexing commands,
    /// events, and data.
    ExtendedDataMode,
    /// PPP mode. No command or data path exists from the host side.
    PPPMode,
}

impl DataMode {
    /// Numeric argument of the `ATO<n>` mode-transition command.
    pub fn transition_arg(&self) -> u8 {
        match self {
            DataMode::CommandMode => 0,
            DataMode::DataMode => 1,
            DataMode::ExtendedDataMode => 2,
            DataMode::PPPMode => 3,
        }
    }

    /// Whether AT commands can be issued in this mode.
    pub fn supports_commands(&self) -> bool {
        matches!(self, DataMode::CommandMode | DataMode::ExtendedDataMode)
    }

    /// Whether payload data can be sent/received in this mode.
    pub fn supports_data(&self) -> bool {
        matches!(self, DataMode::DataMode | DataMode::ExtendedDataMode)
    }
}

impl std::fmt::Display for DataMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataMode::CommandMode => write!(f, "command mode"),
            DataMode::DataMode => write!(f, "data mode"),
            DataMode::ExtendedDataMode => write!(f, "extended data mode"),
            DataMode::PPPMode => write!(f, "PPP mode"),
        }
    }
}

/// Message-type tag carried in the 2-byte type field of an EDM frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Peer connect event.
    ConnectEvent,
    /// Peer disconnect event.
    DisconnectEvent,
    /// Inbound data on a channel.
    DataEvent,
    /// Outbound data on a channel.
    DataCommand,
    /// Unsolicited AT event (URC).
    AtEvent,
    /// AT command request.
    AtRequest,
    /// AT command confirmation (response).
    AtConfirm,
    /// Resend request from the module.
    ResendCommand,
    /// iPhone/iAP session event.
    IPhoneEvent,
    /// Emitted by the module once EDM is up.
    StartEvent,
}

impl MessageType {
    /// The on-wire tag value.
    pub fn tag(&self) -> u16 {
        match self {
            MessageType::ConnectEvent => TAG_CONNECT_EVENT,
            MessageType::DisconnectEvent => TAG_DISCONNECT_EVENT,
            MessageType::DataEvent => TAG_DATA_EVENT,
            MessageType::DataCommand => TAG_DATA_COMMAND,
            MessageType::AtEvent => TAG_AT_EVENT,
            MessageType::AtRequest => TAG_AT_REQUEST,
            MessageType::AtConfirm => TAG_AT_CONFIRM,
            MessageType::ResendCommand => TAG_RESEND_COMMAND,
            MessageType::IPhoneEvent => TAG_IPHONE_EVENT,
            MessageType::StartEvent => TAG_START_EVENT,
        }
    }
}

impl TryFrom<u16> for MessageType {
    type Error = ProtocolError;

    fn try_from(tag: u16) -> Result<Self, Self::Error> {
        match tag {
            TAG_CONNECT_EVENT => Ok(MessageType::ConnectEvent),
            TAG_DISCONNECT_EVENT => Ok(MessageType::DisconnectEvent),
            TAG_DATA_EVENT => Ok(MessageType::DataEvent),
            TAG_DATA_COMMAND => Ok(MessageType::DataCommand),
            TAG_AT_EVENT => Ok(MessageType::AtEvent),
            TAG_AT_REQUEST => Ok(MessageType::AtRequest),
            TAG_AT_CONFIRM => Ok(MessageType::AtConfirm),
            TAG_RESEND_COMMAND => Ok(MessageType::ResendCommand),
            TAG_IPHONE_EVENT => Ok(MessageType::IPhoneEvent),
            TAG_START_EVENT => Ok(MessageType::StartEvent),
            other => Err(ProtocolError::UnknownMessageType(other)),
        }
    }
}

/// A decoded inbound message.
///
/// `msg_type` is always present for EDM-decoded frames and always absent for
/// command-mode text (the text protocol has no type tag). `content` is the
/// frame payload with the tag stripped; an empty payload decodes to `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message-type tag, when the framing carries one.
    pub msg_type: Option<MessageType>,
    /// Payload bytes, `None` when empty.
    pub content: Option<Vec<u8>>,
}

/// A caller-supplied receive expectation.
///
/// `msg_type: None` accepts any type; `content: None` accepts any content.
/// A non-`None` content matches as a byte sub-sequence of the received
/// content, not by exact equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectation {
    /// Required message type, or `None` for any.
    pub msg_type: Option<MessageType>,
    /// Required content sub-sequence, or `None` for any.
    pub content: Option<Vec<u8>>,
}

impl Expectation {
    /// Expect a specific type carrying a specific content sub-sequence.
    pub fn typed(msg_type: MessageType, content: impl Into<Vec<u8>>) -> Self {
        Expectation {
            msg_type: Some(msg_type),
            content: Some(content.into()),
        }
    }

    /// Expect a specific type with any content.
    pub fn any_content(msg_type: MessageType) -> Self {
        Expectation {
            msg_type: Some(msg_type),
            content: None,
        }
    }

    /// Expect a content sub-sequence regardless of type (command-mode text,
    /// or a type-wildcard in EDM).
    pub fn text(content: impl Into<Vec<u8>>) -> Self {
        Expectation {
            msg_type: None,
            content: Some(content.into()),
        }
    }
}

/// Structured decode of a [`MessageType::ConnectEvent`] payload.
///
/// Layout: `channel_id(1), connect_type(1), protocol(1), remote_addr(4),
/// remote_port(2, big-endian)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectEvent {
    /// Logical data channel assigned to the connection.
    pub channel_id: u8,
    /// Connect type (Bluetooth, IPv4, IPv6).
    pub connect_type: u8,
    /// Transport protocol (TCP, UDP).
    pub protocol: u8,
    /// Remote peer address.
    pub remote_addr: Ipv4Addr,
    /// Remote peer port.
    pub remote_port: u16,
}

impl ConnectEvent {
    /// Minimum payload length of a connect event.
    pub const MIN_LEN: usize = 9;

    /// Decode a connect-event payload.
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::MIN_LEN {
            return Err(ProtocolError::MalformedEvent {
                event: "connect",
                expected: Self::MIN_LEN,
                actual: payload.len(),
            });
        }
        Ok(ConnectEvent {
            channel_id: payload[0],
            connect_type: payload[1],
            protocol: payload[2],
            remote_addr: Ipv4Addr::new(payload[3], payload[4], payload[5], payload[6]),
            remote_port: u16::from_be_bytes([payload[7], payload[8]]),
        })
    }
}

//! ODIN-W2 Dual-Mode Wire Protocol
//!
//! This crate provides the wire-format types and codecs for driving a
//! u-blox ODIN-W2 radio module over its serial interface. The module speaks
//! two framing disciplines on the same byte stream:
//!
//! - **Command mode**: textual AT commands terminated with `\r`, answered by
//!   CRLF-delimited lines ending in `OK` or `ERROR`
//! - **Extended data mode (EDM)**: a binary envelope that multiplexes AT
//!   traffic, asynchronous events, and payload data, each frame carrying a
//!   2-byte message-type tag
//!
//! Which discipline is active is governed by the module's data mode; see
//! [`DataMode`]. This crate is I/O-free: it encodes outbound frames to byte
//! vectors and decodes/classifies inbound frame bodies. Driving an actual
//! byte stream lives in the `odinw-client` crate.
//!
//! # Example
//!
//! ```rust
//! use odinw_protocol::{encode_at_request, decode_body, MessageType};
//!
//! // Build an EDM-wrapped AT request
//! let frame = encode_at_request("+CPWROFF").unwrap();
//! assert_eq!(frame[0], 0xAA);
//!
//! // Classify a received frame body (tag + payload, delimiters stripped)
//! let (msg_type, content) = decode_body(&[0x00, 0x71]).unwrap();
//! assert_eq!(msg_type, MessageType::StartEvent);
//! assert!(content.is_none());
//! ```

mod constants;
mod error;
mod frame;
mod matcher;
mod types;

pub use constants::*;
pub use error::*;
pub use frame::*;
pub use matcher::*;
pub use types::*;

//! ODIN-W2 Serial Client
//!
//! This crate drives a u-blox ODIN-W2 radio module over a timeout-bounded
//! byte stream. It owns the protocol engine: start-marker resynchronization,
//! frame decode, expectation matching, AT request/response correlation with
//! echo suppression, and the data-mode state machine gating which operations
//! are legal at any time.
//!
//! The byte stream itself is abstracted behind the [`Transport`] trait; a
//! [`SerialTransport`] implementation backed by the `serialport` crate is
//! provided for real hardware, and tests drive the engine with scripted
//! in-memory transports.
//!
//! # Concurrency model
//!
//! Everything is single-threaded, synchronous, and blocking. There is exactly
//! one request in flight at a time, and the transport's per-read timeout is
//! the only cancellation mechanism. A caller that wants a higher-level
//! timeout bounds its own retry loop over [`Received::Timeout`] results.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use odinw_client::{OdinClient, SerialTransport};
//! use odinw_protocol::DataMode;
//!
//! let transport = SerialTransport::open("/dev/ttyUSB0", 115_200, Duration::from_secs(2))?;
//! let mut client = OdinClient::new(transport);
//! client.reboot()?;
//! client.wait_for_startup()?;
//! client.set_data_mode(DataMode::ExtendedDataMode)?;
//! ```

mod client;
mod error;
mod ops;
mod scanner;
mod transport;

pub use client::*;
pub use error::*;
pub use ops::*;
pub use scanner::*;
pub use transport::*;

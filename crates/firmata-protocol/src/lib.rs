//! Firmata Wire Protocol
//!
//! This crate provides the wire layer for talking to boards running
//! Firmata-style firmware over a byte stream: outbound command encoding,
//! inbound message decoding, the framing reader, and the transport contract
//! both sit on.
//!
//! # Protocol Overview
//!
//! A message's first byte is its *status*. The high nibble selects the
//! message class; for channel messages the low nibble carries a pin or port
//! index. Messages are either:
//!
//! - **Status messages**: fixed length, e.g. `{0xF9, major, minor}`
//! - **Channel messages**: three bytes with a 14-bit payload split into
//!   7-bit halves, e.g. an analog reading `{0xE0 | channel, lsb, msb}`
//! - **SysEx envelopes**: `0xF0`, a command byte, a variable payload, `0xF7`
//!
//! # Example
//!
//! ```rust,ignore
//! use firmata_protocol::{Command, Message, MessageReader};
//!
//! // Build a command
//! let frame = Command::QueryCapabilities.encode();
//!
//! // Pull one inbound message off a transport
//! let reader = MessageReader::default();
//! let raw = reader.read_frame(&transport)?;
//! let message = Message::decode(&raw)?;
//! ```

mod commands;
mod constants;
mod error;
mod frame;
mod messages;
mod transport;
mod types;

pub use commands::*;
pub use constants::*;
pub use error::*;
pub use frame::*;
pub use messages::*;
pub use transport::*;
pub use types::*;

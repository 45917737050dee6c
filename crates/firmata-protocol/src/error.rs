//! Protocol error types.

use thiserror::Error;

/// Errors that can occur when decoding inbound messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Message is too short for its class.
    #[error("message too short: expected at least {expected} bytes, got {actual}")]
    MessageTooShort {
        /// Expected minimum length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// First byte is not a recognized status byte.
    #[error("unknown status byte: 0x{0:02X}")]
    UnknownStatus(u8),

    /// A mode byte outside the known pin mode set where one is required.
    #[error("unknown pin mode: 0x{0:02X}")]
    UnknownPinMode(u8),

    /// A SysEx frame without the end-of-envelope terminator.
    #[error("sysex envelope missing 0xF7 terminator")]
    UnterminatedSysEx,
}

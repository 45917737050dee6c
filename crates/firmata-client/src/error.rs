//! Client error types.

use firmata_protocol::TransportError;
use thiserror::Error;

/// Errors surfaced by client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The transport failed non-transiently.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The transport failed while the handshake was running; the client
    /// stays disconnected.
    #[error("handshake failed: {0}")]
    Handshake(#[source] TransportError),

    /// A pin operation was invoked before the handshake populated the
    /// pin table.
    #[error("not connected: pin operations need a completed handshake")]
    NotConnected,

    /// A pin operation named a pin the board does not have.
    #[error("pin {pin} out of range: the board reports {count} pins")]
    PinOutOfRange {
        /// Requested pin number.
        pin: usize,
        /// Number of pins in the table.
        count: usize,
    },
}

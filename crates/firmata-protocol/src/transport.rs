//! Transport contract consumed by the framing reader and the client.

use thiserror::Error;

/// Errors surfaced by a transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Underlying I/O failure.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport was closed locally.
    #[error("transport closed")]
    Closed,
}

/// A full-duplex blocking byte stream.
///
/// Methods take `&self`; implementations carry their own interior
/// synchronization. This lets `close` be called from a thread that does not
/// hold the client's state lock, which is what interrupts a processing step
/// blocked in `read`.
///
/// `read` may return fewer bytes than the buffer holds, including zero. A
/// zero-length read is the end-of-stream-equivalent transient condition;
/// callers retry it after a short delay. Once `close` has been called every
/// subsequent operation returns [`TransportError::Closed`].
pub trait Transport: Send + Sync {
    /// Read up to `buf.len()` bytes. `Ok(0)` means nothing is available yet.
    fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Write bytes, returning how many were accepted.
    fn write(&self, data: &[u8]) -> Result<usize, TransportError>;

    /// Close the stream. Unblocks pending reads on other threads.
    fn close(&self) -> Result<(), TransportError>;
}

/// Write all of `data`, retrying partial writes.
pub fn write_all(transport: &dyn Transport, data: &[u8]) -> Result<(), TransportError> {
    let mut written = 0;
    while written < data.len() {
        let n = transport.write(&data[written..])?;
        if n == 0 {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "transport accepted no bytes",
            )));
        }
        written += n;
    }
    Ok(())
}

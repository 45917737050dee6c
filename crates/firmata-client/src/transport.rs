//! Concrete transports.
//!
//! Opening a physical serial device is left to the application; anything
//! implementing [`Transport`] plugs into the client. This module provides
//! the two adapters the crate ships with: a TCP stream (serial-over-TCP
//! bridges expose board UARTs this way) and an in-process loopback pair for
//! tests and simulation.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{unbounded, Receiver, Sender};
use firmata_protocol::{Transport, TransportError};

// ============================================================================
// TCP
// ============================================================================

/// A [`Transport`] over a TCP stream.
///
/// `close` shuts the socket down in both directions and flips a flag, so a
/// read blocked on another thread unblocks with a zero-length result and
/// the next attempt reports [`TransportError::Closed`] instead of spinning.
pub struct TcpTransport {
    stream: TcpStream,
    closed: AtomicBool,
}

impl TcpTransport {
    /// Connect to a serial-over-TCP bridge.
    pub fn connect(addr: impl ToSocketAddrs) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(TcpTransport::from_stream(stream))
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream) -> Self {
        TcpTransport {
            stream,
            closed: AtomicBool::new(false),
        }
    }
}

impl Transport for TcpTransport {
    fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        match (&self.stream).read(buf) {
            Ok(n) => Ok(n),
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock
                        | std::io::ErrorKind::TimedOut
                        | std::io::ErrorKind::Interrupted
                        | std::io::ErrorKind::UnexpectedEof
                ) =>
            {
                Ok(0)
            }
            Err(e) => Err(TransportError::Io(e)),
        }
    }

    fn write(&self, data: &[u8]) -> Result<usize, TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        (&self.stream).write(data).map_err(TransportError::Io)
    }

    fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::Release);
        // NotConnected here just means the peer already went away.
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(TransportError::Io(e)),
        }
    }
}

// ============================================================================
// Loopback
// ============================================================================

/// One end of an in-process transport pair created by [`loopback`].
pub struct LoopbackTransport {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
    pending: Mutex<VecDeque<u8>>,
    closed: Arc<AtomicBool>,
}

/// Create a connected pair of transports.
///
/// Bytes written to one end are read from the other, in order. Closing
/// either end closes both. The device side of a test script holds one end
/// and the client the other.
pub fn loopback() -> (LoopbackTransport, LoopbackTransport) {
    let (a_tx, b_rx) = unbounded();
    let (b_tx, a_rx) = unbounded();
    let closed = Arc::new(AtomicBool::new(false));

    let a = LoopbackTransport {
        tx: a_tx,
        rx: a_rx,
        pending: Mutex::new(VecDeque::new()),
        closed: closed.clone(),
    };
    let b = LoopbackTransport {
        tx: b_tx,
        rx: b_rx,
        pending: Mutex::new(VecDeque::new()),
        closed,
    };
    (a, b)
}

impl Transport for LoopbackTransport {
    fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        let Ok(mut pending) = self.pending.lock() else {
            return Err(TransportError::Closed);
        };
        // Pull everything queued so far without blocking; an empty result
        // is the transient short read the framing reader retries.
        while let Ok(chunk) = self.rx.try_recv() {
            pending.extend(chunk);
        }
        let n = pending.len().min(buf.len());
        for slot in buf.iter_mut().take(n) {
            *slot = pending.pop_front().unwrap_or_default();
        }
        Ok(n)
    }

    fn write(&self, data: &[u8]) -> Result<usize, TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        self.tx
            .send(data.to_vec())
            .map_err(|_| TransportError::Closed)?;
        Ok(data.len())
    }

    fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

impl LoopbackTransport {
    /// Drain every byte currently buffered on this end. Test helper for
    /// inspecting what the peer wrote.
    pub fn drain(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let Ok(mut pending) = self.pending.lock() else {
            return out;
        };
        while let Ok(chunk) = self.rx.try_recv() {
            pending.extend(chunk);
        }
        out.extend(pending.drain(..));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_carries_bytes_both_ways() {
        let (a, b) = loopback();

        a.write(&[1, 2, 3]).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(b.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);

        b.write(&[4]).unwrap();
        assert_eq!(a.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 4);
    }

    #[test]
    fn test_loopback_partial_reads_keep_order() {
        let (a, b) = loopback();
        a.write(&[1, 2, 3, 4, 5]).unwrap();

        let mut buf = [0u8; 2];
        assert_eq!(b.read(&mut buf).unwrap(), 2);
        assert_eq!(buf, [1, 2]);
        assert_eq!(b.read(&mut buf).unwrap(), 2);
        assert_eq!(buf, [3, 4]);
        assert_eq!(b.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 5);
    }

    #[test]
    fn test_loopback_empty_read_is_transient() {
        let (_a, b) = loopback();
        let mut buf = [0u8; 4];
        assert_eq!(b.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_tcp_transport_roundtrip() {
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = std::thread::spawn(move || {
            let (mut peer, _) = listener.accept().unwrap();
            let mut buf = [0u8; 3];
            std::io::Read::read_exact(&mut peer, &mut buf).unwrap();
            std::io::Write::write_all(&mut peer, &buf).unwrap();
        });

        let transport = TcpTransport::connect(addr).unwrap();
        transport.write(&[0xF9, 0x02, 0x05]).unwrap();

        let mut echoed = Vec::new();
        while echoed.len() < 3 {
            let mut buf = [0u8; 3];
            let n = transport.read(&mut buf).unwrap();
            echoed.extend_from_slice(&buf[..n]);
        }
        assert_eq!(echoed, vec![0xF9, 0x02, 0x05]);

        transport.close().unwrap();
        let mut buf = [0u8; 1];
        assert!(matches!(
            transport.read(&mut buf),
            Err(TransportError::Closed)
        ));
        server.join().unwrap();
    }

    #[test]
    fn test_loopback_close_stops_both_ends() {
        let (a, b) = loopback();
        a.close().unwrap();

        let mut buf = [0u8; 4];
        assert!(matches!(a.read(&mut buf), Err(TransportError::Closed)));
        assert!(matches!(b.read(&mut buf), Err(TransportError::Closed)));
        assert!(matches!(b.write(&[1]), Err(TransportError::Closed)));
    }
}

//! Framing reader.
//!
//! Inbound traffic is a mix of 3-byte status/channel messages and
//! variable-length SysEx envelopes. The reader pulls exactly one complete
//! frame per call:
//!
//! ```text
//! +--------+--------+--------+            +------+-----+---------+------+
//! | status |  data  |  data  |     or     | 0xF0 | cmd | payload | 0xF7 |
//! +--------+--------+--------+            +------+-----+---------+------+
//! ```
//!
//! Transports may return short or zero-length reads at any point; the reader
//! sleeps its poll interval and retries, so a frame is never split or lost
//! across transient end-of-stream conditions.

use std::thread;
use std::time::Duration;

use bytes::{BufMut, BytesMut};

use crate::constants::{END_SYSEX, START_SYSEX};
use crate::transport::{Transport, TransportError};

/// Shortest possible frame: one status byte plus two data bytes.
pub const MIN_MESSAGE_SIZE: usize = 3;

/// Default backoff between transient short reads.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Extracts complete frames from a [`Transport`].
#[derive(Debug)]
pub struct MessageReader {
    poll_interval: Duration,
}

impl Default for MessageReader {
    fn default() -> Self {
        MessageReader::new(DEFAULT_POLL_INTERVAL)
    }
}

impl MessageReader {
    /// Create a reader with the given retry backoff.
    pub fn new(poll_interval: Duration) -> Self {
        MessageReader { poll_interval }
    }

    /// Read one complete frame.
    ///
    /// Blocks until a full frame has arrived. Zero-length reads are treated
    /// as transient and retried after the poll interval; only a real
    /// transport failure surfaces as an error.
    pub fn read_frame(&self, transport: &dyn Transport) -> Result<Vec<u8>, TransportError> {
        let mut frame = BytesMut::with_capacity(MIN_MESSAGE_SIZE);

        let mut head = [0u8; MIN_MESSAGE_SIZE];
        self.read_exact(transport, &mut head)?;
        frame.put_slice(&head);

        if head[0] == START_SYSEX && head[2] != END_SYSEX {
            let mut byte = [0u8; 1];
            loop {
                self.read_exact(transport, &mut byte)?;
                frame.put_u8(byte[0]);
                if byte[0] == END_SYSEX {
                    break;
                }
            }
        }

        Ok(frame.to_vec())
    }

    /// Fill `buf` completely, retrying short and zero-length reads.
    fn read_exact(&self, transport: &dyn Transport, buf: &mut [u8]) -> Result<(), TransportError> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = transport.read(&mut buf[filled..])?;
            if n == 0 {
                thread::sleep(self.poll_interval);
                continue;
            }
            filled += n;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Transport fed from a script of read results. An empty chunk plays the
    /// role of a transient EOF.
    struct ScriptedTransport {
        chunks: Mutex<VecDeque<Vec<u8>>>,
    }

    impl ScriptedTransport {
        fn new(chunks: &[&[u8]]) -> Self {
            ScriptedTransport {
                chunks: Mutex::new(chunks.iter().map(|c| c.to_vec()).collect()),
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
            let mut chunks = self.chunks.lock().expect("script lock");
            let Some(mut chunk) = chunks.pop_front() else {
                return Err(TransportError::Closed);
            };
            let n = chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            if n < chunk.len() {
                chunks.push_front(chunk.split_off(n));
            }
            Ok(n)
        }

        fn write(&self, data: &[u8]) -> Result<usize, TransportError> {
            Ok(data.len())
        }

        fn close(&self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn reader() -> MessageReader {
        MessageReader::new(Duration::from_millis(1))
    }

    #[test]
    fn test_read_channel_message() {
        let transport = ScriptedTransport::new(&[&[0xE0, 0x7F, 0x01]]);
        let frame = reader().read_frame(&transport).unwrap();
        assert_eq!(frame, vec![0xE0, 0x7F, 0x01]);
    }

    #[test]
    fn test_read_channel_message_across_short_reads() {
        let transport = ScriptedTransport::new(&[&[0x90], &[0x01], &[0x00]]);
        let frame = reader().read_frame(&transport).unwrap();
        assert_eq!(frame, vec![0x90, 0x01, 0x00]);
    }

    #[test]
    fn test_read_sysex_frame() {
        let transport = ScriptedTransport::new(&[&[0xF0, 0x79, 0x02, 0x05, b'F', 0x00, 0xF7]]);
        let frame = reader().read_frame(&transport).unwrap();
        assert_eq!(frame, vec![0xF0, 0x79, 0x02, 0x05, b'F', 0x00, 0xF7]);
    }

    #[test]
    fn test_minimal_sysex_frame_needs_no_extra_reads() {
        // {0xF0, cmd, 0xF7} is already complete after the three-byte read.
        let transport = ScriptedTransport::new(&[&[0xF0, 0x6B, 0xF7]]);
        let frame = reader().read_frame(&transport).unwrap();
        assert_eq!(frame, vec![0xF0, 0x6B, 0xF7]);
    }

    #[test]
    fn test_sysex_survives_transient_eof() {
        // A transient EOF (zero-length read) in the middle of an envelope
        // must not lose bytes or split the frame.
        let transport = ScriptedTransport::new(&[
            &[0xF0, 0x77, 0x50],
            &[],
            &[0x00, 0x10, 0x00, 0x41, 0x00],
            &[],
            &[0x42, 0x00, 0xF7],
        ]);
        let frame = reader().read_frame(&transport).unwrap();
        assert_eq!(
            frame,
            vec![0xF0, 0x77, 0x50, 0x00, 0x10, 0x00, 0x41, 0x00, 0x42, 0x00, 0xF7]
        );
    }

    #[test]
    fn test_back_to_back_frames_stay_separate() {
        let transport =
            ScriptedTransport::new(&[&[0xF9, 0x02, 0x05, 0x90, 0x01, 0x00], &[0xE0, 0x7F, 0x01]]);
        let r = reader();
        assert_eq!(r.read_frame(&transport).unwrap(), vec![0xF9, 0x02, 0x05]);
        assert_eq!(r.read_frame(&transport).unwrap(), vec![0x90, 0x01, 0x00]);
        assert_eq!(r.read_frame(&transport).unwrap(), vec![0xE0, 0x7F, 0x01]);
    }

    #[test]
    fn test_transport_failure_surfaces() {
        let transport = ScriptedTransport::new(&[&[0xF0, 0x71]]);
        // Script runs dry mid-envelope -> Closed.
        let err = reader().read_frame(&transport).unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[test]
    fn test_emitted_commands_roundtrip_through_reader() {
        use crate::commands::Command;
        use crate::types::PinMode;

        let commands = [
            Command::QueryFirmware,
            Command::QueryCapabilities,
            Command::QueryAnalogMapping,
            Command::QueryPinState { pin: 7 },
            Command::SetPinMode {
                pin: 7,
                mode: PinMode::Pwm,
            },
            Command::DigitalWrite {
                port: 1,
                mask: 0xA5,
            },
            Command::AnalogWrite {
                pin: 3,
                value: 1023,
            },
            Command::I2cRead {
                address: 0x50,
                count: 2,
            },
            Command::I2cWrite {
                address: 0x50,
                data: vec![0x01, 0x02],
            },
            Command::I2cConfig { data: vec![0x0010] },
        ];
        // Report toggles are two bytes and the bare version query is one;
        // neither is board-inbound, so they are excluded here.
        for command in commands {
            let encoded = command.encode();
            let transport = ScriptedTransport::new(&[&encoded]);
            let frame = reader().read_frame(&transport).unwrap();
            assert_eq!(frame, encoded, "frame mismatch for {:?}", command);
        }
    }
}

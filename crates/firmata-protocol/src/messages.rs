//! Messages received from the board.

use crate::constants::*;
use crate::error::ProtocolError;
use crate::types::{join_seven_bit, I2cReply, PinMode, SupportedModes};

/// One decoded inbound message.
///
/// A frame is either a fixed-length status message or a SysEx envelope; both
/// are decoded from the complete byte run the framing reader hands over
/// (for SysEx that includes the leading `0xF0` and trailing `0xF7`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Protocol version report.
    ProtocolVersion {
        /// Major version.
        major: u8,
        /// Minor version.
        minor: u8,
    },

    /// Analog channel update.
    Analog {
        /// Channel index from the status low nibble.
        channel: u8,
        /// 14-bit reading.
        value: u16,
    },

    /// Digital port update.
    Digital {
        /// Port index from the status low nibble.
        port: u8,
        /// Port mask; bit `i` is pin `8 * port + i`.
        mask: u16,
    },

    /// Capability report: the supported-mode set of every pin, in pin order.
    Capability(Vec<SupportedModes>),

    /// Analog mapping report: one channel byte per pin,
    /// [`ANALOG_CHANNEL_NONE`] for pins without an analog channel.
    AnalogMapping(Vec<u8>),

    /// State report for a single pin.
    PinState {
        /// Pin number.
        pin: u8,
        /// Currently configured mode.
        mode: PinMode,
        /// Value assembled from up to three 7-bit slices.
        value: u32,
    },

    /// I2C read result.
    I2cReply(I2cReply),

    /// Firmware identity report.
    Firmware {
        /// Major version.
        major: u8,
        /// Minor version.
        minor: u8,
        /// Firmware name with NUL characters stripped.
        name: String,
    },

    /// Free-form text pushed by the board.
    StringText(String),

    /// A well-formed SysEx envelope with a command byte this client does not
    /// interpret. Ignored by the processing step.
    UnknownSysEx {
        /// The unrecognized command byte.
        command: u8,
    },
}

impl Message {
    /// Decode one complete frame.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let status = *frame.first().ok_or(ProtocolError::MessageTooShort {
            expected: 1,
            actual: 0,
        })?;

        match status {
            PROTOCOL_VERSION => {
                check_len(frame, 3)?;
                Ok(Message::ProtocolVersion {
                    major: frame[1],
                    minor: frame[2],
                })
            }

            START_SYSEX => decode_sysex(frame),

            s if (ANALOG_MESSAGE..=ANALOG_MESSAGE_END).contains(&s) => {
                check_len(frame, 3)?;
                Ok(Message::Analog {
                    channel: s & 0x0F,
                    value: join_seven_bit(frame[1], frame[2]),
                })
            }

            s if (DIGITAL_MESSAGE..=DIGITAL_MESSAGE_END).contains(&s) => {
                check_len(frame, 3)?;
                Ok(Message::Digital {
                    port: s & 0x0F,
                    mask: join_seven_bit(frame[1], frame[2]),
                })
            }

            other => Err(ProtocolError::UnknownStatus(other)),
        }
    }
}

fn check_len(frame: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if frame.len() < expected {
        return Err(ProtocolError::MessageTooShort {
            expected,
            actual: frame.len(),
        });
    }
    Ok(())
}

/// Decode a complete SysEx envelope, dispatching on the command byte.
fn decode_sysex(frame: &[u8]) -> Result<Message, ProtocolError> {
    check_len(frame, 3)?;
    if frame[frame.len() - 1] != END_SYSEX {
        return Err(ProtocolError::UnterminatedSysEx);
    }

    let command = frame[1];
    let payload = &frame[2..frame.len() - 1];

    match command {
        CAPABILITY_RESPONSE => Ok(Message::Capability(decode_capability(payload))),

        ANALOG_MAPPING_RESPONSE => Ok(Message::AnalogMapping(payload.to_vec())),

        PIN_STATE_RESPONSE => {
            // {pin, mode, at least one value slice}
            check_len(frame, 6)?;
            let pin = payload[0];
            let mode = PinMode::from_byte(payload[1])?;
            let mut value = payload[2] as u32;
            if let Some(&slice) = payload.get(3) {
                value |= (slice as u32) << 7;
            }
            if let Some(&slice) = payload.get(4) {
                value |= (slice as u32) << 14;
            }
            Ok(Message::PinState { pin, mode, value })
        }

        I2C_REPLY => {
            // Address, register and the first data byte are mandatory.
            check_len(frame, 9)?;
            let address = join_seven_bit(payload[0], payload[1]);
            let register = join_seven_bit(payload[2], payload[3]);
            let mut data = vec![join_seven_bit(payload[4], payload[5]) as u8];
            for pair in payload[6..].chunks_exact(2) {
                data.push(join_seven_bit(pair[0], pair[1]) as u8);
            }
            Ok(Message::I2cReply(I2cReply {
                address,
                register,
                data,
            }))
        }

        FIRMWARE_QUERY => {
            check_len(frame, 5)?;
            let major = payload[0];
            let minor = payload[1];
            let mut name_bytes = Vec::with_capacity((payload.len() - 2) / 2);
            for pair in payload[2..].chunks_exact(2) {
                let ch = join_seven_bit(pair[0], pair[1]) as u8;
                if ch != 0 {
                    name_bytes.push(ch);
                }
            }
            Ok(Message::Firmware {
                major,
                minor,
                name: String::from_utf8_lossy(&name_bytes).into_owned(),
            })
        }

        STRING_DATA => Ok(Message::StringText(
            String::from_utf8_lossy(payload).into_owned(),
        )),

        other => Ok(Message::UnknownSysEx { command: other }),
    }
}

/// Walk a capability payload: each pin is a run of `(mode, resolution)`
/// pairs closed by [`CAPABILITY_PIN_TERMINATOR`]; the mode byte of every
/// pair is unioned into that pin's set. An unterminated trailing run is
/// discarded.
fn decode_capability(payload: &[u8]) -> Vec<SupportedModes> {
    let mut pins = Vec::new();
    let mut modes = SupportedModes::empty();
    let mut at_mode_byte = true;

    for &byte in payload {
        if byte == CAPABILITY_PIN_TERMINATOR {
            pins.push(modes);
            modes = SupportedModes::empty();
            at_mode_byte = true;
            continue;
        }
        if at_mode_byte {
            modes.insert_byte(byte);
        }
        at_mode_byte = !at_mode_byte;
    }

    pins
}

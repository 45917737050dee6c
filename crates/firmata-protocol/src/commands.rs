//! Commands that can be sent to the board.

use crate::constants::*;
use crate::types::*;

/// Commands the host can send to the board.
///
/// `DigitalWrite` carries a whole port mask rather than a single pin level;
/// computing the mask from pin state is the client's job, the codec only
/// frames it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Request a protocol version report. First command of the handshake.
    QueryProtocolVersion,

    /// Request the firmware name and version.
    QueryFirmware,

    /// Request per-pin capabilities.
    QueryCapabilities,

    /// Request the analog channel mapping.
    QueryAnalogMapping,

    /// Request the state of one pin.
    QueryPinState {
        /// Pin number.
        pin: u8,
    },

    /// Configure a pin's mode.
    SetPinMode {
        /// Pin number.
        pin: u8,
        /// Mode to configure.
        mode: PinMode,
    },

    /// Write a full digital port.
    DigitalWrite {
        /// Port index (a group of eight pins).
        port: u8,
        /// Eight-bit port mask, one bit per pin.
        mask: u8,
    },

    /// Write an analog (PWM/servo) value to a pin.
    AnalogWrite {
        /// Pin number. Only pins 0..16 are addressable; the status byte has
        /// a four-bit channel field and larger pin numbers alias into it.
        pin: u8,
        /// 14-bit value.
        value: u16,
    },

    /// Enable or disable reporting for a digital port or analog channel.
    ToggleReporting {
        /// Reporting class.
        kind: ReportKind,
        /// Port index (digital) or channel index (analog).
        index: u8,
        /// Whether reporting should be on.
        enabled: bool,
    },

    /// Read `count` bytes from an I2C slave.
    I2cRead {
        /// Slave address.
        address: u8,
        /// Number of bytes to read.
        count: u16,
    },

    /// Write bytes to an I2C slave.
    I2cWrite {
        /// Slave address.
        address: u8,
        /// Bytes to write; each is sent as a 7-bit pair.
        data: Vec<u8>,
    },

    /// Configure the I2C subsystem (typically the sampling delay).
    I2cConfig {
        /// Values to send; each is sent as an 8-bit low/high pair. This is
        /// the one place the protocol splits on byte boundaries instead of
        /// 7-bit halves.
        data: Vec<u16>,
    },

    /// Reset the board.
    SystemReset,
}

impl Command {
    /// Encode the command to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Command::QueryProtocolVersion => vec![PROTOCOL_VERSION],

            Command::QueryFirmware => sysex(&[FIRMWARE_QUERY]),

            Command::QueryCapabilities => sysex(&[CAPABILITY_QUERY]),

            Command::QueryAnalogMapping => sysex(&[ANALOG_MAPPING_QUERY]),

            Command::QueryPinState { pin } => sysex(&[PIN_STATE_QUERY, *pin]),

            Command::SetPinMode { pin, mode } => vec![PIN_MODE, *pin, mode.to_byte()],

            Command::DigitalWrite { port, mask } => {
                let (lsb, msb) = split_seven_bit(*mask as u16);
                vec![DIGITAL_MESSAGE | (port & 0x0F), lsb, msb]
            }

            Command::AnalogWrite { pin, value } => {
                let (lsb, msb) = split_seven_bit(*value);
                vec![ANALOG_MESSAGE | (pin & 0x0F), lsb, msb]
            }

            Command::ToggleReporting {
                kind,
                index,
                enabled,
            } => {
                let state = if *enabled { HIGH } else { LOW };
                vec![kind.status_base() | (index & 0x0F), state]
            }

            Command::I2cRead { address, count } => {
                let (lsb, msb) = split_seven_bit(*count);
                sysex(&[
                    I2C_REQUEST,
                    *address,
                    I2cMode::Read.to_byte() << 3,
                    lsb,
                    msb,
                ])
            }

            Command::I2cWrite { address, data } => {
                let mut payload = Vec::with_capacity(3 + data.len() * 2);
                payload.push(I2C_REQUEST);
                payload.push(*address);
                payload.push(I2cMode::Write.to_byte() << 3);
                for byte in data {
                    let (lsb, msb) = split_seven_bit(*byte as u16);
                    payload.push(lsb);
                    payload.push(msb);
                }
                sysex(&payload)
            }

            Command::I2cConfig { data } => {
                let mut payload = Vec::with_capacity(1 + data.len() * 2);
                payload.push(I2C_CONFIG);
                for value in data {
                    payload.push((value & 0xFF) as u8);
                    payload.push((value >> 8) as u8);
                }
                sysex(&payload)
            }

            Command::SystemReset => vec![SYSTEM_RESET],
        }
    }
}

/// Wrap a payload in a SysEx envelope.
fn sysex(payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + 2);
    buf.push(START_SYSEX);
    buf.extend_from_slice(payload);
    buf.push(END_SYSEX);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_encodings() {
        assert_eq!(Command::QueryProtocolVersion.encode(), vec![0xF9]);
        assert_eq!(Command::QueryFirmware.encode(), vec![0xF0, 0x79, 0xF7]);
        assert_eq!(Command::QueryCapabilities.encode(), vec![0xF0, 0x6B, 0xF7]);
        assert_eq!(Command::QueryAnalogMapping.encode(), vec![0xF0, 0x69, 0xF7]);
        assert_eq!(
            Command::QueryPinState { pin: 13 }.encode(),
            vec![0xF0, 0x6D, 13, 0xF7]
        );
    }

    #[test]
    fn test_set_pin_mode_encoding() {
        assert_eq!(
            Command::SetPinMode {
                pin: 13,
                mode: PinMode::Output
            }
            .encode(),
            vec![0xF4, 13, 0x01]
        );
    }

    #[test]
    fn test_digital_write_encoding() {
        assert_eq!(
            Command::DigitalWrite {
                port: 0,
                mask: 0x05
            }
            .encode(),
            vec![0x90, 0x05, 0x00]
        );
        // Bit 7 of the mask lands in the second payload byte.
        assert_eq!(
            Command::DigitalWrite {
                port: 1,
                mask: 0x80
            }
            .encode(),
            vec![0x91, 0x00, 0x01]
        );
    }

    #[test]
    fn test_analog_write_encoding() {
        assert_eq!(
            Command::AnalogWrite {
                pin: 3,
                value: 1023
            }
            .encode(),
            vec![0xE3, 0x7F, 0x07]
        );
    }

    #[test]
    fn test_toggle_reporting_encoding() {
        assert_eq!(
            Command::ToggleReporting {
                kind: ReportKind::Digital,
                index: 1,
                enabled: true
            }
            .encode(),
            vec![0xD1, 0x01]
        );
        assert_eq!(
            Command::ToggleReporting {
                kind: ReportKind::Analog,
                index: 2,
                enabled: false
            }
            .encode(),
            vec![0xC2, 0x00]
        );
    }

    #[test]
    fn test_i2c_read_encoding() {
        assert_eq!(
            Command::I2cRead {
                address: 0x50,
                count: 2
            }
            .encode(),
            vec![0xF0, 0x76, 0x50, 0x08, 0x02, 0x00, 0xF7]
        );
    }

    #[test]
    fn test_i2c_write_splits_seven_bit() {
        assert_eq!(
            Command::I2cWrite {
                address: 0x50,
                data: vec![0x10, 0xFF]
            }
            .encode(),
            vec![0xF0, 0x76, 0x50, 0x00, 0x10, 0x00, 0x7F, 0x01, 0xF7]
        );
    }

    #[test]
    fn test_i2c_config_splits_eight_bit() {
        // The config payload uses byte halves, not 7-bit halves.
        assert_eq!(
            Command::I2cConfig { data: vec![0x1234] }.encode(),
            vec![0xF0, 0x78, 0x34, 0x12, 0xF7]
        );
    }

    #[test]
    fn test_system_reset_encoding() {
        assert_eq!(Command::SystemReset.encode(), vec![0xFF]);
    }
}

//! Common types used in the protocol.

use crate::constants::*;
use crate::error::ProtocolError;

/// Configurable mode of a device pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinMode {
    /// Digital input.
    Input,
    /// Digital output.
    Output,
    /// Analog input.
    Analog,
    /// Pulse-width modulated output.
    Pwm,
    /// Servo output.
    Servo,
}

impl PinMode {
    /// All mode tags the protocol defines, in wire order.
    pub const ALL: [PinMode; 5] = [
        PinMode::Input,
        PinMode::Output,
        PinMode::Analog,
        PinMode::Pwm,
        PinMode::Servo,
    ];

    /// Decode a mode byte. Returns an error for bytes outside the known set.
    pub fn from_byte(byte: u8) -> Result<Self, ProtocolError> {
        match byte {
            MODE_INPUT => Ok(PinMode::Input),
            MODE_OUTPUT => Ok(PinMode::Output),
            MODE_ANALOG => Ok(PinMode::Analog),
            MODE_PWM => Ok(PinMode::Pwm),
            MODE_SERVO => Ok(PinMode::Servo),
            other => Err(ProtocolError::UnknownPinMode(other)),
        }
    }

    /// The wire byte for this mode.
    pub fn to_byte(self) -> u8 {
        match self {
            PinMode::Input => MODE_INPUT,
            PinMode::Output => MODE_OUTPUT,
            PinMode::Analog => MODE_ANALOG,
            PinMode::Pwm => MODE_PWM,
            PinMode::Servo => MODE_SERVO,
        }
    }
}

/// The set of modes a pin supports, accumulated from a capability response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupportedModes {
    bits: u8,
}

impl SupportedModes {
    /// The empty set.
    pub fn empty() -> Self {
        SupportedModes { bits: 0 }
    }

    /// Add a mode to the set.
    pub fn insert(&mut self, mode: PinMode) {
        self.bits |= 1 << mode.to_byte();
    }

    /// Add the mode named by a capability mode byte. Bytes outside the known
    /// tag set are ignored, matching how boards advertise extended modes.
    pub fn insert_byte(&mut self, byte: u8) {
        if let Ok(mode) = PinMode::from_byte(byte) {
            self.insert(mode);
        }
    }

    /// Whether the set contains `mode`.
    pub fn contains(&self, mode: PinMode) -> bool {
        self.bits & (1 << mode.to_byte()) != 0
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Iterate the contained modes in wire order.
    pub fn iter(&self) -> impl Iterator<Item = PinMode> + '_ {
        PinMode::ALL.into_iter().filter(|m| self.contains(*m))
    }
}

impl FromIterator<PinMode> for SupportedModes {
    fn from_iter<I: IntoIterator<Item = PinMode>>(iter: I) -> Self {
        let mut modes = SupportedModes::empty();
        for mode in iter {
            modes.insert(mode);
        }
        modes
    }
}

/// I2C transfer mode, carried in bits 3..5 of the request mode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum I2cMode {
    /// Write to the slave device.
    Write,
    /// One-shot read.
    Read,
    /// Continuous read.
    ContinuousRead,
    /// Stop a continuous read.
    StopReading,
}

impl I2cMode {
    /// The wire value before shifting into the mode byte.
    pub fn to_byte(self) -> u8 {
        match self {
            I2cMode::Write => I2C_MODE_WRITE,
            I2cMode::Read => I2C_MODE_READ,
            I2cMode::ContinuousRead => I2C_MODE_CONTINUOUS_READ,
            I2cMode::StopReading => I2C_MODE_STOP_READING,
        }
    }
}

/// Which reporting class a toggle applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Digital port reporting; the toggle addresses a port of eight pins.
    Digital,
    /// Analog channel reporting; the toggle addresses one channel.
    Analog,
}

impl ReportKind {
    /// The status byte base the index is OR-ed into.
    pub fn status_base(self) -> u8 {
        match self {
            ReportKind::Digital => REPORT_DIGITAL,
            ReportKind::Analog => REPORT_ANALOG,
        }
    }
}

/// Decoded I2C read result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct I2cReply {
    /// Slave address the data came from.
    pub address: u16,
    /// Register that was read.
    pub register: u16,
    /// Data bytes, one per 7-bit pair in the reply.
    pub data: Vec<u8>,
}

/// Split a value into its low and high 7-bit halves, low first.
pub fn split_seven_bit(value: u16) -> (u8, u8) {
    ((value & 0x7F) as u8, ((value >> 7) & 0x7F) as u8)
}

/// Join low and high 7-bit halves back into a value.
pub fn join_seven_bit(lsb: u8, msb: u8) -> u16 {
    (lsb as u16 & 0x7F) | ((msb as u16 & 0x7F) << 7)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seven_bit_roundtrip() {
        for value in [0u16, 1, 127, 128, 255, 1000, 0x3FFF] {
            let (lsb, msb) = split_seven_bit(value);
            assert!(lsb < 0x80 && msb < 0x80);
            assert_eq!(join_seven_bit(lsb, msb), value);
        }
    }

    #[test]
    fn test_pin_mode_bytes() {
        for mode in PinMode::ALL {
            assert_eq!(PinMode::from_byte(mode.to_byte()).unwrap(), mode);
        }
        assert!(PinMode::from_byte(0x7F).is_err());
    }

    #[test]
    fn test_supported_modes_set() {
        let mut modes = SupportedModes::empty();
        assert!(modes.is_empty());

        modes.insert_byte(MODE_INPUT);
        modes.insert_byte(MODE_PWM);
        // Extended mode bytes boards advertise (e.g. I2C = 6) are ignored.
        modes.insert_byte(0x06);

        assert!(modes.contains(PinMode::Input));
        assert!(modes.contains(PinMode::Pwm));
        assert!(!modes.contains(PinMode::Output));
        assert_eq!(
            modes.iter().collect::<Vec<_>>(),
            vec![PinMode::Input, PinMode::Pwm]
        );
    }
}

//! Protocol constants
//!
//! These constants define the status bytes, SysEx command bytes, and other
//! wire-level values of the Firmata board protocol. Channel messages carry a
//! pin or port index in the low nibble of their status byte, so those are
//! given as range starts and ends.

// ============================================================================
// Status Bytes
// ============================================================================

/// Protocol version report. Inbound it is followed by major and minor bytes;
/// outbound the bare byte requests a report.
pub const PROTOCOL_VERSION: u8 = 0xF9;
/// System reset, no payload.
pub const SYSTEM_RESET: u8 = 0xFF;
/// Set pin mode: `{PIN_MODE, pin, mode}`.
pub const PIN_MODE: u8 = 0xF4;
/// Start of a variable-length SysEx envelope.
pub const START_SYSEX: u8 = 0xF0;
/// End of a SysEx envelope.
pub const END_SYSEX: u8 = 0xF7;

/// Digital port message base; the low nibble is the port index.
pub const DIGITAL_MESSAGE: u8 = 0x90;
/// Last status byte of the digital message range.
pub const DIGITAL_MESSAGE_END: u8 = 0x9F;
/// Analog channel message base; the low nibble is the channel index.
pub const ANALOG_MESSAGE: u8 = 0xE0;
/// Last status byte of the analog message range.
pub const ANALOG_MESSAGE_END: u8 = 0xEF;
/// Digital port reporting toggle base: `{REPORT_DIGITAL | port, state}`.
pub const REPORT_DIGITAL: u8 = 0xD0;
/// Analog channel reporting toggle base: `{REPORT_ANALOG | channel, state}`.
pub const REPORT_ANALOG: u8 = 0xC0;

// ============================================================================
// SysEx Command Bytes
// ============================================================================

/// Ask the board for its per-pin capabilities. Empty payload.
pub const CAPABILITY_QUERY: u8 = 0x6B;
/// Capability report: per pin, `(mode, resolution)` pairs terminated by 0x7F.
pub const CAPABILITY_RESPONSE: u8 = 0x6C;
/// Ask for the state of one pin: `{PIN_STATE_QUERY, pin}`.
pub const PIN_STATE_QUERY: u8 = 0x6D;
/// Pin state report: `{pin, mode, value bytes…}` with 1-3 value slices.
pub const PIN_STATE_RESPONSE: u8 = 0x6E;
/// Ask for the analog channel mapping. Empty payload.
pub const ANALOG_MAPPING_QUERY: u8 = 0x69;
/// Analog mapping report: one channel byte per pin, 0x7F for non-analog pins.
pub const ANALOG_MAPPING_RESPONSE: u8 = 0x6A;
/// Free-form text pushed by the board.
pub const STRING_DATA: u8 = 0x71;
/// I2C transaction request: `{address, mode << 3, data…}`.
pub const I2C_REQUEST: u8 = 0x76;
/// I2C read result: address, register and data bytes as 7-bit pairs.
pub const I2C_REPLY: u8 = 0x77;
/// I2C configuration: values as 8-bit low/high pairs.
pub const I2C_CONFIG: u8 = 0x78;
/// Firmware identity. Outbound empty; inbound `{major, minor, name pairs…}`.
pub const FIRMWARE_QUERY: u8 = 0x79;

// ============================================================================
// Pin Modes
// ============================================================================

/// Digital input.
pub const MODE_INPUT: u8 = 0x00;
/// Digital output.
pub const MODE_OUTPUT: u8 = 0x01;
/// Analog input.
pub const MODE_ANALOG: u8 = 0x02;
/// Pulse-width modulated output.
pub const MODE_PWM: u8 = 0x03;
/// Servo output.
pub const MODE_SERVO: u8 = 0x04;

// ============================================================================
// Digital Levels
// ============================================================================

/// Logic high.
pub const HIGH: u8 = 0x01;
/// Logic low.
pub const LOW: u8 = 0x00;

// ============================================================================
// I2C Transfer Modes (bits 3..5 of the request mode byte)
// ============================================================================

/// Write to the slave device.
pub const I2C_MODE_WRITE: u8 = 0x00;
/// One-shot read from the slave device.
pub const I2C_MODE_READ: u8 = 0x01;
/// Continuously read and push replies.
pub const I2C_MODE_CONTINUOUS_READ: u8 = 0x02;
/// Stop a continuous read.
pub const I2C_MODE_STOP_READING: u8 = 0x03;

// ============================================================================
// Sentinels
// ============================================================================

/// Terminates one pin's run of capability pairs.
pub const CAPABILITY_PIN_TERMINATOR: u8 = 0x7F;
/// Analog mapping byte meaning "not an analog pin"; also the default channel
/// of a pin before the mapping response arrives.
pub const ANALOG_CHANNEL_NONE: u8 = 0x7F;

//! The in-process mirror of device pin state.

use firmata_protocol::{PinMode, SupportedModes, ANALOG_CHANNEL_NONE};

/// State mirror of one device pin.
///
/// Pins come into existence when a capability response is decoded and are
/// mutated in place by outbound writes and inbound reports after that.
#[derive(Debug, Clone)]
pub struct Pin {
    /// Modes the pin advertised in the capability exchange.
    pub supported_modes: SupportedModes,
    /// Currently configured mode.
    pub mode: PinMode,
    /// Last known value: 0/1 for digital pins, 0..=16383 for analog
    /// channels, mode-specific otherwise.
    pub value: u32,
    /// Device analog channel carrying this pin, or [`ANALOG_CHANNEL_NONE`]
    /// until the mapping response says otherwise.
    pub analog_channel: u8,
}

impl Pin {
    /// A freshly discovered pin: output mode, value zero, no analog channel.
    pub fn new(supported_modes: SupportedModes) -> Self {
        Pin {
            supported_modes,
            mode: PinMode::Output,
            value: 0,
            analog_channel: ANALOG_CHANNEL_NONE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pin_defaults() {
        let modes = [PinMode::Input, PinMode::Output]
            .into_iter()
            .collect::<SupportedModes>();
        let pin = Pin::new(modes);

        assert_eq!(pin.mode, PinMode::Output);
        assert_eq!(pin.value, 0);
        assert_eq!(pin.analog_channel, ANALOG_CHANNEL_NONE);
        assert!(pin.supported_modes.contains(PinMode::Input));
    }
}

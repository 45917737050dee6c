//! The client facade and connection state machine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use firmata_protocol::{
    write_all, Command, Message, MessageReader, PinMode, ReportKind, Transport,
    ANALOG_CHANNEL_NONE,
};
use tracing::{debug, trace, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::events::{
    analog_read_topic, digital_read_topic, pin_state_topic, EventBus, Payload,
    TOPIC_ANALOG_MAPPING_QUERY, TOPIC_CAPABILITY_QUERY, TOPIC_ERROR, TOPIC_FIRMWARE_QUERY,
    TOPIC_I2C_REPLY, TOPIC_PROTOCOL_VERSION, TOPIC_STRING_DATA,
};
use crate::pins::Pin;

/// Handshake progress while [`Client::connect`] runs.
///
/// Each phase waits for one message class and sends the next phase's query
/// when it arrives; unrelated traffic leaves the phase unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandshakePhase {
    /// Version query sent, waiting for the version report.
    AwaitVersion,
    /// Firmware query sent, waiting for the firmware report.
    AwaitFirmware,
    /// Capability query sent, waiting for the capability report.
    AwaitCapabilities,
    /// Mapping query sent, waiting for the analog mapping report.
    AwaitAnalogMapping,
}

/// Everything the client guards with its state lock: the pin table, the
/// analog index, and the connection descriptor.
struct ClientState {
    pins: Vec<Pin>,
    analog_index: Vec<usize>,
    protocol_version: String,
    firmware_name: String,
    config: ClientConfig,
}

impl ClientState {
    /// Emit a command while the state lock is held, keeping outbound bytes
    /// in lock-acquisition order.
    fn write_command(
        &self,
        transport: &dyn Transport,
        command: &Command,
    ) -> Result<(), ClientError> {
        write_all(transport, &command.encode())?;
        Ok(())
    }

    /// Look up a pin for mutation, enforcing the populated-table and range
    /// preconditions.
    fn pin_entry(&mut self, pin: usize) -> Result<&mut Pin, ClientError> {
        let count = self.pins.len();
        if count == 0 {
            return Err(ClientError::NotConnected);
        }
        self.pins
            .get_mut(pin)
            .ok_or(ClientError::PinOutOfRange { pin, count })
    }
}

/// Host-side client for a board speaking the Firmata protocol.
///
/// The client mirrors device pin state, drives the four-phase discovery
/// handshake, and dispatches decoded inbound traffic onto its event bus.
/// Cloning is cheap and every clone shares the same connection.
///
/// All state- or write-touching operations serialize through one state
/// lock, held for the duration of each operation, so outbound bytes appear
/// on the transport in call order and pin mutations are visible before the
/// events they trigger. Inbound frame assembly waits on its own reader
/// lock; the two are never held while blocked on each other.
#[derive(Clone)]
pub struct Client {
    state: Arc<Mutex<ClientState>>,
    /// Serializes inbound frame assembly. Held only while the framing
    /// reader pulls bytes, never together with a blocked state lock, so a
    /// quiet board cannot wedge the command methods.
    reader: Arc<Mutex<MessageReader>>,
    transport: Arc<dyn Transport>,
    events: Arc<EventBus>,
    connected: Arc<AtomicBool>,
}

impl Client {
    /// Create a client over a transport with the default configuration.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Client::with_config(transport, ClientConfig::default())
    }

    /// Create a client with an explicit configuration.
    pub fn with_config(transport: impl Transport + 'static, config: ClientConfig) -> Self {
        let events = Arc::new(EventBus::new());
        for topic in [
            TOPIC_PROTOCOL_VERSION,
            TOPIC_FIRMWARE_QUERY,
            TOPIC_CAPABILITY_QUERY,
            TOPIC_ANALOG_MAPPING_QUERY,
            TOPIC_I2C_REPLY,
            TOPIC_STRING_DATA,
            TOPIC_ERROR,
        ] {
            events.add_topic(topic);
        }

        let reader = MessageReader::new(config.poll_interval());
        Client {
            state: Arc::new(Mutex::new(ClientState {
                pins: Vec::new(),
                analog_index: Vec::new(),
                protocol_version: String::new(),
                firmware_name: String::new(),
                config,
            })),
            reader: Arc::new(Mutex::new(reader)),
            transport: Arc::new(transport),
            events,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // Connection Lifecycle
    // ========================================================================

    /// Whether the handshake has completed and steady-state processing is
    /// running.
    pub fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Drive the four-phase discovery handshake, then start the background
    /// processing loop.
    ///
    /// The handshake discovers the protocol version, the firmware name, the
    /// per-pin capabilities, and the analog channel mapping, in that order,
    /// then enables digital reporting on the configured ports. A transport
    /// failure aborts with [`ClientError::Handshake`] and leaves the client
    /// disconnected. Calling `connect` on a connected client is a no-op.
    pub fn connect(&self) -> Result<(), ClientError> {
        if self.connected() {
            return Ok(());
        }

        self.send_handshake(Command::QueryProtocolVersion)?;
        let mut phase = HandshakePhase::AwaitVersion;

        loop {
            let message = match self.process() {
                Ok(Some(message)) => message,
                Ok(None) => continue,
                Err(ClientError::Transport(err)) => return Err(ClientError::Handshake(err)),
                Err(err) => return Err(err),
            };

            phase = match (phase, &message) {
                (HandshakePhase::AwaitVersion, Message::ProtocolVersion { .. }) => {
                    self.send_handshake(Command::QueryFirmware)?;
                    HandshakePhase::AwaitFirmware
                }
                (HandshakePhase::AwaitFirmware, Message::Firmware { .. }) => {
                    self.send_handshake(Command::QueryCapabilities)?;
                    HandshakePhase::AwaitCapabilities
                }
                (HandshakePhase::AwaitCapabilities, Message::Capability(_)) => {
                    self.send_handshake(Command::QueryAnalogMapping)?;
                    HandshakePhase::AwaitAnalogMapping
                }
                (HandshakePhase::AwaitAnalogMapping, Message::AnalogMapping(_)) => {
                    let ports = self.lock_state().config.report_digital_ports.clone();
                    for port in ports {
                        self.send_handshake(Command::ToggleReporting {
                            kind: ReportKind::Digital,
                            index: port,
                            enabled: true,
                        })?;
                    }
                    self.connected.store(true, Ordering::SeqCst);
                    debug!("handshake complete, starting processing loop");
                    self.spawn_processing_loop();
                    return Ok(());
                }
                (unchanged, _) => unchanged,
            };
        }
    }

    /// Mark the client disconnected and close the transport.
    ///
    /// The background loop observes the close as a read failure and exits
    /// after its current iteration. Idempotent.
    pub fn disconnect(&self) -> Result<(), ClientError> {
        self.connected.store(false, Ordering::SeqCst);
        self.transport.close()?;
        Ok(())
    }

    fn spawn_processing_loop(&self) {
        let client = self.clone();
        thread::spawn(move || client.run_processing_loop());
    }

    fn run_processing_loop(&self) {
        loop {
            if !self.connected() {
                break;
            }
            match self.process() {
                Ok(_) => {}
                Err(err) => {
                    if !self.connected() {
                        // disconnect() closed the transport under us.
                        break;
                    }
                    warn!("processing step failed: {err}");
                    self.events.publish(TOPIC_ERROR, Payload::Error(err.to_string()));
                    if matches!(err, ClientError::Transport(_)) {
                        break;
                    }
                }
            }
        }
        trace!("processing loop stopped");
    }

    // ========================================================================
    // Processing
    // ========================================================================

    /// Run one processing step: read one inbound message, update the pin
    /// table, and publish whatever events it triggers.
    ///
    /// Returns the decoded message, or `None` when a malformed message was
    /// dropped (undecodable frame, out-of-range pin or channel index).
    /// Malformed messages are never fatal; processing continues with the
    /// next frame.
    pub fn process(&self) -> Result<Option<Message>, ClientError> {
        // Frame assembly waits on the board and must not hold the state
        // lock while it does; only decode and apply run under it.
        let frame = {
            let reader = self.reader.lock().unwrap_or_else(PoisonError::into_inner);
            reader.read_frame(self.transport.as_ref())?
        };

        let mut state = self.lock_state();
        let message = match Message::decode(&frame) {
            Ok(message) => message,
            Err(err) => {
                trace!("dropping undecodable frame: {err}");
                return Ok(None);
            }
        };

        if self.apply(&mut state, &message) {
            Ok(Some(message))
        } else {
            Ok(None)
        }
    }

    /// Apply one decoded message to the pin table and publish its events.
    /// Returns false when the message violates a structural invariant and
    /// was dropped.
    fn apply(&self, state: &mut ClientState, message: &Message) -> bool {
        match message {
            Message::ProtocolVersion { major, minor } => {
                state.protocol_version = format!("{major}.{minor}");
                self.events.publish(
                    TOPIC_PROTOCOL_VERSION,
                    Payload::Text(state.protocol_version.clone()),
                );
            }

            Message::Analog { channel, value } => {
                let Some(&pin) = state.analog_index.get(*channel as usize) else {
                    warn!("dropping analog message for unmapped channel {channel}");
                    return false;
                };
                if let Some(entry) = state.pins.get_mut(pin) {
                    entry.value = u32::from(*value);
                }
                self.events.publish(
                    &analog_read_topic(*channel as usize),
                    Payload::Bytes(u32::from(*value).to_be_bytes().to_vec()),
                );
            }

            Message::Digital { port, mask } => {
                let base = 8 * usize::from(*port);
                if base >= state.pins.len() {
                    warn!("dropping digital message for port {port} beyond the pin table");
                    return false;
                }
                for bit in 0..8 {
                    let index = base + bit;
                    let Some(pin) = state.pins.get_mut(index) else {
                        break;
                    };
                    if pin.mode != PinMode::Input {
                        continue;
                    }
                    pin.value = u32::from((mask >> bit) & 1);
                    let level = pin.value as u8;
                    self.events
                        .publish(&digital_read_topic(index), Payload::Bytes(vec![level]));
                }
            }

            Message::Capability(pin_modes) => {
                state.pins = pin_modes.iter().map(|modes| Pin::new(*modes)).collect();
                state.analog_index.clear();
                for index in 0..state.pins.len() {
                    self.events.add_topic(&digital_read_topic(index));
                    self.events.add_topic(&pin_state_topic(index));
                }
                debug!("pin table rebuilt with {} pins", state.pins.len());
                self.events.publish(TOPIC_CAPABILITY_QUERY, Payload::Empty);
            }

            Message::AnalogMapping(channels) => {
                state.analog_index.clear();
                for (index, &channel) in channels.iter().enumerate() {
                    let Some(pin) = state.pins.get_mut(index) else {
                        warn!("analog mapping names more pins than the table holds");
                        break;
                    };
                    pin.analog_channel = channel;
                    if channel != ANALOG_CHANNEL_NONE {
                        state.analog_index.push(index);
                    }
                    self.events.add_topic(&analog_read_topic(index));
                }
                debug!("analog index rebuilt: {:?}", state.analog_index);
                self.events
                    .publish(TOPIC_ANALOG_MAPPING_QUERY, Payload::Empty);
            }

            Message::PinState { pin, mode, value } => {
                let index = usize::from(*pin);
                let Some(entry) = state.pins.get_mut(index) else {
                    warn!("dropping pin state for pin {pin} beyond the pin table");
                    return false;
                };
                entry.mode = *mode;
                entry.value = *value;
                self.events.publish(
                    &pin_state_topic(index),
                    Payload::PinState {
                        pin: index,
                        mode: mode.to_byte(),
                        value: *value,
                    },
                );
            }

            Message::I2cReply(reply) => {
                self.events
                    .publish(TOPIC_I2C_REPLY, Payload::I2cReply(reply.clone()));
            }

            Message::Firmware { name, .. } => {
                state.firmware_name = name.clone();
                self.events
                    .publish(TOPIC_FIRMWARE_QUERY, Payload::Text(name.clone()));
            }

            Message::StringText(text) => {
                self.events
                    .publish(TOPIC_STRING_DATA, Payload::Text(text.clone()));
            }

            Message::UnknownSysEx { command } => {
                trace!("ignoring sysex command 0x{command:02X}");
            }
        }
        true
    }

    // ========================================================================
    // Outbound Commands
    // ========================================================================

    /// Configure a pin's mode and record it in the pin table.
    pub fn set_pin_mode(&self, pin: usize, mode: PinMode) -> Result<(), ClientError> {
        let mut state = self.lock_state();
        state.pin_entry(pin)?.mode = mode;
        state.write_command(
            self.transport.as_ref(),
            &Command::SetPinMode {
                pin: pin as u8,
                mode,
            },
        )
    }

    /// Drive a digital pin high (non-zero) or low.
    ///
    /// The whole 8-pin port the pin belongs to is re-emitted, with the mask
    /// recomputed from the pin table including this write.
    pub fn digital_write(&self, pin: usize, level: u8) -> Result<(), ClientError> {
        let mut state = self.lock_state();
        state.pin_entry(pin)?.value = u32::from(level);

        let port = pin / 8;
        let mut mask = 0u8;
        for bit in 0..8 {
            if state
                .pins
                .get(8 * port + bit)
                .is_some_and(|p| p.value != 0)
            {
                mask |= 1 << bit;
            }
        }
        state.write_command(
            self.transport.as_ref(),
            &Command::DigitalWrite {
                port: port as u8,
                mask,
            },
        )
    }

    /// Write an analog (PWM/servo) value to a pin.
    ///
    /// Only pins 0..16 are addressable: the status byte carries a four-bit
    /// channel field and larger pin numbers silently alias into it, exactly
    /// as on the wire.
    pub fn analog_write(&self, pin: usize, value: u16) -> Result<(), ClientError> {
        let mut state = self.lock_state();
        state.pin_entry(pin)?.value = u32::from(value);
        state.write_command(
            self.transport.as_ref(),
            &Command::AnalogWrite {
                pin: pin as u8,
                value,
            },
        )
    }

    /// Enable or disable reporting for a digital port or analog channel.
    pub fn toggle_pin_reporting(
        &self,
        index: usize,
        enabled: bool,
        kind: ReportKind,
    ) -> Result<(), ClientError> {
        self.send_command(&Command::ToggleReporting {
            kind,
            index: index as u8,
            enabled,
        })
    }

    /// Ask the board for a protocol version report.
    pub fn query_protocol_version(&self) -> Result<(), ClientError> {
        self.send_command(&Command::QueryProtocolVersion)
    }

    /// Ask the board for its firmware name and version.
    pub fn query_firmware(&self) -> Result<(), ClientError> {
        self.send_command(&Command::QueryFirmware)
    }

    /// Ask the board for its per-pin capabilities.
    pub fn query_capabilities(&self) -> Result<(), ClientError> {
        self.send_command(&Command::QueryCapabilities)
    }

    /// Ask the board for its analog channel mapping.
    pub fn query_analog_mapping(&self) -> Result<(), ClientError> {
        self.send_command(&Command::QueryAnalogMapping)
    }

    /// Ask the board for the state of one pin.
    pub fn query_pin_state(&self, pin: usize) -> Result<(), ClientError> {
        self.send_command(&Command::QueryPinState { pin: pin as u8 })
    }

    /// Request an I2C read of `count` bytes from a slave.
    pub fn i2c_read_request(&self, address: u8, count: u16) -> Result<(), ClientError> {
        self.send_command(&Command::I2cRead { address, count })
    }

    /// Request an I2C write to a slave.
    pub fn i2c_write_request(&self, address: u8, data: &[u8]) -> Result<(), ClientError> {
        self.send_command(&Command::I2cWrite {
            address,
            data: data.to_vec(),
        })
    }

    /// Configure the I2C subsystem (typically the sampling delay).
    pub fn i2c_config(&self, data: &[u16]) -> Result<(), ClientError> {
        self.send_command(&Command::I2cConfig {
            data: data.to_vec(),
        })
    }

    /// Reset the board.
    pub fn reset(&self) -> Result<(), ClientError> {
        self.send_command(&Command::SystemReset)
    }

    fn send_command(&self, command: &Command) -> Result<(), ClientError> {
        let state = self.lock_state();
        state.write_command(self.transport.as_ref(), command)
    }

    fn send_handshake(&self, command: Command) -> Result<(), ClientError> {
        self.send_command(&command).map_err(|err| match err {
            ClientError::Transport(transport) => ClientError::Handshake(transport),
            other => other,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Snapshot of one pin, if the board has it.
    pub fn pin(&self, pin: usize) -> Option<Pin> {
        self.lock_state().pins.get(pin).cloned()
    }

    /// Number of pins the board reported.
    pub fn pin_count(&self) -> usize {
        self.lock_state().pins.len()
    }

    /// Snapshot of the analog index: device channel number to pin number.
    pub fn analog_index(&self) -> Vec<usize> {
        self.lock_state().analog_index.clone()
    }

    /// The discovered protocol version, empty before the handshake.
    pub fn protocol_version(&self) -> String {
        self.lock_state().protocol_version.clone()
    }

    /// The discovered firmware name, empty before the handshake.
    pub fn firmware_name(&self) -> String {
        self.lock_state().firmware_name.clone()
    }

    /// The event bus inbound traffic is published on.
    pub fn events(&self) -> Arc<EventBus> {
        self.events.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::loopback;

    #[test]
    fn test_starts_disconnected() {
        let (host, _device) = loopback();
        let client = Client::new(host);
        assert!(!client.connected());
        assert_eq!(client.pin_count(), 0);
        assert_eq!(client.protocol_version(), "");
        assert_eq!(client.firmware_name(), "");
    }

    #[test]
    fn test_pin_operations_need_a_pin_table() {
        let (host, _device) = loopback();
        let client = Client::new(host);

        assert!(matches!(
            client.set_pin_mode(0, PinMode::Output),
            Err(ClientError::NotConnected)
        ));
        assert!(matches!(
            client.digital_write(0, 1),
            Err(ClientError::NotConnected)
        ));
        assert!(matches!(
            client.analog_write(0, 128),
            Err(ClientError::NotConnected)
        ));
    }

    #[test]
    fn test_fixed_topics_registered_at_construction() {
        let (host, _device) = loopback();
        let client = Client::new(host);
        let events = client.events();

        for topic in [
            "ProtocolVersion",
            "FirmwareQuery",
            "CapabilityQuery",
            "AnalogMappingQuery",
            "I2cReply",
            "StringData",
            "Error",
        ] {
            assert!(events.has_topic(topic), "missing topic {topic}");
        }
    }
}

//! Named-topic event bus.
//!
//! The client publishes every decoded inbound message on a named topic;
//! external code observes the board by subscribing. Handlers run on the
//! publishing thread and must not call back into the client, which holds
//! its state lock while publishing.

use std::collections::HashMap;
use std::sync::Mutex;

use firmata_protocol::I2cReply;

// ============================================================================
// Topic Names
// ============================================================================

/// Protocol version discovered; payload [`Payload::Text`] `"major.minor"`.
pub const TOPIC_PROTOCOL_VERSION: &str = "ProtocolVersion";
/// Firmware name discovered; payload [`Payload::Text`].
pub const TOPIC_FIRMWARE_QUERY: &str = "FirmwareQuery";
/// Pin table rebuilt from a capability response; payload [`Payload::Empty`].
pub const TOPIC_CAPABILITY_QUERY: &str = "CapabilityQuery";
/// Analog index rebuilt from a mapping response; payload [`Payload::Empty`].
pub const TOPIC_ANALOG_MAPPING_QUERY: &str = "AnalogMappingQuery";
/// I2C read result; payload [`Payload::I2cReply`].
pub const TOPIC_I2C_REPLY: &str = "I2cReply";
/// Text pushed by the board; payload [`Payload::Text`].
pub const TOPIC_STRING_DATA: &str = "StringData";
/// Errors from the background processing loop; payload [`Payload::Error`].
pub const TOPIC_ERROR: &str = "Error";

/// Topic for digital readings of one pin; payload [`Payload::Bytes`] with a
/// single 0/1 byte.
pub fn digital_read_topic(pin: usize) -> String {
    format!("DigitalRead{pin}")
}

/// Topic for analog readings of one channel; payload [`Payload::Bytes`]
/// with the value as four big-endian bytes.
pub fn analog_read_topic(channel: usize) -> String {
    format!("AnalogRead{channel}")
}

/// Topic for state reports of one pin; payload [`Payload::PinState`].
pub fn pin_state_topic(pin: usize) -> String {
    format!("Pin{pin}State")
}

// ============================================================================
// Payloads
// ============================================================================

/// What a publish carries to its subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Nothing beyond the fact that the event fired.
    Empty,
    /// Raw bytes (digital and analog readings).
    Bytes(Vec<u8>),
    /// Text (protocol version, firmware name, string data).
    Text(String),
    /// A pin state report.
    PinState {
        /// Pin number.
        pin: usize,
        /// Mode byte the board reported.
        mode: u8,
        /// Assembled value.
        value: u32,
    },
    /// An I2C read result.
    I2cReply(I2cReply),
    /// An error description from the background loop.
    Error(String),
}

// ============================================================================
// Bus
// ============================================================================

type Handler = Box<dyn Fn(&Payload) + Send>;
type OnceHandler = Box<dyn FnOnce(&Payload) + Send>;

#[derive(Default)]
struct Topic {
    handlers: Vec<Handler>,
    once: Vec<OnceHandler>,
}

/// A synchronous publish/subscribe registry keyed by topic name.
///
/// Topics come into existence on first use, whether that is an explicit
/// [`add_topic`](EventBus::add_topic), a subscription, or a publish.
#[derive(Default)]
pub struct EventBus {
    topics: Mutex<HashMap<String, Topic>>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        EventBus::default()
    }

    /// Register a topic. Idempotent.
    pub fn add_topic(&self, name: &str) {
        if let Ok(mut topics) = self.topics.lock() {
            topics.entry(name.to_string()).or_default();
        }
    }

    /// Whether a topic has been registered.
    pub fn has_topic(&self, name: &str) -> bool {
        self.topics
            .lock()
            .map(|topics| topics.contains_key(name))
            .unwrap_or(false)
    }

    /// Snapshot of the registered topic names.
    pub fn topics(&self) -> Vec<String> {
        self.topics
            .lock()
            .map(|topics| topics.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Register a persistent handler for a topic.
    pub fn subscribe<F>(&self, topic: &str, handler: F)
    where
        F: Fn(&Payload) + Send + 'static,
    {
        if let Ok(mut topics) = self.topics.lock() {
            topics
                .entry(topic.to_string())
                .or_default()
                .handlers
                .push(Box::new(handler));
        }
    }

    /// Register a handler fired exactly once, on the next publish to the
    /// topic.
    pub fn subscribe_once<F>(&self, topic: &str, handler: F)
    where
        F: FnOnce(&Payload) + Send + 'static,
    {
        if let Ok(mut topics) = self.topics.lock() {
            topics
                .entry(topic.to_string())
                .or_default()
                .once
                .push(Box::new(handler));
        }
    }

    /// Deliver a payload to every current subscriber of a topic.
    ///
    /// One-shot handlers are drained in registration order after the
    /// persistent ones. Handlers run on the calling thread, outside the
    /// registry lock, so a handler may subscribe without deadlocking.
    pub fn publish(&self, topic: &str, payload: Payload) {
        let (handlers, once) = {
            let Ok(mut topics) = self.topics.lock() else {
                return;
            };
            let entry = topics.entry(topic.to_string()).or_default();
            (
                std::mem::take(&mut entry.handlers),
                std::mem::take(&mut entry.once),
            )
        };

        for handler in &handlers {
            handler(&payload);
        }
        for handler in once {
            handler(&payload);
        }

        // Put the persistent handlers back, ahead of any that were
        // registered during delivery.
        if let Ok(mut topics) = self.topics.lock() {
            let entry = topics.entry(topic.to_string()).or_default();
            let mut restored = handlers;
            restored.append(&mut entry.handlers);
            entry.handlers = restored;
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("topics", &self.topics())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_subscribe_receives_every_publish() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        let seen = count.clone();
        bus.subscribe("topic", move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish("topic", Payload::Empty);
        bus.publish("topic", Payload::Empty);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_subscribe_once_fires_exactly_once() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        let seen = count.clone();
        bus.subscribe_once("topic", move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish("topic", Payload::Empty);
        bus.publish("topic", Payload::Empty);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_topics_created_on_demand() {
        let bus = EventBus::new();
        assert!(!bus.has_topic("late"));

        bus.publish("late", Payload::Empty);
        assert!(bus.has_topic("late"));

        bus.add_topic("explicit");
        assert!(bus.has_topic("explicit"));
    }

    #[test]
    fn test_publish_carries_payload() {
        let bus = EventBus::new();
        let (tx, rx) = crossbeam_channel::unbounded();

        bus.subscribe("readings", move |payload| {
            let _ = tx.send(payload.clone());
        });

        bus.publish("readings", Payload::Bytes(vec![0x01]));
        assert_eq!(rx.try_recv().unwrap(), Payload::Bytes(vec![0x01]));
    }

    #[test]
    fn test_handler_may_subscribe_during_delivery() {
        let bus = Arc::new(EventBus::new());
        let count = Arc::new(AtomicUsize::new(0));

        let inner_bus = bus.clone();
        let inner_count = count.clone();
        bus.subscribe_once("topic", move |_| {
            let seen = inner_count.clone();
            inner_bus.subscribe("topic", move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            });
        });

        bus.publish("topic", Payload::Empty);
        assert_eq!(count.load(Ordering::SeqCst), 0);

        bus.publish("topic", Payload::Empty);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}

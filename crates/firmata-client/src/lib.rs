//! Firmata Board Client
//!
//! This crate provides a host-side client for boards running Firmata-style
//! firmware over any bidirectional byte stream. It keeps an in-process
//! mirror of device pin state, drives the discovery handshake, and pushes
//! decoded inbound traffic onto a named-topic event bus.
//!
//! # Architecture
//!
//! ```text
//! board ⇄ Transport ⇄ framing reader ⇄ Client ⇄ EventBus ⇄ subscribers
//! ```
//!
//! [`Client::connect`] walks a four-phase handshake (protocol version,
//! firmware identity, pin capabilities, analog channel mapping) and then
//! spawns a background thread that decodes one message per iteration.
//! Outbound command methods may be called from any thread; everything
//! serializes through one internal lock.
//!
//! # Example
//!
//! ```rust,ignore
//! use firmata_client::{Client, TcpTransport};
//! use firmata_protocol::PinMode;
//!
//! let client = Client::new(TcpTransport::connect("127.0.0.1:3030")?);
//! client.connect()?;
//!
//! client.set_pin_mode(13, PinMode::Output)?;
//! client.digital_write(13, 1)?;
//!
//! client.events().subscribe("AnalogRead0", |payload| {
//!     println!("reading: {payload:?}");
//! });
//! ```

mod client;
mod config;
mod error;
mod events;
mod pins;
mod transport;

pub use client::*;
pub use config::*;
pub use error::*;
pub use events::*;
pub use pins::*;
pub use transport::*;

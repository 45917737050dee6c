//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a [`Client`](crate::Client).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backoff between transient short reads, in milliseconds.
    pub poll_interval_ms: u64,
    /// Digital ports whose reporting is enabled once the handshake
    /// completes.
    pub report_digital_ports: Vec<u8>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            poll_interval_ms: 5,
            report_digital_ports: vec![0, 1],
        }
    }
}

impl ClientConfig {
    /// The poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(5));
        assert_eq!(config.report_digital_ports, vec![0, 1]);
    }
}

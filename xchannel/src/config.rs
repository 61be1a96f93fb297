//! Channel configuration.

use std::time::Duration;

use crate::DEFAULT_MAX_MESSAGE_SIZE;
use crate::wire::MAX_PAYLOAD_SIZE;

/// Channel configuration.
#[derive(Debug, Clone, Copy)]
pub struct ChannelConfig {
    /// Largest encoded message accepted in either direction.
    pub max_message_size: usize,
    /// Connect timeout; `None` blocks until the OS gives up.
    pub connect_timeout: Option<Duration>,
    /// Disable Nagle's algorithm on the socket.
    pub nodelay: bool,
}

impl ChannelConfig {
    /// Creates a configuration with the default values.
    pub fn new() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            connect_timeout: None,
            nodelay: true,
        }
    }

    /// Sets the maximum encoded message size.
    ///
    /// Capped at [`MAX_PAYLOAD_SIZE`], the largest length a packet header
    /// can carry.
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size.min(MAX_PAYLOAD_SIZE);
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Enables or disables TCP_NODELAY.
    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ChannelConfig::default();
        assert_eq!(config.max_message_size, DEFAULT_MAX_MESSAGE_SIZE);
        assert_eq!(config.connect_timeout, None);
        assert!(config.nodelay);
    }

    #[test]
    fn test_max_message_size_fits_wire_length() {
        let config = ChannelConfig::new().with_max_message_size(usize::MAX);
        assert_eq!(config.max_message_size, u32::MAX as usize);

        let config = config.with_max_message_size(1024);
        assert_eq!(config.max_message_size, 1024);
    }
}

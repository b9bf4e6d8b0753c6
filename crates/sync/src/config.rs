//! Channel configuration.

use crate::reconnect::ReconnectConfig;

/// Where to connect and how to reconnect.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    /// Push endpoint, e.g. `ws://localhost:5000/ws`.
    pub url: String,
    pub reconnect: ReconnectConfig,
}

impl ChannelConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect: ReconnectConfig::default(),
        }
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }
}

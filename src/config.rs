//! Link configuration
//!
//! Channel choice is an operator input; both peers must be built with the
//! same channel. Nothing here is persisted across boots.
use std::time::Duration;

use crate::contracts::Channel;
use crate::errors::Result;

/// Validated settings for one peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    channel: Channel,
    poll_interval: Duration,
}

impl LinkConfig {
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Delay between discovery checks while unpaired
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            channel: Channel::default(),
            poll_interval: Duration::from_millis(crate::PAIRING_POLL_INTERVAL_MS),
        }
    }
}

/// LinkBuilder - fluent interface for link configuration
pub struct LinkBuilder {
    channel: u8,
    poll_interval_ms: u64,
}

impl LinkBuilder {
    /// Create a new LinkBuilder with defaults (channel 1, 500 ms polling)
    pub fn new() -> Self {
        Self {
            channel: Channel::MIN,
            poll_interval_ms: crate::PAIRING_POLL_INTERVAL_MS,
        }
    }

    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_poll_interval_ms(mut self, interval_ms: u64) -> Self {
        self.poll_interval_ms = interval_ms;
        self
    }

    pub fn get_channel(&self) -> u8 {
        self.channel
    }

    pub fn get_poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms
    }

    /// Validate and produce the configuration
    ///
    /// # Errors
    /// `InvalidChannel` when the channel is outside 1..=14
    pub fn build(&self) -> Result<LinkConfig> {
        Ok(LinkConfig {
            channel: Channel::new(self.channel)?,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        })
    }
}

impl Default for LinkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BugCommError;

    #[test]
    fn test_link_builder() {
        let builder = LinkBuilder::new()
            .with_channel(5)
            .with_poll_interval_ms(20);

        assert_eq!(builder.get_channel(), 5);
        assert_eq!(builder.get_poll_interval_ms(), 20);

        let config = builder.build().unwrap();
        assert_eq!(config.channel().get(), 5);
        assert_eq!(config.poll_interval(), Duration::from_millis(20));
    }

    #[test]
    fn test_defaults_match_builder() {
        assert_eq!(LinkBuilder::default().build().unwrap(), LinkConfig::default());
        assert_eq!(
            LinkConfig::default().poll_interval(),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn test_invalid_channel_rejected() {
        let result = LinkBuilder::new().with_channel(0).build();
        assert_eq!(result, Err(BugCommError::InvalidChannel(0)));
        assert!(LinkBuilder::new().with_channel(15).build().is_err());
    }
}

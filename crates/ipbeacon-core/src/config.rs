//! Configuration types for ipbeacon
//!
//! The check interval is a constant. `PollerConfig::interval` only exists so
//! tests can run the loop without waiting an hour.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Interval between external IP checks
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Public endpoint that echoes the caller's IP as plain text
pub const DEFAULT_IP_CHECK_URL: &str = "https://api.ipify.org";

/// Poller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Target channel for the status message and announcements
    pub channel_id: String,

    /// Delay between cycles
    #[serde(default = "default_interval", with = "duration_secs")]
    pub interval: Duration,

    /// Capacity of the poller event channel
    ///
    /// When full, new events are dropped with a warning log.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl PollerConfig {
    /// Create a configuration for `channel_id` with the default interval
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            interval: default_interval(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    /// Override the interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.channel_id.trim().is_empty() {
            return Err(crate::Error::config("Channel ID cannot be empty"));
        }
        if self.interval.is_zero() {
            return Err(crate::Error::config("Check interval must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

fn default_interval() -> Duration {
    DEFAULT_CHECK_INTERVAL
}

fn default_event_channel_capacity() -> usize {
    100
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

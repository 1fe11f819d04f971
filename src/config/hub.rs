//! Hub and connection pump configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Room sizing, backpressure and keepalive settings
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Maximum members per room
    #[serde(default = "default_room_capacity")]
    pub room_capacity: usize,

    /// Messages buffered per client before it is evicted
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,

    /// Seconds to wait for a pong before dropping the connection
    #[serde(default = "default_pong_wait")]
    pub pong_wait_secs: u64,

    /// Seconds allowed for one write burst
    #[serde(default = "default_write_wait")]
    pub write_wait_secs: u64,

    /// Largest inbound frame accepted, in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

impl HubConfig {
    pub fn pong_wait(&self) -> Duration {
        Duration::from_secs(self.pong_wait_secs)
    }

    pub fn write_wait(&self) -> Duration {
        Duration::from_secs(self.write_wait_secs)
    }

    /// Keepalive ping interval: nine tenths of the pong wait, so a ping is
    /// always in flight before the read deadline expires.
    pub fn ping_period(&self) -> Duration {
        self.pong_wait() * 9 / 10
    }

    /// Validate hub configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.room_capacity == 0 {
            return Err(ValidationError::InvalidRoomCapacity);
        }
        if self.outbound_queue_capacity == 0 {
            return Err(ValidationError::InvalidQueueCapacity);
        }
        if self.pong_wait_secs == 0 {
            return Err(ValidationError::InvalidPongWait);
        }
        if self.write_wait_secs == 0 {
            return Err(ValidationError::InvalidWriteWait);
        }
        if self.max_message_size == 0 {
            return Err(ValidationError::InvalidMessageSize);
        }
        Ok(())
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            room_capacity: default_room_capacity(),
            outbound_queue_capacity: default_outbound_queue_capacity(),
            pong_wait_secs: default_pong_wait(),
            write_wait_secs: default_write_wait(),
            max_message_size: default_max_message_size(),
        }
    }
}

fn default_room_capacity() -> usize {
    4
}

fn default_outbound_queue_capacity() -> usize {
    256
}

fn default_pong_wait() -> u64 {
    60
}

fn default_write_wait() -> u64 {
    10
}

fn default_max_message_size() -> usize {
    4096
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_config_defaults() {
        let config = HubConfig::default();
        assert_eq!(config.room_capacity, 4);
        assert_eq!(config.outbound_queue_capacity, 256);
        assert_eq!(config.pong_wait(), Duration::from_secs(60));
        assert_eq!(config.write_wait(), Duration::from_secs(10));
        assert_eq!(config.max_message_size, 4096);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ping_period_is_shorter_than_pong_wait() {
        let config = HubConfig::default();
        assert_eq!(config.ping_period(), Duration::from_secs(54));

        let config = HubConfig {
            pong_wait_secs: 1,
            ..Default::default()
        };
        assert_eq!(config.ping_period(), Duration::from_millis(900));
    }

    #[test]
    fn test_zero_values_are_rejected() {
        let cases = [
            HubConfig {
                room_capacity: 0,
                ..Default::default()
            },
            HubConfig {
                outbound_queue_capacity: 0,
                ..Default::default()
            },
            HubConfig {
                pong_wait_secs: 0,
                ..Default::default()
            },
            HubConfig {
                write_wait_secs: 0,
                ..Default::default()
            },
            HubConfig {
                max_message_size: 0,
                ..Default::default()
            },
        ];
        for config in cases {
            assert!(config.validate().is_err(), "{:?} should be invalid", config);
        }
    }
}

/*!
 * Sensor Configuration
 * Environment-driven settings with defaults from `core::limits`
 *
 * Environment variables:
 * - SENSOR_ID: Sensor identity stamped on every event (default: random UUID)
 * - SENSOR_CHANNEL_BUFFER_LENGTH: Joiner output buffer length (default: 1024)
 * - SENSOR_TICKER_INTERVAL_MS: Ticker subscription interval (default: 1000)
 */

use crate::core::errors::{ConfigError, ConfigResult};
use crate::core::limits::{DEFAULT_CHANNEL_BUFFER_LENGTH, DEFAULT_TICKER_INTERVAL};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

pub const ENV_SENSOR_ID: &str = "SENSOR_ID";
pub const ENV_CHANNEL_BUFFER_LENGTH: &str = "SENSOR_CHANNEL_BUFFER_LENGTH";
pub const ENV_TICKER_INTERVAL_MS: &str = "SENSOR_TICKER_INTERVAL_MS";

/// Runtime configuration for a sensor and the joiners it creates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub sensor_id: String,
    pub channel_buffer_length: usize,
    #[serde(with = "duration_ms")]
    pub ticker_interval: Duration,
}

impl SensorConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(id) = lookup(ENV_SENSOR_ID) {
            let id = id.trim();
            if id.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: ENV_SENSOR_ID,
                    value: id.to_string(),
                    reason: "must not be empty".into(),
                });
            }
            config.sensor_id = id.to_string();
        }

        if let Some(raw) = lookup(ENV_CHANNEL_BUFFER_LENGTH) {
            config.channel_buffer_length = parse_number(ENV_CHANNEL_BUFFER_LENGTH, &raw)?;
        }

        if let Some(raw) = lookup(ENV_TICKER_INTERVAL_MS) {
            let millis: u64 = parse_number(ENV_TICKER_INTERVAL_MS, &raw)?;
            if millis == 0 {
                return Err(ConfigError::ZeroInterval {
                    key: ENV_TICKER_INTERVAL_MS,
                });
            }
            config.ticker_interval = Duration::from_millis(millis);
        }

        Ok(config)
    }

    pub fn with_sensor_id(mut self, sensor_id: impl Into<String>) -> Self {
        self.sensor_id = sensor_id.into();
        self
    }

    pub fn with_channel_buffer_length(mut self, length: usize) -> Self {
        self.channel_buffer_length = length;
        self
    }

    pub fn with_ticker_interval(mut self, interval: Duration) -> Self {
        self.ticker_interval = interval;
        self
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            sensor_id: Uuid::new_v4().to_string(),
            channel_buffer_length: DEFAULT_CHANNEL_BUFFER_LENGTH,
            ticker_interval: DEFAULT_TICKER_INTERVAL,
        }
    }
}

fn parse_number<N>(key: &'static str, raw: &str) -> ConfigResult<N>
where
    N: std::str::FromStr,
    N::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<N>()
        .map_err(|e| ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

/// Serde adapter storing a `Duration` as whole milliseconds
pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

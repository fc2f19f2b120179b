/*!
 * Sensor Events
 * The envelope every sensor source stamps onto its payloads
 */

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// One telemetry event as emitted by a sensor source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event id
    pub id: String,
    /// Identity of the sensor that produced the event
    pub sensor_id: String,
    /// Per-sensor sequence number, strictly increasing
    pub sequence_number: u64,
    /// Nanoseconds since the sensor started (monotonic)
    pub monotime_ns: u64,
    pub payload: Payload,
}

/// Event payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    Ticker(TickerEvent),
}

/// Wall-clock time of one ticker tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerEvent {
    /// Whole seconds since the Unix epoch
    pub seconds: i64,
    /// Nanoseconds since the Unix epoch
    pub nanoseconds: i64,
}

impl From<SystemTime> for TickerEvent {
    fn from(tick: SystemTime) -> Self {
        let since_epoch = tick.duration_since(UNIX_EPOCH).unwrap_or_default();
        Self {
            seconds: since_epoch.as_secs() as i64,
            nanoseconds: since_epoch.as_nanos() as i64,
        }
    }
}

/*!
 * Telemetry Sensor Library
 * Event streams, dynamic fan-in and the sensor sources built on them
 */

pub mod core;
pub mod monitoring;
pub mod sensor;
pub mod stream;

// Re-exports
pub use crate::core::{
    ConfigError, SensorConfig, StreamError, StreamId, SubscriptionError,
};
pub use monitoring::{init_tracing, span_operation};
pub use sensor::{Event, Payload, Sensor, Session, Subscription, TickerEvent, TimerSource};
pub use stream::{EventStream, Joiner, JoinerHandle, JoinerStats, StreamProducer, Ticker};

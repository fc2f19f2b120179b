/*!
 * Sensor
 * Event stamping and subscription entry point
 *
 * Each call to `subscribe` creates a new session: its own sources joined
 * into its own output stream.
 */

mod events;
mod subscription;
mod timer_source;

pub use events::{Event, Payload, TickerEvent};
pub use subscription::{Session, Subscription, TickerEventFilter};
pub use timer_source::TimerSource;

use crate::core::config::SensorConfig;
use crate::core::errors::SubscriptionResult;
use crate::core::id::SequenceGenerator;
use std::sync::Arc;
use tokio::time::Instant;
use uuid::Uuid;

#[derive(Debug)]
pub struct Sensor {
    config: SensorConfig,
    started: Instant,
    sequence: SequenceGenerator,
}

impl Sensor {
    pub fn new(config: SensorConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            started: Instant::now(),
            sequence: SequenceGenerator::default(),
        })
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.config.sensor_id
    }

    #[inline]
    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Wrap `payload` in a freshly stamped event
    pub fn new_event(&self, payload: Payload) -> Event {
        Event {
            id: Uuid::new_v4().to_string(),
            sensor_id: self.config.sensor_id.clone(),
            sequence_number: self.sequence.next(),
            monotime_ns: self.started.elapsed().as_nanos() as u64,
            payload,
        }
    }

    /// Start a session serving `subscription`
    pub async fn subscribe(
        self: &Arc<Self>,
        subscription: &Subscription,
    ) -> SubscriptionResult<Session> {
        Session::start(self, subscription).await
    }
}

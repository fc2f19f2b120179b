/*!
 * Timer Source
 * Leaf producer turning ticker ticks into sensor events
 */

use super::events::{Payload, TickerEvent};
use super::{Event, Sensor};
use crate::core::limits::SOURCE_CHANNEL_CAPACITY;
use crate::stream::{EventStream, Ticker};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct TimerSource;

impl TimerSource {
    /// Spawn a source emitting one ticker event per `interval`
    ///
    /// Closing the returned stream's control stops the inner ticker and then
    /// closes the data channel. If the ticker ends on its own, so does the
    /// source.
    ///
    /// # Panics
    ///
    /// Panics if `interval` is zero or if called outside a tokio runtime.
    pub fn spawn(sensor: Arc<Sensor>, interval: Duration) -> EventStream<Event> {
        let mut ticks = Ticker::spawn(interval);
        let (mut producer, stream) = EventStream::channel(SOURCE_CHANNEL_CAPACITY);
        let id = stream.id();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = producer.closed() => break,
                    tick = ticks.recv() => {
                        let Some(tick) = tick else {
                            break;
                        };
                        let event = sensor.new_event(Payload::Ticker(TickerEvent::from(tick)));
                        if producer.send(event).await.is_err() {
                            break;
                        }
                    }
                }
            }

            ticks.close_control();
            debug!(
                stream_id = %id,
                interval_ms = interval.as_millis() as u64,
                "timer source stopped"
            );
        });

        stream
    }
}

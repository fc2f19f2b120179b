/*!
 * Ticker Stream
 * Periodic wall-clock ticks over the stream contract
 *
 * Tick timing is whatever `tokio::time::interval` provides; missed ticks are
 * skipped rather than burst.
 */

use super::channel::EventStream;
use crate::core::limits::SOURCE_CHANNEL_CAPACITY;
use std::time::{Duration, SystemTime};
use tokio::time::MissedTickBehavior;
use tracing::trace;

pub struct Ticker;

impl Ticker {
    /// Spawn a task sending the current time on every tick of `period`
    ///
    /// The first tick fires immediately. The task exits, closing the stream's
    /// data channel, once control is closed or the reader is gone.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero or if called outside a tokio runtime.
    pub fn spawn(period: Duration) -> EventStream<SystemTime> {
        assert!(!period.is_zero(), "ticker period must be non-zero");

        let (mut producer, stream) = EventStream::channel(SOURCE_CHANNEL_CAPACITY);
        let id = stream.id();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = producer.closed() => break,
                    _ = interval.tick() => {
                        if producer.send(SystemTime::now()).await.is_err() {
                            break;
                        }
                    }
                }
            }

            trace!(stream_id = %id, period_ms = period.as_millis() as u64, "ticker stopped");
        });

        stream
    }
}

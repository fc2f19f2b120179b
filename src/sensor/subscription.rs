/*!
 * Subscriptions
 * Event selections and the joined session serving them
 */

use super::{Event, Sensor, TimerSource};
use crate::core::config::duration_ms;
use crate::core::errors::{SubscriptionError, SubscriptionResult};
use crate::core::id::StreamId;
use crate::stream::{EventStream, Joiner, JoinerHandle};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Ticker events at a fixed interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerEventFilter {
    #[serde(with = "duration_ms")]
    pub interval: Duration,
}

/// The events a consumer wants
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(default)]
    pub ticker_events: Vec<TickerEventFilter>,
}

impl Subscription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ticker(mut self, interval: Duration) -> Self {
        self.ticker_events.push(TickerEventFilter { interval });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ticker_events.is_empty()
    }

    pub fn validate(&self) -> SubscriptionResult<()> {
        if self.is_empty() {
            return Err(SubscriptionError::Empty);
        }
        if let Some(index) = self
            .ticker_events
            .iter()
            .position(|filter| filter.interval.is_zero())
        {
            return Err(SubscriptionError::ZeroTickerInterval { index });
        }
        Ok(())
    }
}

/// A live subscription: one joined stream over all selected sources
#[derive(Debug)]
pub struct Session {
    events: EventStream<Event>,
    joiner: JoinerHandle<Event>,
    sources: Vec<StreamId>,
}

impl Session {
    pub(super) async fn start(
        sensor: &Arc<Sensor>,
        subscription: &Subscription,
    ) -> SubscriptionResult<Self> {
        subscription.validate()?;

        let (events, joiner) = Joiner::with_config(sensor.config());
        let mut sources = Vec::with_capacity(subscription.ticker_events.len());

        for filter in &subscription.ticker_events {
            let source = TimerSource::spawn(Arc::clone(sensor), filter.interval);
            sources.push(source.id());
            joiner.add(source).await;
        }

        info!(
            sensor_id = %sensor.id(),
            stream_id = %joiner.id(),
            sources = sources.len(),
            "subscription session started"
        );

        Ok(Self {
            events,
            joiner,
            sources,
        })
    }

    /// Next joined event; `None` once the session has shut down
    pub async fn recv(&self) -> Option<Event> {
        self.events.recv().await
    }

    /// Member stream ids, in subscription order
    pub fn sources(&self) -> &[StreamId] {
        &self.sources
    }

    /// Control handle, for adding or removing sources at runtime
    pub fn joiner(&self) -> &JoinerHandle<Event> {
        &self.joiner
    }

    /// Close the joiner and hand back the output stream for draining
    pub fn close(self) -> EventStream<Event> {
        self.joiner.close();
        self.events
    }
}

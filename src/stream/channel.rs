/*!
 * Event Stream Channels
 * A producer's data feed paired with the control channel that stops it
 *
 * Ownership rules:
 * - The producer alone closes `data`, by dropping its `StreamProducer`
 * - The stream holder alone closes `control`, at most once
 * - Control carries no payload; only its closure is observable
 */

use crate::core::errors::{StreamError, StreamResult};
use crate::core::id::StreamId;
use std::convert::Infallible;
use tokio::sync::oneshot;

/// Consumer half of the control channel
///
/// Closing (or dropping) it asks the producer to stop.
#[derive(Debug)]
pub struct StreamControl {
    tx: oneshot::Sender<Infallible>,
}

impl StreamControl {
    /// Close the control channel; consumes self so it cannot happen twice
    #[inline]
    pub fn close(self) {
        drop(self.tx);
    }

    /// True once the producer side is gone
    #[inline]
    pub fn is_producer_gone(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Producer half of the control channel
#[derive(Debug)]
pub struct ControlWatch {
    rx: oneshot::Receiver<Infallible>,
    closed: bool,
}

impl ControlWatch {
    /// Resolves once the control channel is closed
    ///
    /// Cancel safe, and returns immediately on every call after the first
    /// resolution.
    pub async fn closed(&mut self) {
        if self.closed {
            return;
        }
        match (&mut self.rx).await {
            Ok(never) => match never {},
            Err(_) => self.closed = true,
        }
    }

    /// Non-blocking check for control closure
    pub fn is_closed(&mut self) -> bool {
        if !self.closed {
            match self.rx.try_recv() {
                Ok(never) => match never {},
                Err(oneshot::error::TryRecvError::Closed) => self.closed = true,
                Err(oneshot::error::TryRecvError::Empty) => {}
            }
        }
        self.closed
    }
}

/// Create a linked control pair
pub fn control_channel() -> (StreamControl, ControlWatch) {
    let (tx, rx) = oneshot::channel();
    (StreamControl { tx }, ControlWatch { rx, closed: false })
}

/// Read handle for one producer's event feed
///
/// Drain with [`recv`](Self::recv) until it yields `None`; close the control
/// channel with [`close_control`](Self::close_control) to ask the producer to
/// stop. Dropping the stream does both at once.
#[derive(Debug)]
pub struct EventStream<T> {
    id: StreamId,
    control: Option<StreamControl>,
    data: flume::Receiver<T>,
}

impl<T> EventStream<T> {
    /// Create a stream and the producer that feeds it
    ///
    /// `capacity` bounds the data channel; 0 makes every send a rendezvous
    /// with the reader.
    pub fn channel(capacity: usize) -> (StreamProducer<T>, EventStream<T>) {
        let (data_tx, data_rx) = flume::bounded(capacity);
        let (control, watch) = control_channel();
        let id = StreamId::next();

        let producer = StreamProducer {
            id,
            data: data_tx,
            control: watch,
        };
        let stream = EventStream {
            id,
            control: Some(control),
            data: data_rx,
        };

        (producer, stream)
    }

    /// Assemble a stream from parts created elsewhere
    pub fn from_parts(id: StreamId, control: StreamControl, data: flume::Receiver<T>) -> Self {
        Self {
            id,
            control: Some(control),
            data,
        }
    }

    #[inline]
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Next event, or `None` once the producer closed `data` and the buffer is empty
    pub async fn recv(&self) -> Option<T> {
        self.data.recv_async().await.ok()
    }

    /// Next buffered event without waiting
    pub fn try_recv(&self) -> Option<T> {
        self.data.try_recv().ok()
    }

    /// Ask the producer to stop; later calls are no-ops
    pub fn close_control(&mut self) {
        if let Some(control) = self.control.take() {
            control.close();
        }
    }

    #[inline]
    pub fn is_control_closed(&self) -> bool {
        self.control.is_none()
    }

    /// True once `data` is closed and fully drained
    pub fn is_terminated(&self) -> bool {
        self.data.is_disconnected() && self.data.is_empty()
    }

    /// Events buffered and not yet received
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub(crate) fn into_parts(self) -> (StreamId, Option<StreamControl>, flume::Receiver<T>) {
        (self.id, self.control, self.data)
    }
}

/// Write handle for one stream
///
/// Dropping the producer closes the data channel.
#[derive(Debug)]
pub struct StreamProducer<T> {
    id: StreamId,
    data: flume::Sender<T>,
    control: ControlWatch,
}

impl<T> StreamProducer<T> {
    #[inline]
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Send one event, waiting for channel capacity
    ///
    /// Fails with [`StreamError::ControlClosed`] once the consumer closed
    /// control (checked before and while waiting), or with
    /// [`StreamError::Disconnected`] when the data receiver is gone. The event
    /// is dropped in both cases.
    pub async fn send(&mut self, event: T) -> StreamResult<()> {
        if self.control.is_closed() {
            return Err(StreamError::ControlClosed);
        }

        tokio::select! {
            biased;
            _ = self.control.closed() => Err(StreamError::ControlClosed),
            sent = self.data.send_async(event) => sent.map_err(|_| StreamError::Disconnected),
        }
    }

    /// Resolves once the consumer closed control
    pub async fn closed(&mut self) {
        self.control.closed().await
    }

    pub fn is_closed(&mut self) -> bool {
        self.control.is_closed()
    }

    /// True when the data receiver has been dropped
    pub fn is_disconnected(&self) -> bool {
        self.data.is_disconnected()
    }
}

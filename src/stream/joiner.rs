/*!
 * Stream Joiner - Dynamic Fan-In
 *
 * Combines a runtime-varying set of member streams into one output stream.
 * A single background task owns the member set; every mutation arrives as a
 * control message, so the member list is never shared and never locked.
 *
 * # Event Loop
 *
 * Each iteration waits on exactly one of:
 *
 * 1. **Control arm** - present until the handle is closed (or the output
 *    stream's control is closed). A message is dispatched; closure cascades
 *    control-closure to every current member and removes the arm for good.
 * 2. **Member arm** - present while enabled and at least one member exists.
 *    An event is forwarded to the output; a member whose data closed is
 *    dropped from the set without telling anyone.
 *
 * When neither arm is present the loop exits and drops the output sender,
 * which is the only termination signal the consumer sees.
 *
 * # Backpressure
 *
 * Forwarding awaits space in the output channel inside the loop. A consumer
 * that stops draining stalls the whole joiner: pending `add`, `remove`,
 * `enable` and `disable` requests are not serviced until the output drains.
 *
 * # Example
 *
 * ```no_run
 * # use telemetry_sensor::stream::{EventStream, Joiner};
 * # async fn example() {
 * let (events, joiner) = Joiner::spawn::<u64>(16);
 * let (mut producer, source) = EventStream::channel(0);
 *
 * assert!(joiner.add(source).await);
 * tokio::spawn(async move {
 *     let _ = producer.send(1).await;
 * });
 *
 * assert_eq!(events.recv().await, Some(1));
 * joiner.close();
 * assert_eq!(events.recv().await, None);
 * # }
 * ```
 */

use super::channel::{control_channel, ControlWatch, EventStream, StreamControl};
use crate::core::config::SensorConfig;
use crate::core::id::StreamId;
use crate::core::limits::CONTROL_CHANNEL_CAPACITY;
use std::pin::Pin;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::{Stream, StreamExt, StreamMap};
use tracing::{debug, error, info, trace};

/// Control messages for the joiner loop
#[derive(Debug)]
pub enum ControlMessage<T> {
    /// Register a member; the reply is always `true`
    AddMember {
        stream: EventStream<T>,
        reply: oneshot::Sender<bool>,
    },
    /// Deregister a member by identity; the reply tells whether it was present
    RemoveMember {
        id: StreamId,
        reply: oneshot::Sender<bool>,
    },
    /// Toggle the member data gate
    SetEnabled(bool),
    /// Snapshot loop state
    Stats { reply: oneshot::Sender<JoinerStats> },
}

/// Joiner statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinerStats {
    /// Member ids in registration order
    pub members: Vec<StreamId>,
    pub enabled: bool,
    /// Events handed to the output channel
    pub events_forwarded: u64,
    /// Members dropped because their data channel closed
    pub members_exhausted: u64,
}

/// Constructor namespace for joiners
pub struct Joiner;

impl Joiner {
    /// Spawn a joiner loop and return its output stream and control handle
    ///
    /// `buffer_length` bounds the output data channel; 0 makes every forward a
    /// rendezvous with the consumer. The output stream's control channel is an
    /// alias for [`JoinerHandle::close`].
    ///
    /// # Panics
    ///
    /// Must be called within a tokio runtime.
    pub fn spawn<T>(buffer_length: usize) -> (EventStream<T>, JoinerHandle<T>)
    where
        T: Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel(CONTROL_CHANNEL_CAPACITY);
        let (output_tx, output_rx) = flume::bounded(buffer_length);
        let (output_control, output_watch) = control_channel();
        let id = StreamId::next();

        let state = JoinerLoop {
            id,
            control: Some(ControlArm {
                commands: command_rx,
                output_control: output_watch,
            }),
            members: Vec::new(),
            feeds: StreamMap::new(),
            enabled: true,
            output: output_tx,
            events_forwarded: 0,
            members_exhausted: 0,
        };

        tokio::spawn(state.run());
        debug!(stream_id = %id, buffer_length, "joiner spawned");

        (
            EventStream::from_parts(id, output_control, output_rx),
            JoinerHandle { id, command_tx },
        )
    }

    /// Spawn a joiner sized by `config.channel_buffer_length`
    pub fn with_config<T>(config: &SensorConfig) -> (EventStream<T>, JoinerHandle<T>)
    where
        T: Send + 'static,
    {
        Self::spawn(config.channel_buffer_length)
    }
}

/// Control handle for a running joiner
///
/// Not `Clone`: exactly one owner may close the joiner, and
/// [`close`](Self::close) consumes the handle. Dropping the handle closes it
/// as well.
///
/// # Panics
///
/// Every method panics if the joiner loop has already terminated, which can
/// only happen when the output stream's control was closed while the handle
/// was still in use. That is a caller bug, not a runtime condition.
#[derive(Debug)]
pub struct JoinerHandle<T> {
    id: StreamId,
    command_tx: mpsc::Sender<ControlMessage<T>>,
}

impl<T> JoinerHandle<T> {
    /// Identity of the joiner's output stream
    #[inline]
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Register `stream` as a member; waits until the loop has processed it
    ///
    /// Events the member sends after this returns are never missed.
    pub async fn add(&self, stream: EventStream<T>) -> bool {
        let (reply, response) = oneshot::channel();
        self.request("add", ControlMessage::AddMember { stream, reply })
            .await;
        response.await.unwrap_or_else(|_| loop_gone(self.id, "add"))
    }

    /// Deregister the member with identity `id`; waits for the loop's answer
    ///
    /// Returns `false` if no such member is present. A removed member is
    /// released: its control is closed and its data receiver dropped, so it
    /// contributes nothing further even if it keeps producing.
    pub async fn remove(&self, id: StreamId) -> bool {
        let (reply, response) = oneshot::channel();
        self.request("remove", ControlMessage::RemoveMember { id, reply })
            .await;
        response.await.unwrap_or_else(|_| loop_gone(self.id, "remove"))
    }

    /// Resume forwarding member data (no reply)
    pub async fn enable(&self) {
        self.request("enable", ControlMessage::SetEnabled(true)).await;
    }

    /// Stop forwarding member data (no reply)
    ///
    /// While disabled, members are neither drained nor checked for closure.
    pub async fn disable(&self) {
        self.request("disable", ControlMessage::SetEnabled(false))
            .await;
    }

    /// Snapshot of the loop's current state
    pub async fn stats(&self) -> JoinerStats {
        let (reply, response) = oneshot::channel();
        self.request("stats", ControlMessage::Stats { reply }).await;
        response.await.unwrap_or_else(|_| loop_gone(self.id, "stats"))
    }

    /// Close the joiner's control channel
    ///
    /// Cascades control-closure to every current member. The output stream
    /// closes once the loop has nothing left to wait on.
    pub fn close(self) {
        debug!(stream_id = %self.id, "joiner handle closed");
        drop(self.command_tx);
    }

    async fn request(&self, operation: &'static str, message: ControlMessage<T>) {
        if self.command_tx.send(message).await.is_err() {
            loop_gone(self.id, operation);
        }
    }
}

fn loop_gone(id: StreamId, operation: &'static str) -> ! {
    error!(stream_id = %id, operation, "joiner handle used after the loop terminated");
    panic!("joiner {id}: `{operation}` called after the joiner shut down");
}

/// Member feed: its events, then one `Exhausted` marker when its data closes
enum MemberItem<T> {
    Event(T),
    Exhausted,
}

type MemberFeed<T> = Pin<Box<dyn Stream<Item = MemberItem<T>> + Send>>;

fn member_feed<T: Send + 'static>(data: flume::Receiver<T>) -> MemberFeed<T> {
    Box::pin(
        data.into_stream()
            .map(MemberItem::Event)
            .chain(tokio_stream::once(MemberItem::Exhausted)),
    )
}

/// Inbound control: handle commands plus the output stream's control
struct ControlArm<T> {
    commands: mpsc::Receiver<ControlMessage<T>>,
    output_control: ControlWatch,
}

impl<T> ControlArm<T> {
    /// Next message, or `None` once either control source is closed
    async fn next(&mut self) -> Option<ControlMessage<T>> {
        tokio::select! {
            biased;
            _ = self.output_control.closed() => None,
            message = self.commands.recv() => message,
        }
    }
}

async fn next_control<T>(control: &mut Option<ControlArm<T>>) -> Option<ControlMessage<T>> {
    match control {
        Some(arm) => arm.next().await,
        None => std::future::pending().await,
    }
}

/// Loop state; owned by the joiner task alone
struct JoinerLoop<T> {
    id: StreamId,
    control: Option<ControlArm<T>>,
    /// Registration order, plus each member's control for the shutdown cascade
    members: Vec<(StreamId, Option<StreamControl>)>,
    feeds: StreamMap<StreamId, MemberFeed<T>>,
    enabled: bool,
    output: flume::Sender<T>,
    events_forwarded: u64,
    members_exhausted: u64,
}

impl<T: Send + 'static> JoinerLoop<T> {
    async fn run(mut self) {
        loop {
            // Wait-set for this iteration
            let control_armed = self.control.is_some();
            let members_armed = self.enabled && !self.feeds.is_empty();

            if !control_armed && !members_armed {
                break;
            }

            tokio::select! {
                message = next_control(&mut self.control), if control_armed => {
                    match message {
                        Some(message) => self.dispatch(message),
                        None => self.cascade_close(),
                    }
                }

                Some((member, item)) = self.feeds.next(), if members_armed => {
                    match item {
                        MemberItem::Event(event) => self.forward(member, event).await,
                        MemberItem::Exhausted => self.member_exhausted(member),
                    }
                }

                else => break,
            }
        }

        info!(
            stream_id = %self.id,
            forwarded = self.events_forwarded,
            remaining_members = self.members.len(),
            "joiner loop terminated"
        );
        // Dropping `self.output` here closes the output data channel
    }

    fn dispatch(&mut self, message: ControlMessage<T>) {
        match message {
            ControlMessage::AddMember { stream, reply } => {
                let added = self.add(stream);
                let _ = reply.send(added);
            }

            ControlMessage::RemoveMember { id, reply } => {
                let removed = self.remove(id);
                let _ = reply.send(removed);
            }

            ControlMessage::SetEnabled(enabled) => {
                debug!(stream_id = %self.id, enabled, "joiner gate changed");
                self.enabled = enabled;
            }

            ControlMessage::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
        }
    }

    fn add(&mut self, stream: EventStream<T>) -> bool {
        let (id, control, data) = stream.into_parts();
        self.members.push((id, control));
        self.feeds.insert(id, member_feed(data));
        debug!(
            stream_id = %self.id,
            member = %id,
            members = self.members.len(),
            "member added"
        );
        true
    }

    fn remove(&mut self, id: StreamId) -> bool {
        let Some(index) = self.members.iter().position(|(member, _)| *member == id) else {
            trace!(stream_id = %self.id, member = %id, "remove of unknown member");
            return false;
        };

        let (_, control) = self.members.remove(index);
        if let Some(control) = control {
            control.close();
        }
        self.feeds.remove(&id);

        debug!(
            stream_id = %self.id,
            member = %id,
            members = self.members.len(),
            "member removed"
        );
        true
    }

    async fn forward(&mut self, member: StreamId, event: T) {
        match self.output.send_async(event).await {
            Ok(()) => self.events_forwarded += 1,
            Err(_) => {
                trace!(stream_id = %self.id, member = %member, "output receiver gone, event discarded");
            }
        }
    }

    fn member_exhausted(&mut self, member: StreamId) {
        self.members.retain(|(id, _)| *id != member);
        self.feeds.remove(&member);
        self.members_exhausted += 1;
        debug!(
            stream_id = %self.id,
            member = %member,
            members = self.members.len(),
            "member data closed"
        );
    }

    /// Relay shutdown upstream and retire the control arm
    fn cascade_close(&mut self) {
        info!(
            stream_id = %self.id,
            members = self.members.len(),
            enabled = self.enabled,
            "joiner control closed, closing members"
        );

        for (_, control) in self.members.iter_mut() {
            if let Some(control) = control.take() {
                control.close();
            }
        }
        self.control = None;
    }

    fn stats(&self) -> JoinerStats {
        JoinerStats {
            members: self.members.iter().map(|(id, _)| *id).collect(),
            enabled: self.enabled,
            events_forwarded: self.events_forwarded,
            members_exhausted: self.members_exhausted,
        }
    }
}

/*!
 * Joiner Tests
 * Fan-in, dynamic membership, gating, shutdown cascade and backpressure
 */

use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::time::Duration;
use telemetry_sensor::{EventStream, Joiner, StreamError, StreamProducer};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_test::{assert_pending, assert_ready_eq};

/// Let every other task run until it blocks (clock is paused)
async fn settle() {
    sleep(Duration::from_millis(5)).await;
}

fn spawn_producer(mut producer: StreamProducer<(u32, u32)>, tag: u32, count: u32) -> JoinHandle<()> {
    tokio::spawn(async move {
        for seq in 0..count {
            if producer.send((tag, seq)).await.is_err() {
                return;
            }
        }
    })
}

#[tokio::test(start_paused = true)]
async fn test_fan_in_delivers_every_event_in_source_order() {
    let (events, joiner) = Joiner::spawn::<(u32, u32)>(4);

    let mut producers = Vec::new();
    for tag in 0..3 {
        let (producer, stream) = EventStream::channel(0);
        assert!(joiner.add(stream).await);
        producers.push(spawn_producer(producer, tag, 50));
    }

    let mut seen: HashMap<u32, Vec<u32>> = HashMap::new();
    for _ in 0..150 {
        let (tag, seq) = events.recv().await.expect("joined stream ended early");
        seen.entry(tag).or_default().push(seq);
    }

    for producer in producers {
        producer.await.unwrap();
    }
    joiner.close();
    assert_eq!(events.recv().await, None);

    for tag in 0..3 {
        assert_eq!(seen[&tag], (0..50).collect::<Vec<_>>());
    }
}

#[tokio::test(start_paused = true)]
async fn test_member_added_mid_run_is_forwarded() {
    let (events, joiner) = Joiner::spawn::<(u32, u32)>(1);

    let (mut first, stream) = EventStream::channel(1);
    assert!(joiner.add(stream).await);
    first.send((0, 0)).await.unwrap();
    assert_eq!(events.recv().await, Some((0, 0)));

    let (mut second, stream) = EventStream::channel(1);
    assert!(joiner.add(stream).await);
    second.send((1, 0)).await.unwrap();
    assert_eq!(events.recv().await, Some((1, 0)));

    first.send((0, 1)).await.unwrap();
    assert_eq!(events.recv().await, Some((0, 1)));
    assert_eq!(joiner.stats().await.members.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_removed_member_stops_contributing() {
    let (events, joiner) = Joiner::spawn::<u32>(8);

    let (mut kept, stream) = EventStream::channel(1);
    assert!(joiner.add(stream).await);
    let (mut removed, stream) = EventStream::channel(1);
    let removed_id = stream.id();
    assert!(joiner.add(stream).await);

    kept.send(1).await.unwrap();
    removed.send(100).await.unwrap();

    let mut received = vec![events.recv().await.unwrap(), events.recv().await.unwrap()];
    received.sort_unstable();
    assert_eq!(received, vec![1, 100]);

    assert!(joiner.remove(removed_id).await);

    // The producer keeps trying; the joiner released it
    assert_eq!(removed.send(101).await, Err(StreamError::ControlClosed));
    assert!(removed.is_disconnected());

    kept.send(2).await.unwrap();
    assert_eq!(events.recv().await, Some(2));
    settle().await;
    assert_eq!(events.try_recv(), None);
}

#[tokio::test(start_paused = true)]
async fn test_remove_twice_returns_true_then_false() {
    let (_events, joiner) = Joiner::spawn::<u32>(1);
    let (_producer, stream) = EventStream::channel(0);
    let id = stream.id();

    assert!(joiner.add(stream).await);
    assert!(joiner.remove(id).await);
    assert!(!joiner.remove(id).await);
}

#[tokio::test(start_paused = true)]
async fn test_remove_unknown_stream_returns_false() {
    let (_events, joiner) = Joiner::spawn::<u32>(1);
    let (_producer, stranger) = EventStream::<u32>::channel(0);

    assert!(!joiner.remove(stranger.id()).await);
    assert!(joiner.stats().await.members.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_disabled_joiner_forwards_nothing() {
    let (events, joiner) = Joiner::spawn::<u32>(8);
    let (mut producer, stream) = EventStream::channel(4);
    assert!(joiner.add(stream).await);

    joiner.disable().await;
    settle().await;
    assert!(!joiner.stats().await.enabled);

    producer.send(1).await.unwrap();
    producer.send(2).await.unwrap();
    settle().await;

    assert_eq!(events.try_recv(), None);
    assert!(timeout(Duration::from_millis(50), events.recv()).await.is_err());

    joiner.enable().await;
    assert_eq!(events.recv().await, Some(1));
    assert_eq!(events.recv().await, Some(2));
}

#[tokio::test(start_paused = true)]
async fn test_member_closure_unnoticed_while_disabled() {
    let (_events, joiner) = Joiner::spawn::<u32>(1);
    let (producer, stream) = EventStream::channel(0);
    assert!(joiner.add(stream).await);

    joiner.disable().await;
    settle().await;
    drop(producer);
    settle().await;

    let stats = joiner.stats().await;
    assert_eq!(stats.members.len(), 1);
    assert_eq!(stats.members_exhausted, 0);

    joiner.enable().await;
    settle().await;

    let stats = joiner.stats().await;
    assert!(stats.members.is_empty());
    assert_eq!(stats.members_exhausted, 1);
}

#[tokio::test(start_paused = true)]
async fn test_close_cascades_to_every_member() {
    let (events, joiner) = Joiner::spawn::<u32>(1);

    let mut watchers = Vec::new();
    for _ in 0..3 {
        let (mut producer, stream) = EventStream::<u32>::channel(0);
        assert!(joiner.add(stream).await);
        watchers.push(tokio::spawn(async move {
            producer.closed().await;
        }));
    }

    joiner.close();

    for watcher in watchers {
        timeout(Duration::from_secs(1), watcher)
            .await
            .expect("member never saw control closure")
            .unwrap();
    }
    assert_eq!(events.recv().await, None);
    assert!(events.is_terminated());
}

#[tokio::test(start_paused = true)]
async fn test_close_while_disabled_terminates_without_draining() {
    let (events, joiner) = Joiner::spawn::<u32>(1);
    let (mut producer, stream) = EventStream::channel(0);
    assert!(joiner.add(stream).await);

    joiner.disable().await;
    settle().await;
    joiner.close();

    // Wait-set is empty: no control arm and the gate is closed
    assert_eq!(events.recv().await, None);

    producer.closed().await;
    assert!(producer.is_disconnected());
}

#[tokio::test(start_paused = true)]
async fn test_closing_output_control_shuts_joiner_down() {
    let (mut events, joiner) = Joiner::spawn::<u32>(1);
    let (mut producer, stream) = EventStream::channel(0);
    assert!(joiner.add(stream).await);

    events.close_control();

    timeout(Duration::from_secs(1), producer.closed())
        .await
        .expect("cascade did not reach the member");
    drop(producer);

    assert_eq!(events.recv().await, None);
    drop(joiner);
}

#[tokio::test(start_paused = true)]
#[should_panic(expected = "after the joiner shut down")]
async fn test_handle_use_after_shutdown_panics() {
    let (mut events, joiner) = Joiner::spawn::<u32>(1);
    events.close_control();
    assert_eq!(events.recv().await, None);

    let (_producer, stream) = EventStream::channel(0);
    joiner.add(stream).await;
}

#[tokio::test(start_paused = true)]
async fn test_stalled_consumer_blocks_control_requests() {
    let (events, joiner) = Joiner::spawn::<u32>(0);
    let (mut producer, stream) = EventStream::channel(1);
    assert!(joiner.add(stream).await);

    // The loop picks this up and blocks handing it to nobody
    producer.send(1).await.unwrap();
    settle().await;

    let (_late_producer, late) = EventStream::channel(0);
    let mut add = tokio_test::task::spawn(joiner.add(late));
    assert_pending!(add.poll());
    settle().await;
    assert_pending!(add.poll());

    assert_eq!(events.recv().await, Some(1));
    settle().await;

    assert!(add.is_woken());
    assert_ready_eq!(add.poll(), true);
    drop(add);

    assert_eq!(joiner.stats().await.members.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stats_count_forwarded_events() {
    let (events, joiner) = Joiner::spawn::<u32>(16);
    let (mut producer, stream) = EventStream::channel(16);
    let id = stream.id();
    assert!(joiner.add(stream).await);

    for i in 0..10 {
        producer.send(i).await.unwrap();
    }
    for i in 0..10 {
        assert_eq!(events.recv().await, Some(i));
    }

    let stats = joiner.stats().await;
    assert_eq!(stats.members, vec![id]);
    assert!(stats.enabled);
    assert_eq!(stats.events_forwarded, 10);
}

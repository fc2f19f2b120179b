/*!
 * Timer Source Tests
 * Ticker-driven sensor events, alone and joined with other sensors
 */

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use telemetry_sensor::{Event, Joiner, Payload, Sensor, SensorConfig, TimerSource};
use tokio::time::{sleep, timeout, Instant};

fn sensor(id: &str) -> Arc<Sensor> {
    Sensor::new(SensorConfig::default().with_sensor_id(id))
}

#[tokio::test(start_paused = true)]
async fn test_events_carry_sensor_identity_and_sequence() {
    let mut source = TimerSource::spawn(sensor("timer"), Duration::from_millis(10));

    let mut previous = 0;
    for _ in 0..5 {
        let event = source.recv().await.unwrap();
        assert_eq!(event.sensor_id, "timer");
        assert!(event.sequence_number > previous);
        previous = event.sequence_number;

        let Payload::Ticker(tick) = event.payload;
        assert!(tick.seconds > 0);
        assert_eq!(tick.nanoseconds / 1_000_000_000, tick.seconds);
    }

    source.close_control();
    let mut trailing = 0;
    while source.recv().await.is_some() {
        trailing += 1;
    }
    assert!(trailing <= 1);
    assert!(source.is_terminated());
}

#[tokio::test(start_paused = true)]
async fn test_monotime_advances_by_interval() {
    let source = TimerSource::spawn(sensor("mono"), Duration::from_millis(10));

    let mut stamps = Vec::new();
    for _ in 0..4 {
        stamps.push(source.recv().await.unwrap().monotime_ns);
    }

    for pair in stamps.windows(2) {
        assert!(pair[1] - pair[0] >= 10_000_000, "stamps too close: {pair:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_dropping_stream_stops_source() {
    let shared = sensor("dropped");
    let source = TimerSource::spawn(Arc::clone(&shared), Duration::from_millis(10));
    assert!(source.recv().await.is_some());
    drop(source);

    sleep(Duration::from_millis(50)).await;
    // The source task released its sensor reference on exit
    assert_eq!(Arc::strong_count(&shared), 1);
}

/// Two sensors at different rates joined into one stream; the slow one is
/// removed mid-run and the joiner is closed later
#[tokio::test(start_paused = true)]
async fn test_two_sensors_joined_then_removed_then_closed() {
    let (events, joiner) = Joiner::spawn::<Event>(1);

    let fast = TimerSource::spawn(sensor("fast"), Duration::from_millis(10));
    let slow = TimerSource::spawn(sensor("slow"), Duration::from_millis(25));
    let slow_id = slow.id();
    assert!(joiner.add(fast).await);
    assert!(joiner.add(slow).await);

    let consumer = tokio::spawn(async move {
        let mut received = Vec::new();
        while let Some(event) = events.recv().await {
            received.push((event.sensor_id, event.sequence_number, Instant::now()));
        }
        received
    });

    sleep(Duration::from_millis(100)).await;
    assert!(joiner.remove(slow_id).await);
    let removed_at = Instant::now();

    sleep(Duration::from_millis(100)).await;
    joiner.close();

    let received = timeout(Duration::from_millis(100), consumer)
        .await
        .expect("joined stream did not terminate after close")
        .unwrap();

    let fast_seqs: Vec<u64> = received
        .iter()
        .filter(|(id, _, _)| id == "fast")
        .map(|(_, seq, _)| *seq)
        .collect();
    let slow: Vec<&Instant> = received
        .iter()
        .filter(|(id, _, _)| id == "slow")
        .map(|(_, _, at)| at)
        .collect();

    assert!(fast_seqs.len() >= 15, "only {} fast events", fast_seqs.len());
    assert_eq!(fast_seqs, (1..=fast_seqs.len() as u64).collect::<Vec<_>>());

    assert!(!slow.is_empty());
    assert!(fast_seqs.len() > slow.len());
    assert!(slow.iter().filter(|at| ***at > removed_at).count() <= 1);
}

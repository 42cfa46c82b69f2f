use reorder_rs::{
    EventKind, GapEvent, Notification, ReorderBuffer, Sequencer, SequencerConfig, SubmitOutcome,
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[cfg(test)]
mod tests {
    use super::*;

    fn make_buffer(max_buffer_size: usize, max_wait: Duration) -> ReorderBuffer {
        ReorderBuffer::new(
            SequencerConfig::new(max_buffer_size, max_wait).expect("valid config"),
        )
        .expect("valid buffer")
    }

    fn capture(buffer: &mut ReorderBuffer) -> Arc<Mutex<Vec<Notification>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        for kind in EventKind::ALL {
            let log = log.clone();
            buffer.on(kind, move |n: &Notification| log.lock().unwrap().push(n.clone()));
        }
        log
    }

    fn ready_of(log: &Arc<Mutex<Vec<Notification>>>) -> Vec<u64> {
        log.lock()
            .unwrap()
            .iter()
            .filter_map(|n| n.as_ready().map(|r| r.sequence))
            .collect()
    }

    #[tokio::test]
    async fn test_device_event_stream_with_reconnect() {
        let mut buffer = make_buffer(32, Duration::from_secs(5));
        let log = capture(&mut buffer);

        buffer.submit(0, "playlist.loaded", json!({"tracks": 12}));
        buffer.submit(2, "led.brightness", json!(80));
        buffer.submit(1, "nfc.session.started", json!({"reader": "front"}));
        buffer.submit(1, "nfc.session.started", json!({"reader": "front"}));
        buffer.submit(3, "playback.started", Value::Null);

        assert_eq!(ready_of(&log), vec![0, 1, 2, 3]);

        // The transport reconnected with a fresh session numbering from 1000.
        buffer.submit(6, "led.brightness", json!(10));
        buffer.reset_to(1000);
        assert!(buffer.is_empty());

        buffer.submit(1001, "playback.paused", Value::Null);
        buffer.submit(1000, "playlist.loaded", json!({"tracks": 3}));

        assert_eq!(ready_of(&log), vec![0, 1, 2, 3, 1000, 1001]);
        assert_eq!(buffer.next_expected(), 1002);
    }

    #[tokio::test]
    async fn test_gap_precision_against_public_api() {
        let mut buffer = make_buffer(8, Duration::from_secs(5));
        let log = capture(&mut buffer);

        buffer.submit(0, "a", Value::Null);
        buffer.submit(2, "c", Value::Null);
        buffer.submit(6, "g", Value::Null);

        let gaps: Vec<_> = log
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.kind() == EventKind::Gap)
            .cloned()
            .collect();
        assert_eq!(
            gaps,
            vec![Notification::Gap(GapEvent {
                expected: 1,
                received: 6,
                gap: 4,
            })]
        );
    }

    #[tokio::test]
    async fn test_payload_passes_through_unmodified() {
        let mut buffer = make_buffer(8, Duration::from_secs(5));
        let log = capture(&mut buffer);
        let payload = json!({"leds": [[255, 0, 0], [0, 255, 0]], "note": null});

        buffer.submit(1, "led.frame", payload.clone());
        buffer.submit(0, "led.frame", Value::Null);

        let log = log.lock().unwrap();
        let delivered: Vec<_> = log.iter().filter_map(|n| n.as_ready()).collect();
        assert_eq!(delivered[0].payload, Value::Null);
        assert_eq!(delivered[1].payload, payload);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_message_delays_but_does_not_stall() {
        let mut sequencer = Sequencer::new(
            SequencerConfig::default()
                .with_max_buffer_size(16)
                .with_max_wait_time(Duration::from_millis(250)),
        )
        .expect("valid config");

        let delivered = Arc::new(Mutex::new(Vec::new()));
        let sink = delivered.clone();
        sequencer.on(EventKind::Ready, move |n: &Notification| {
            if let Some(ready) = n.as_ready() {
                sink.lock().unwrap().push((ready.sequence, tokio::time::Instant::now()));
            }
        });

        let client = sequencer.client();
        let handle = sequencer.spawn();
        let start = tokio::time::Instant::now();

        // Sequence 1 never arrives.
        for seq in [0u64, 2, 3, 4] {
            let outcome = client.submit(seq, "evt", Value::Null).await.unwrap();
            assert!(outcome.is_accepted());
        }

        tokio::time::sleep(Duration::from_millis(400)).await;

        let delivered = delivered.lock().unwrap().clone();
        let sequences: Vec<u64> = delivered.iter().map(|(s, _)| *s).collect();
        assert_eq!(sequences, vec![0, 2, 3, 4]);

        let forced_at = delivered[1].1 - start;
        assert!(forced_at >= Duration::from_millis(250));
        assert!(forced_at < Duration::from_millis(260));

        let snapshot = client.snapshot().await.unwrap();
        assert_eq!(snapshot.next_expected, 5);
        assert_eq!(snapshot.buffer_size(), 0);

        assert_eq!(
            client.submit(1, "evt", Value::Null).await.unwrap(),
            SubmitOutcome::Stale
        );

        client.shutdown().await.unwrap();
        handle.wait().await.unwrap();
    }

    #[test]
    fn test_config_rejects_zero_bounds() {
        assert!(SequencerConfig::new(0, Duration::from_secs(1)).is_err());
        assert!(SequencerConfig::new(1, Duration::ZERO).is_err());
        assert!(
            ReorderBuffer::<Value>::new(SequencerConfig::default().with_max_buffer_size(0))
                .is_err()
        );
    }
}

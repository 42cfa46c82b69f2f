//! Property-based tests using proptest.
//!
//! These tests verify ordering invariants that must hold for any arrival order.

use proptest::prelude::*;
use reorder_rs::{EventKind, Notification, ReorderBuffer, SequencerConfig, SubmitOutcome};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn run<F: FnOnce() -> R, R>(f: F) -> R {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let _guard = rt.enter();
    f()
}

fn recording_buffer(max_buffer_size: usize) -> (ReorderBuffer, Arc<Mutex<Vec<u64>>>) {
    let config = SequencerConfig::default()
        .with_max_buffer_size(max_buffer_size)
        .with_max_wait_time(Duration::from_secs(3600));
    let mut buffer = ReorderBuffer::new(config).unwrap();
    let ready = Arc::new(Mutex::new(Vec::new()));
    let sink = ready.clone();
    buffer.on(EventKind::Ready, move |n: &Notification| {
        if let Some(event) = n.as_ready() {
            sink.lock().unwrap().push(event.sequence);
        }
    });
    (buffer, ready)
}

/// Generate a shuffled, gapless run of sequence numbers.
fn arb_permutation() -> impl Strategy<Value = Vec<u64>> {
    (1u64..80).prop_flat_map(|n| Just((0..n).collect::<Vec<u64>>()).prop_shuffle())
}

proptest! {
    #[test]
    fn prop_any_permutation_is_released_in_order(order in arb_permutation()) {
        run(|| {
            let (mut buffer, ready) = recording_buffer(order.len());
            for &seq in &order {
                buffer.submit(seq, "evt", Value::from(seq));
            }

            let released = ready.lock().unwrap().clone();
            let expected: Vec<u64> = (0..order.len() as u64).collect();
            prop_assert_eq!(released, expected);
            prop_assert!(buffer.is_empty());
            prop_assert_eq!(buffer.next_expected(), order.len() as u64);
            Ok(())
        })?;
    }

    #[test]
    fn prop_release_is_strictly_increasing(
        arrivals in prop::collection::vec(0u64..60, 0..200),
        capacity in 1usize..16,
    ) {
        run(|| {
            let (mut buffer, ready) = recording_buffer(capacity);
            for &seq in &arrivals {
                let cursor = buffer.next_expected();
                let outcome = buffer.submit(seq, "evt", Value::Null);
                if seq < cursor {
                    prop_assert_eq!(outcome, SubmitOutcome::Stale);
                    prop_assert_eq!(buffer.next_expected(), cursor);
                }
                prop_assert!(buffer.len() <= capacity);
                prop_assert!(buffer.held_sequences().iter().all(|&s| s > buffer.next_expected()));
                prop_assert_eq!(buffer.pending_timers(), buffer.len());
            }

            let ready = ready.lock().unwrap();
            prop_assert!(ready.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(ready.iter().all(|s| arrivals.contains(s)));
            Ok(())
        })?;
    }

    #[test]
    fn prop_duplicates_never_dispatch_twice(order in arb_permutation(), repeat in 1usize..4) {
        run(|| {
            let (mut buffer, ready) = recording_buffer(order.len());
            for &seq in &order {
                for _ in 0..repeat {
                    buffer.submit(seq, "evt", Value::Null);
                }
            }

            let released = ready.lock().unwrap().clone();
            let expected: Vec<u64> = (0..order.len() as u64).collect();
            prop_assert_eq!(released, expected);
            Ok(())
        })?;
    }
}

/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Tests for the Sequencer module.


use crate::sequencer::{EventKind, Notification, ReorderBuffer, SequencerConfig};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Notifications captured from every channel, in emission order.
pub(crate) type Recorded = Arc<Mutex<Vec<Notification>>>;

pub(crate) fn buffer(max_buffer_size: usize, max_wait_ms: u64) -> ReorderBuffer {
    let config = SequencerConfig::default()
        .with_max_buffer_size(max_buffer_size)
        .with_max_wait_time(Duration::from_millis(max_wait_ms));
    ReorderBuffer::new(config).unwrap()
}

pub(crate) fn record(buffer: &mut ReorderBuffer) -> Recorded {
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    for kind in EventKind::ALL {
        let sink = recorded.clone();
        buffer.on(kind, move |n| sink.lock().unwrap().push(n.clone()));
    }
    recorded
}

pub(crate) fn ready_sequences(recorded: &Recorded) -> Vec<u64> {
    recorded
        .lock()
        .unwrap()
        .iter()
        .filter_map(|n| n.as_ready().map(|r| r.sequence))
        .collect()
}

pub(crate) fn of_kind(recorded: &Recorded, kind: EventKind) -> Vec<Notification> {
    recorded
        .lock()
        .unwrap()
        .iter()
        .filter(|n| n.kind() == kind)
        .cloned()
        .collect()
}

pub(crate) fn submit(buffer: &mut ReorderBuffer, sequence: u64) -> crate::sequencer::SubmitOutcome {
    buffer.submit(sequence, format!("event-{sequence}"), Value::from(sequence))
}

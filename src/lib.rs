/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! # reorder-rs
//!
//! A sequenced event reordering buffer. Events arrive from a best-effort
//! transport as `(sequence, name, payload)` tuples, possibly out of order,
//! duplicated or with holes, and leave as a strictly increasing, gapless
//! stream of `Ready` notifications.
//!
//! The crate exposes the ordering layer two ways:
//!
//! - [`ReorderBuffer`]: the synchronous, single-owner state machine. Every
//!   call runs to completion, including cascade drains.
//! - [`Sequencer`]: a single-writer tokio task that owns a `ReorderBuffer`,
//!   accepts commands from any number of [`SequencerClient`]s and drives the
//!   staleness timers from the same loop.
//!
//! Memory is bounded by [`SequencerConfig::max_buffer_size`]. A held event
//! whose predecessors never show up is forced through after
//! [`SequencerConfig::max_wait_time`], so a lost message delays the stream
//! but never stalls it.
//!
//! ## Example
//!
//! ```
//! use reorder_rs::{EventKind, Notification, ReorderBuffer, SequencerConfig};
//! use std::sync::{Arc, Mutex};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut buffer = ReorderBuffer::new(SequencerConfig::default()).unwrap();
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! buffer.on(EventKind::Ready, move |n: &Notification| {
//!     if let Notification::Ready(ready) = n {
//!         sink.lock().unwrap().push(ready.sequence);
//!     }
//! });
//!
//! buffer.submit(1, "led.changed", serde_json::Value::Null);
//! buffer.submit(0, "nfc.tag", serde_json::Value::Null);
//!
//! assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
//! assert_eq!(buffer.next_expected(), 2);
//! # }
//! ```

pub mod sequencer;

pub use sequencer::{
    BufferedEvent, ConfigError, EventKind, GapEvent, Notification, ObserverId, OverflowEvent,
    ReadyEvent, ReorderBuffer, Sequencer, SequencerClient, SequencerConfig, SequencerError,
    SequencerHandle, SequencerSnapshot, SequencerStats, StaleEvent, SubmitOutcome,
};

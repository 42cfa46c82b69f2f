/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Sequencer module for restoring the delivery order of transport events.
//!
//! A transport hands over `(sequence, name, payload)` tuples that may be
//! reordered, duplicated or lost. This module releases them to observers as
//! a strictly increasing, gapless sequence.
//!
//! # Architecture
//!
//! - [`ReorderBuffer`] holds the cursor, the bounded map of early arrivals
//!   and one staleness timer per held arrival
//! - An arrival matching the cursor is released, then held arrivals cascade
//!   out for as long as they are contiguous
//! - A held arrival whose timer fires is forced through past the gap
//! - Observers subscribe per [`EventKind`]: `ready`, `gap`, `overflow`,
//!   `stale`
//! - [`Sequencer`] wraps the buffer in a single-writer task so several
//!   producers can share it through [`SequencerClient`]s
//!
//! # Examples
//!
//! ```
//! use reorder_rs::sequencer::{EventKind, Notification, ReorderBuffer, SequencerConfig};
//! use std::sync::{Arc, Mutex};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut buffer = ReorderBuffer::new(SequencerConfig::default()).unwrap();
//!
//! let gaps = Arc::new(Mutex::new(Vec::new()));
//! let sink = gaps.clone();
//! buffer.on(EventKind::Gap, move |n: &Notification| {
//!     if let Notification::Gap(gap) = n {
//!         sink.lock().unwrap().push(gap.gap);
//!     }
//! });
//!
//! buffer.submit(0, "boot", serde_json::Value::Null);
//! buffer.submit(5, "led.changed", serde_json::Value::Null);
//!
//! assert_eq!(*gaps.lock().unwrap(), vec![4]);
//! assert_eq!(buffer.held_sequences(), vec![5]);
//! # }
//! ```

pub mod buffer;
pub mod command;
pub mod config;
pub mod core;
pub mod event;
pub mod observer;
pub mod receipt;
pub mod snapshot;

#[cfg(test)]
mod tests;

// Re-export main types
pub use buffer::ReorderBuffer;
pub use command::SequencerCommand;
pub use config::{ConfigError, SequencerConfig};
pub use self::core::{Sequencer, SequencerClient, SequencerError, SequencerHandle};
pub use event::{
    BufferedEvent, EventKind, GapEvent, Notification, OverflowEvent, ReadyEvent, StaleEvent,
};
pub use observer::ObserverId;
pub use receipt::SubmitOutcome;
pub use snapshot::{SequencerSnapshot, SequencerStats};

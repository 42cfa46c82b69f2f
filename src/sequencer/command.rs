/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Sequencer command types.
//!
//! This module defines the commands a [`SequencerClient`] sends to the
//! sequencer task. Each command carries the channel its reply goes back on.
//!
//! [`SequencerClient`]: super::SequencerClient

use super::receipt::SubmitOutcome;
use super::snapshot::SequencerSnapshot;
use serde_json::Value;
use tokio::sync::oneshot;

/// Commands processed, one at a time, by the sequencer task.
#[derive(Debug)]
pub enum SequencerCommand<P = Value> {
    /// Feed one arrival into the buffer.
    Submit {
        /// Intended delivery position.
        sequence: u64,
        /// Event kind.
        name: String,
        /// Opaque payload.
        payload: P,
        /// Receives what the buffer did with the arrival.
        reply: oneshot::Sender<SubmitOutcome>,
    },

    /// Discard held events and move the cursor, to origin when `None`.
    Reset {
        /// New cursor value.
        cursor: Option<u64>,
        /// Acknowledgement.
        reply: oneshot::Sender<()>,
    },

    /// Discard held events, keep the cursor.
    Clear {
        /// Acknowledgement.
        reply: oneshot::Sender<()>,
    },

    /// Read the current state.
    Snapshot {
        /// Receives the snapshot.
        reply: oneshot::Sender<SequencerSnapshot>,
    },

    /// Tear the buffer down and stop the task.
    Shutdown {
        /// Acknowledgement, sent before the task exits.
        reply: oneshot::Sender<()>,
    },
}

/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Read-only views of buffer state for diagnostics and tests.

use serde::{Deserialize, Serialize};

/// Running counters kept by a [`ReorderBuffer`](super::ReorderBuffer).
///
/// Counters survive `reset` and `clear`; `teardown` zeroes them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencerStats {
    /// `Ready` dispatches, however they were triggered.
    pub dispatched: u64,
    /// Of those, releases from the held map by cascade drain.
    pub cascaded: u64,
    /// Of those, releases forced by a staleness timeout.
    pub forced: u64,
    /// Arrivals stored in the held map.
    pub held: u64,
    /// Arrivals below the cursor.
    pub stale: u64,
    /// Future arrivals already held.
    pub duplicates: u64,
    /// Gap notifications.
    pub gaps: u64,
    /// Arrivals lost to capacity.
    pub overflows: u64,
    /// Observer callbacks that panicked.
    pub observer_failures: u64,
}

/// Point-in-time view of a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencerSnapshot {
    /// Current cursor.
    pub next_expected: u64,
    /// Held sequence numbers, ascending.
    pub held: Vec<u64>,
    /// Counters at the time of the snapshot.
    pub stats: SequencerStats,
}

impl SequencerSnapshot {
    /// Number of held events.
    #[inline]
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.held.len()
    }

    /// Lowest held sequence, if any.
    #[inline]
    #[must_use]
    pub fn first_held(&self) -> Option<u64> {
        self.held.first().copied()
    }
}

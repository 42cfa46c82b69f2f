/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Submission outcomes.
//!
//! `submit` never fails. What happened to an arrival is reported back as a
//! [`SubmitOutcome`], in addition to whatever notifications it triggered.

use serde::{Deserialize, Serialize};

/// What the buffer did with a submitted event.
///
/// # Examples
///
/// ```
/// use reorder_rs::SubmitOutcome;
///
/// let outcome = SubmitOutcome::Dispatched { released: 3 };
/// assert!(outcome.is_accepted());
/// assert_eq!(outcome.released(), 3);
/// assert!(!SubmitOutcome::Overflow.is_accepted());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// The event filled the cursor and was released, followed by any
    /// contiguous held events. `released` counts all of them.
    Dispatched {
        /// Number of `Ready` dispatches this submission caused.
        released: usize,
    },

    /// The event is ahead of the cursor and now waits in the buffer.
    Held,

    /// The event is below the cursor and was dropped.
    Stale,

    /// The same future sequence is already held; the arrival was dropped.
    Duplicate,

    /// The buffer was full and the event was lost.
    Overflow,
}

impl SubmitOutcome {
    /// Returns `true` if the event was dispatched or held.
    #[inline]
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Dispatched { .. } | Self::Held)
    }

    /// Number of events released by this submission.
    #[inline]
    #[must_use]
    pub fn released(&self) -> usize {
        match self {
            Self::Dispatched { released } => *released,
            _ => 0,
        }
    }
}

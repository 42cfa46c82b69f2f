/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Event and notification types.
//!
//! [`BufferedEvent`] is an arrival waiting in the buffer for its
//! predecessors. Everything the buffer reports to the outside world is a
//! [`Notification`], tagged by an [`EventKind`] that observers subscribe to.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tokio::time::Instant;

/// A pending, not-yet-dispatchable event.
#[derive(Debug, Clone)]
pub struct BufferedEvent<P = Value> {
    /// Intended delivery position.
    pub sequence: u64,

    /// Event kind, opaque to the buffer.
    pub name: String,

    /// Opaque payload, passed through unmodified.
    pub payload: P,

    /// When the event entered the buffer. Only used for staleness.
    pub enqueued_at: Instant,
}

impl<P> BufferedEvent<P> {
    /// Creates a buffered event stamped with the current time.
    #[must_use]
    pub fn new(sequence: u64, name: String, payload: P) -> Self {
        Self {
            sequence,
            name,
            payload,
            enqueued_at: Instant::now(),
        }
    }

    /// Converts into the event handed to `Ready` observers.
    #[must_use]
    pub fn into_ready(self) -> ReadyEvent<P> {
        ReadyEvent {
            sequence: self.sequence,
            name: self.name,
            payload: self.payload,
        }
    }
}

/// An event released in order.
///
/// # Examples
///
/// ```
/// use reorder_rs::ReadyEvent;
///
/// let event = ReadyEvent {
///     sequence: 4,
///     name: "playlist.advanced".to_string(),
///     payload: serde_json::json!({"track": 2}),
/// };
/// assert_eq!(event.sequence, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyEvent<P = Value> {
    /// Delivery position.
    pub sequence: u64,
    /// Event kind.
    pub name: String,
    /// Untouched payload.
    pub payload: P,
}

/// An arrival skipped over one or more sequence numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapEvent {
    /// The cursor at the time of arrival.
    pub expected: u64,
    /// The sequence that arrived.
    pub received: u64,
    /// How many sequence numbers are missing in between.
    pub gap: u64,
}

/// A future arrival was refused because the buffer was full.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverflowEvent {
    /// The refused sequence.
    pub sequence: u64,
    /// Its event kind.
    pub name: String,
    /// The capacity that was exhausted.
    pub buffer_size: usize,
}

/// An arrival below the cursor was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleEvent {
    /// The obsolete sequence.
    pub sequence: u64,
    /// The cursor at the time of arrival.
    pub next_expected: u64,
}

/// Notification channel tags observers subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// In-order delivery.
    Ready,
    /// Sequence gap detected.
    Gap,
    /// Arrival refused, buffer full.
    Overflow,
    /// Obsolete or duplicate arrival dropped.
    Stale,
}

impl EventKind {
    /// All channels, in registry order.
    pub const ALL: [EventKind; 4] = [
        EventKind::Ready,
        EventKind::Gap,
        EventKind::Overflow,
        EventKind::Stale,
    ];

    /// Lowercase tag name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Gap => "gap",
            Self::Overflow => "overflow",
            Self::Stale => "stale",
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Ready => 0,
            Self::Gap => 1,
            Self::Overflow => 2,
            Self::Stale => 3,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the buffer reports to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Notification<P = Value> {
    /// An event released in order.
    Ready(ReadyEvent<P>),
    /// A gap was detected on arrival.
    Gap(GapEvent),
    /// A future arrival was lost to capacity.
    Overflow(OverflowEvent),
    /// An obsolete arrival was dropped.
    Stale(StaleEvent),
}

impl<P> Notification<P> {
    /// The channel this notification is delivered on.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Ready(_) => EventKind::Ready,
            Self::Gap(_) => EventKind::Gap,
            Self::Overflow(_) => EventKind::Overflow,
            Self::Stale(_) => EventKind::Stale,
        }
    }

    /// Returns the ready event, if this is one.
    #[must_use]
    pub fn as_ready(&self) -> Option<&ReadyEvent<P>> {
        match self {
            Self::Ready(event) => Some(event),
            _ => None,
        }
    }
}

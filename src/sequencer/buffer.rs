/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Reordering buffer.
//!
//! This module provides [`ReorderBuffer`], the synchronous state machine that
//! turns an unordered stream of `(sequence, name, payload)` arrivals into a
//! strictly increasing, gapless stream of `Ready` notifications.

use super::config::{ConfigError, SequencerConfig};
use super::event::{
    BufferedEvent, EventKind, GapEvent, Notification, OverflowEvent, ReadyEvent, StaleEvent,
};
use super::observer::{ObserverId, ObserverRegistry};
use super::receipt::SubmitOutcome;
use super::snapshot::{SequencerSnapshot, SequencerStats};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use tokio_util::time::DelayQueue;
use tokio_util::time::delay_queue::Key;
use tracing::{debug, trace, warn};

/// A held event together with its staleness timer.
struct HeldEntry<P> {
    event: BufferedEvent<P>,
    timer: Key,
}

/// A single-owner buffer that restores delivery order.
///
/// The buffer keeps a cursor (`next_expected`). An arrival matching the
/// cursor is released at once, followed by every held event that has become
/// contiguous. Arrivals ahead of the cursor are held, up to
/// `max_buffer_size` of them, each with its own staleness timer. Arrivals
/// below the cursor are dropped.
///
/// All mutating methods take `&mut self` and run to completion, cascade
/// drains included. Timers are [`DelayQueue`] entries, so the buffer must be
/// used inside a tokio runtime with the time driver enabled; the timers only
/// fire while someone awaits [`expire_next`](Self::expire_next).
///
/// # Examples
///
/// ```
/// use reorder_rs::{ReorderBuffer, SequencerConfig, SubmitOutcome};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut buffer = ReorderBuffer::new(SequencerConfig::default()).unwrap();
///
/// assert_eq!(buffer.submit(2, "b", serde_json::Value::Null), SubmitOutcome::Held);
/// assert_eq!(buffer.submit(1, "a", serde_json::Value::Null), SubmitOutcome::Held);
/// assert_eq!(
///     buffer.submit(0, "start", serde_json::Value::Null),
///     SubmitOutcome::Dispatched { released: 3 }
/// );
/// assert_eq!(buffer.next_expected(), 3);
/// assert!(buffer.is_empty());
/// # }
/// ```
pub struct ReorderBuffer<P = Value> {
    config: SequencerConfig,

    /// The sequence number the buffer is waiting for.
    next_expected: u64,

    /// Set once `u64::MAX` has been released; every later arrival is stale.
    exhausted: bool,

    /// Future arrivals, keyed by sequence. Never contains a key below
    /// `next_expected`.
    held: BTreeMap<u64, HeldEntry<P>>,

    /// One staleness timer per held entry, yielding its sequence.
    timers: DelayQueue<u64>,

    observers: ObserverRegistry<P>,
    stats: SequencerStats,
}

impl<P> ReorderBuffer<P> {
    /// Creates an empty buffer with its cursor at `config.origin`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration has a zero bound.
    pub fn new(config: SequencerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            next_expected: config.origin,
            exhausted: false,
            held: BTreeMap::new(),
            timers: DelayQueue::new(),
            observers: ObserverRegistry::default(),
            stats: SequencerStats::default(),
        })
    }

    /// Registers an observer for one notification channel.
    ///
    /// Observers of the same channel run in registration order. A panic in
    /// one of them is caught, logged and counted; the others still run.
    pub fn on<F>(&mut self, kind: EventKind, callback: F) -> ObserverId
    where
        F: Fn(&Notification<P>) + Send + Sync + 'static,
    {
        self.observers.on(kind, callback)
    }

    /// Unregisters an observer. Returns `false` if it was not registered.
    pub fn off(&mut self, id: ObserverId) -> bool {
        self.observers.off(id)
    }

    /// Number of observers registered for `kind`.
    #[must_use]
    pub fn observer_count(&self, kind: EventKind) -> usize {
        self.observers.count(kind)
    }

    /// Feeds one arrival into the buffer.
    ///
    /// - `sequence == next_expected`: released immediately, then any held
    ///   events that are now contiguous are released too.
    /// - `sequence < next_expected`: dropped and reported on `Stale`.
    /// - `sequence > next_expected`: a `Gap` is reported if it skips more
    ///   than one position; the event is then held, or refused with an
    ///   `Overflow` if the buffer is full.
    pub fn submit(&mut self, sequence: u64, name: impl Into<String>, payload: P) -> SubmitOutcome {
        let name = name.into();
        let position = if self.exhausted {
            Ordering::Less
        } else {
            sequence.cmp(&self.next_expected)
        };
        match position {
            Ordering::Equal => {
                self.advance_past(sequence);
                self.dispatch(ReadyEvent {
                    sequence,
                    name,
                    payload,
                });
                let released = 1 + self.drain();
                SubmitOutcome::Dispatched { released }
            }
            Ordering::Less => {
                self.stats.stale += 1;
                debug!(
                    sequence,
                    next_expected = self.next_expected,
                    "dropping stale arrival"
                );
                self.emit(Notification::Stale(StaleEvent {
                    sequence,
                    next_expected: self.next_expected,
                }));
                SubmitOutcome::Stale
            }
            Ordering::Greater => self.hold(sequence, name, payload),
        }
    }

    fn hold(&mut self, sequence: u64, name: String, payload: P) -> SubmitOutcome {
        if self.held.contains_key(&sequence) {
            self.stats.duplicates += 1;
            debug!(sequence, "dropping duplicate of a held arrival");
            return SubmitOutcome::Duplicate;
        }

        let expected = self.next_expected;
        if sequence - expected > 1 {
            let gap = sequence - expected - 1;
            self.stats.gaps += 1;
            debug!(expected, received = sequence, gap, "sequence gap detected");
            self.emit(Notification::Gap(GapEvent {
                expected,
                received: sequence,
                gap,
            }));
        }

        if self.held.len() >= self.config.max_buffer_size {
            self.stats.overflows += 1;
            warn!(
                sequence,
                buffer_size = self.config.max_buffer_size,
                "reorder buffer full, dropping arrival"
            );
            self.emit(Notification::Overflow(OverflowEvent {
                sequence,
                name,
                buffer_size: self.config.max_buffer_size,
            }));
            return SubmitOutcome::Overflow;
        }

        let timer = self.timers.insert(sequence, self.config.max_wait_time);
        self.held.insert(
            sequence,
            HeldEntry {
                event: BufferedEvent::new(sequence, name, payload),
                timer,
            },
        );
        self.stats.held += 1;
        trace!(sequence, held = self.held.len(), "holding arrival");
        SubmitOutcome::Held
    }

    /// Waits for the next staleness timer and forces its event through.
    ///
    /// Returns the forced sequence, or `None` right away when nothing is
    /// held. Cancel-safe: dropping the future before it completes loses no
    /// timer.
    pub async fn expire_next(&mut self) -> Option<u64> {
        let expired = std::future::poll_fn(|cx| self.timers.poll_expired(cx)).await?;
        let sequence = expired.into_inner();
        // The timer key is spent; the entry must not cancel it again.
        if let Some(entry) = self.held.remove(&sequence) {
            self.force_through(entry.event);
        }
        Some(sequence)
    }

    /// Forces the held event at `sequence` through without waiting for its
    /// timer. Returns how many events were released.
    ///
    /// Does nothing if `sequence` is below the cursor or not held.
    pub fn force_advance(&mut self, sequence: u64) -> usize {
        if self.exhausted || sequence < self.next_expected {
            return 0;
        }
        match self.held.remove(&sequence) {
            Some(entry) => {
                self.timers.remove(&entry.timer);
                self.force_through(entry.event)
            }
            None => 0,
        }
    }

    /// Releases `event` past the gap in front of it.
    ///
    /// Held events below it go first, in ascending order, so the dispatch
    /// order stays increasing.
    fn force_through(&mut self, event: BufferedEvent<P>) -> usize {
        let sequence = event.sequence;
        warn!(
            sequence,
            next_expected = self.next_expected,
            waited_ms = u64::try_from(event.enqueued_at.elapsed().as_millis()).unwrap_or(u64::MAX),
            "forcing stale event past sequence gap"
        );

        let later = self.held.split_off(&sequence);
        let earlier = std::mem::replace(&mut self.held, later);
        let mut released = 0;
        for (_, entry) in earlier {
            self.timers.remove(&entry.timer);
            self.advance_past(entry.event.sequence);
            self.stats.forced += 1;
            self.dispatch(entry.event.into_ready());
            released += 1;
        }

        if sequence >= self.next_expected {
            self.advance_past(sequence);
        }
        self.stats.forced += 1;
        self.dispatch(event.into_ready());
        released + 1 + self.drain()
    }

    /// Releases held events for as long as the cursor finds one.
    fn drain(&mut self) -> usize {
        let mut released = 0;
        while !self.exhausted {
            let Some(entry) = self.held.remove(&self.next_expected) else {
                break;
            };
            self.timers.remove(&entry.timer);
            self.advance_past(entry.event.sequence);
            self.stats.cascaded += 1;
            self.dispatch(entry.event.into_ready());
            released += 1;
        }
        released
    }

    /// Moves the cursor past `sequence`. Releasing `u64::MAX` closes the
    /// sequence space instead of wrapping.
    fn advance_past(&mut self, sequence: u64) {
        match sequence.checked_add(1) {
            Some(next) => self.next_expected = next,
            None => {
                self.next_expected = u64::MAX;
                self.exhausted = true;
            }
        }
    }

    fn dispatch(&mut self, event: ReadyEvent<P>) {
        self.stats.dispatched += 1;
        trace!(sequence = event.sequence, name = %event.name, "dispatching ready event");
        self.emit(Notification::Ready(event));
    }

    fn emit(&mut self, notification: Notification<P>) {
        self.stats.observer_failures += self.observers.emit(&notification);
    }

    /// Moves the cursor back to the configured origin and drops every held
    /// event. Observers are kept.
    pub fn reset(&mut self) {
        self.reset_to(self.config.origin);
    }

    /// Moves the cursor to `cursor` and drops every held event. Observers
    /// are kept.
    ///
    /// Meant for a transport that resynchronized and started a new
    /// sequence space.
    pub fn reset_to(&mut self, cursor: u64) {
        debug!(
            from = self.next_expected,
            to = cursor,
            discarded = self.held.len(),
            "resetting reorder buffer"
        );
        self.discard_held();
        self.next_expected = cursor;
        self.exhausted = false;
    }

    /// Drops every held event and cancels its timer. The cursor stays.
    pub fn clear(&mut self) {
        debug!(discarded = self.held.len(), "clearing held events");
        self.discard_held();
    }

    /// Drops held events and observers and returns the cursor to origin.
    ///
    /// Safe to call any number of times.
    pub fn teardown(&mut self) {
        self.discard_held();
        self.observers.clear();
        self.next_expected = self.config.origin;
        self.exhausted = false;
        self.stats = SequencerStats::default();
    }

    fn discard_held(&mut self) {
        self.held.clear();
        self.timers.clear();
    }

    /// The sequence number the buffer is waiting for. Stays at `u64::MAX`
    /// once that sequence has been released.
    #[inline]
    #[must_use]
    pub fn next_expected(&self) -> u64 {
        self.next_expected
    }

    /// Number of held events.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.held.len()
    }

    /// Returns `true` if nothing is held.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    /// Held sequence numbers, ascending.
    #[must_use]
    pub fn held_sequences(&self) -> Vec<u64> {
        self.held.keys().copied().collect()
    }

    /// The held event at `sequence`, if any.
    #[must_use]
    pub fn get(&self, sequence: u64) -> Option<&BufferedEvent<P>> {
        self.held.get(&sequence).map(|entry| &entry.event)
    }

    /// Number of pending staleness timers. Always equals [`len`](Self::len).
    #[inline]
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// The configuration the buffer was built with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Running counters. See [`SequencerStats`].
    #[inline]
    #[must_use]
    pub fn stats(&self) -> SequencerStats {
        self.stats
    }

    /// Captures cursor, held sequences and counters.
    #[must_use]
    pub fn snapshot(&self) -> SequencerSnapshot {
        SequencerSnapshot {
            next_expected: self.next_expected,
            held: self.held_sequences(),
            stats: self.stats,
        }
    }
}

impl<P> fmt::Debug for ReorderBuffer<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReorderBuffer")
            .field("next_expected", &self.next_expected)
            .field("exhausted", &self.exhausted)
            .field("held", &self.held_sequences())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Observer registry with per-callback failure isolation.

use super::event::{EventKind, Notification};
use serde_json::Value;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::error;

/// Type alias for observer callbacks.
type Observer<P> = Arc<dyn Fn(&Notification<P>) + Send + Sync>;

/// Handle returned by `on`, used to unregister the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Callbacks per [`EventKind`], kept in registration order.
pub(crate) struct ObserverRegistry<P = Value> {
    channels: [Vec<(ObserverId, Observer<P>)>; 4],
    next_id: u64,
}

impl<P> Default for ObserverRegistry<P> {
    fn default() -> Self {
        Self {
            channels: [Vec::new(), Vec::new(), Vec::new(), Vec::new()],
            next_id: 0,
        }
    }
}

impl<P> ObserverRegistry<P> {
    pub(crate) fn on<F>(&mut self, kind: EventKind, callback: F) -> ObserverId
    where
        F: Fn(&Notification<P>) + Send + Sync + 'static,
    {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.channels[kind.index()].push((id, Arc::new(callback)));
        id
    }

    pub(crate) fn off(&mut self, id: ObserverId) -> bool {
        for channel in &mut self.channels {
            if let Some(pos) = channel.iter().position(|(existing, _)| *existing == id) {
                channel.remove(pos);
                return true;
            }
        }
        false
    }

    pub(crate) fn count(&self, kind: EventKind) -> usize {
        self.channels[kind.index()].len()
    }

    pub(crate) fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.clear();
        }
    }

    /// Delivers `notification` to every observer of its kind.
    ///
    /// A panicking observer is logged and skipped. Returns how many
    /// observers failed.
    pub(crate) fn emit(&self, notification: &Notification<P>) -> u64 {
        let kind = notification.kind();
        let mut failures = 0;
        for (id, observer) in &self.channels[kind.index()] {
            if catch_unwind(AssertUnwindSafe(|| observer(notification))).is_err() {
                failures += 1;
                error!(observer = id.0, %kind, "observer panicked during dispatch");
            }
        }
        failures
    }
}

/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Core Sequencer implementation.
//!
//! This module provides the [`Sequencer`] task that owns a [`ReorderBuffer`]
//! and serializes every operation on it: submissions and lifecycle commands
//! from any number of [`SequencerClient`]s, and the staleness timers of the
//! held events.

use super::buffer::ReorderBuffer;
use super::command::SequencerCommand;
use super::config::{ConfigError, SequencerConfig};
use super::event::{EventKind, Notification};
use super::observer::ObserverId;
use super::receipt::SubmitOutcome;
use super::snapshot::SequencerSnapshot;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, trace};

/// Default capacity of the command channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// A single-writer task that owns a [`ReorderBuffer`].
///
/// Commands are received over a bounded channel and applied in arrival
/// order. Expired staleness timers are handled in the same loop, ahead of
/// queued commands, so a forced advance is never starved by a busy
/// producer. Observers are registered before the task is spawned.
///
/// # Examples
///
/// ```
/// use reorder_rs::{EventKind, Notification, Sequencer, SequencerConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut sequencer = Sequencer::new(SequencerConfig::default())?;
/// sequencer.on(EventKind::Ready, |n: &Notification| {
///     if let Some(ready) = n.as_ready() {
///         println!("{} {}", ready.sequence, ready.name);
///     }
/// });
///
/// let client = sequencer.client();
/// let handle = sequencer.spawn();
///
/// client.submit(0, "nfc.tag", serde_json::Value::Null).await?;
/// assert_eq!(client.snapshot().await?.next_expected, 1);
///
/// client.shutdown().await?;
/// handle.wait().await?;
/// # Ok(())
/// # }
/// ```
pub struct Sequencer<P = Value> {
    /// The buffer, moved into the task on spawn.
    buffer: ReorderBuffer<P>,

    /// Channel for submitting commands.
    command_tx: mpsc::Sender<SequencerCommand<P>>,

    /// Channel for receiving commands (used by the event loop).
    command_rx: mpsc::Receiver<SequencerCommand<P>>,
}

impl<P: Send + 'static> Sequencer<P> {
    /// Creates a sequencer with the default channel capacity.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn new(config: SequencerConfig) -> Result<Self, ConfigError> {
        Self::with_channel_capacity(config, DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a sequencer with a specific command channel capacity.
    ///
    /// # Arguments
    ///
    /// * `config` - Buffer configuration
    /// * `capacity` - Channel buffer size (backpressure when full, at least 1)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn with_channel_capacity(
        config: SequencerConfig,
        capacity: usize,
    ) -> Result<Self, ConfigError> {
        let buffer = ReorderBuffer::new(config)?;
        let (command_tx, command_rx) = mpsc::channel(capacity.max(1));
        Ok(Self {
            buffer,
            command_tx,
            command_rx,
        })
    }

    /// Registers an observer. See [`ReorderBuffer::on`].
    pub fn on<F>(&mut self, kind: EventKind, callback: F) -> ObserverId
    where
        F: Fn(&Notification<P>) + Send + Sync + 'static,
    {
        self.buffer.on(kind, callback)
    }

    /// Unregisters an observer.
    pub fn off(&mut self, id: ObserverId) -> bool {
        self.buffer.off(id)
    }

    /// Returns a new client for this sequencer.
    #[must_use]
    pub fn client(&self) -> SequencerClient<P> {
        SequencerClient {
            command_tx: self.command_tx.clone(),
        }
    }

    /// Spawns the event loop on a new task.
    ///
    /// The loop ends on [`SequencerClient::shutdown`] or once every client
    /// has been dropped; either way the buffer is torn down first.
    #[must_use]
    pub fn spawn(self) -> SequencerHandle {
        let Self {
            buffer, command_rx, ..
        } = self;
        let handle = tokio::spawn(run_loop(buffer, command_rx));
        SequencerHandle { handle }
    }
}

/// Runs the main event loop (single-threaded).
async fn run_loop<P>(
    mut buffer: ReorderBuffer<P>,
    mut command_rx: mpsc::Receiver<SequencerCommand<P>>,
) {
    info!(
        next_expected = buffer.next_expected(),
        "sequencer started"
    );

    loop {
        tokio::select! {
            biased;
            Some(sequence) = buffer.expire_next() => {
                trace!(sequence, "staleness timer fired");
            }
            command = command_rx.recv() => {
                let Some(command) = command else { break };
                if !apply(&mut buffer, command) {
                    break;
                }
            }
        }
    }

    buffer.teardown();
    info!("sequencer stopped");
}

/// Applies one command. Returns `false` when the loop must stop.
fn apply<P>(buffer: &mut ReorderBuffer<P>, command: SequencerCommand<P>) -> bool {
    match command {
        SequencerCommand::Submit {
            sequence,
            name,
            payload,
            reply,
        } => {
            let _ = reply.send(buffer.submit(sequence, name, payload));
        }
        SequencerCommand::Reset { cursor, reply } => {
            match cursor {
                Some(cursor) => buffer.reset_to(cursor),
                None => buffer.reset(),
            }
            let _ = reply.send(());
        }
        SequencerCommand::Clear { reply } => {
            buffer.clear();
            let _ = reply.send(());
        }
        SequencerCommand::Snapshot { reply } => {
            let _ = reply.send(buffer.snapshot());
        }
        SequencerCommand::Shutdown { reply } => {
            buffer.teardown();
            let _ = reply.send(());
            return false;
        }
    }
    true
}

/// Cloneable producer-side handle to a spawned [`Sequencer`].
pub struct SequencerClient<P = Value> {
    command_tx: mpsc::Sender<SequencerCommand<P>>,
}

impl<P> Clone for SequencerClient<P> {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
        }
    }
}

impl<P> std::fmt::Debug for SequencerClient<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequencerClient")
            .field("closed", &self.command_tx.is_closed())
            .finish()
    }
}

impl<P> SequencerClient<P> {
    /// Submits one arrival and waits for the buffer's verdict.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Shutdown`] if the sequencer task is gone.
    pub async fn submit(
        &self,
        sequence: u64,
        name: impl Into<String>,
        payload: P,
    ) -> Result<SubmitOutcome, SequencerError> {
        let name = name.into();
        self.request(|reply| SequencerCommand::Submit {
            sequence,
            name,
            payload,
            reply,
        })
        .await
    }

    /// Resets the cursor to the configured origin.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Shutdown`] if the sequencer task is gone.
    pub async fn reset(&self) -> Result<(), SequencerError> {
        self.request(|reply| SequencerCommand::Reset {
            cursor: None,
            reply,
        })
        .await
    }

    /// Resets the cursor to `cursor`.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Shutdown`] if the sequencer task is gone.
    pub async fn reset_to(&self, cursor: u64) -> Result<(), SequencerError> {
        self.request(|reply| SequencerCommand::Reset {
            cursor: Some(cursor),
            reply,
        })
        .await
    }

    /// Discards held events without moving the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Shutdown`] if the sequencer task is gone.
    pub async fn clear(&self) -> Result<(), SequencerError> {
        self.request(|reply| SequencerCommand::Clear { reply }).await
    }

    /// Reads cursor, held sequences and counters.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Shutdown`] if the sequencer task is gone.
    pub async fn snapshot(&self) -> Result<SequencerSnapshot, SequencerError> {
        self.request(|reply| SequencerCommand::Snapshot { reply })
            .await
    }

    /// Tears the buffer down and stops the task.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Shutdown`] if the task had already stopped.
    pub async fn shutdown(&self) -> Result<(), SequencerError> {
        self.request(|reply| SequencerCommand::Shutdown { reply })
            .await
    }

    /// Returns `true` once the sequencer task has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.command_tx.is_closed()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SequencerCommand<P>,
    ) -> Result<T, SequencerError> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(command(tx))
            .await
            .map_err(|_| SequencerError::Shutdown)?;
        rx.await.map_err(|_| SequencerError::Shutdown)
    }
}

/// Handle to a spawned sequencer task.
pub struct SequencerHandle {
    handle: tokio::task::JoinHandle<()>,
}

impl SequencerHandle {
    /// Waits for the sequencer to shut down.
    pub async fn wait(self) -> Result<(), tokio::task::JoinError> {
        self.handle.await
    }

    /// Returns `true` if the task has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Errors that can occur when interacting with the Sequencer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SequencerError {
    /// The sequencer has been shut down.
    #[error("sequencer has been shut down")]
    Shutdown,
}

/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Reorders an NDJSON event stream.
//!
//! Reads `{"sequence": u64, "name": string, "payload": any}` lines from
//! stdin, runs them through a [`Sequencer`] and writes every released event
//! as one JSON line to stdout. Gap, overflow and stale diagnostics go to
//! stderr through `tracing`.
//!
//! Configuration comes from `REORDER_ORIGIN`, `REORDER_MAX_BUFFER_SIZE` and
//! `REORDER_MAX_WAIT_MS`; log verbosity from `RUST_LOG`.
//!
//! ```text
//! printf '%s\n' '{"sequence":1,"name":"b"}' '{"sequence":0,"name":"a"}' \
//!     | cargo run -p reorder-demos --bin ndjson_reorder
//! ```

use reorder_rs::{EventKind, Notification, ReadyEvent, Sequencer, SequencerConfig};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
struct Arrival {
    sequence: u64,
    name: String,
    #[serde(default)]
    payload: Value,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = SequencerConfig::from_env()?;
    info!(?config, "starting ndjson reorder");

    let mut sequencer: Sequencer = Sequencer::new(config)?;
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ReadyEvent>();
    sequencer.on(EventKind::Ready, move |n| {
        if let Notification::Ready(event) = n {
            let _ = out_tx.send(event.clone());
        }
    });
    sequencer.on(EventKind::Gap, |n| {
        if let Notification::Gap(gap) = n {
            warn!(expected = gap.expected, received = gap.received, missing = gap.gap, "gap");
        }
    });
    sequencer.on(EventKind::Overflow, |n| {
        if let Notification::Overflow(overflow) = n {
            warn!(sequence = overflow.sequence, name = %overflow.name, "event lost to overflow");
        }
    });
    sequencer.on(EventKind::Stale, |n| {
        if let Notification::Stale(stale) = n {
            debug!(sequence = stale.sequence, next_expected = stale.next_expected, "stale event");
        }
    });

    let client = sequencer.client();
    let handle = sequencer.spawn();

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(event) = out_rx.recv().await {
            let mut line = serde_json::to_vec(&event)?;
            line.push(b'\n');
            stdout.write_all(&line).await?;
        }
        stdout.flush().await?;
        Ok::<_, std::io::Error>(())
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_no = 0u64;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Arrival>(&line) {
            Ok(arrival) => {
                client
                    .submit(arrival.sequence, arrival.name, arrival.payload)
                    .await?;
            }
            Err(err) => warn!(line = line_no, %err, "skipping malformed line"),
        }
    }

    // Held events still get their staleness window before shutdown.
    if !client.snapshot().await?.held.is_empty() {
        tokio::time::sleep(config.max_wait_time + Duration::from_millis(10)).await;
    }

    let snapshot = client.snapshot().await?;
    info!(
        next_expected = snapshot.next_expected,
        stats = ?snapshot.stats,
        "input exhausted"
    );

    client.shutdown().await?;
    handle.wait().await?;
    writer.await??;
    Ok(())
}

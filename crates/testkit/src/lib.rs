#![warn(missing_docs)]
//! Deterministic testing surfaces for the ambient engine: scripted scenes, a
//! tick harness, JSONL event logs and golden snapshots.

mod fixtures;
mod harness;
mod metrics;
mod snapshot;

use anyhow::{Context, Result};
use mdambient_core::SimTick;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

pub use fixtures::*;
pub use harness::*;
pub use metrics::*;
pub use snapshot::*;

/// One line of a headless event log.
#[derive(Debug, Serialize)]
pub struct EventRecord<'a> {
    /// Tick the event belongs to.
    pub tick: SimTick,
    /// Short kind label such as `tick` or `reload`.
    pub kind: &'a str,
    /// Kind specific JSON payload.
    pub payload: serde_json::Value,
}

/// Writes newline-delimited JSON events.
pub struct JsonlSink {
    out: BufWriter<File>,
    written: usize,
}

impl JsonlSink {
    /// Create a sink at `path`, creating parent directories if needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create event log {}", path.display()))?;
        Ok(Self {
            out: BufWriter::new(file),
            written: 0,
        })
    }

    /// Append an event.
    pub fn write(&mut self, event: &EventRecord<'_>) -> Result<()> {
        serde_json::to_writer(&mut self.out, event)?;
        self.out.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Events written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush buffered lines to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

impl Drop for JsonlSink {
    fn drop(&mut self) {
        let _ = self.out.flush();
    }
}

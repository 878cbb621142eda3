//! Streaming execution trace: one JSON object per line.
//!
//! Events flow through a channel to a dedicated writer thread, so trace I/O
//! never blocks the scheduler. Each line is flushed whole; a crash mid-write
//! can at worst truncate the final line.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::mpsc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::gateway::{ModelStats, TokenUsage};

/// One entry of the current top of the ordering, as carried in trial events.
#[derive(Debug, Clone, Serialize)]
pub struct TraceRankEntry {
    pub key: String,
    pub score: f64,
    pub exposure: u32,
}

/// A single trace line.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEvent {
    /// Emitted after each committed trial, in completion order.
    Trial {
        timestamp_ms: i64,
        trial_index: usize,
        round: usize,
        live_documents: usize,
        elbow: Option<usize>,
        degraded: bool,
        failed_batches: usize,
        total_batches: usize,
        usage: TokenUsage,
        wall_time_ms: u64,
        top: Vec<TraceRankEntry>,
    },
    /// Emitted after each trial when model comparison is active.
    ModelPerf {
        timestamp_ms: i64,
        models: Vec<ModelStats>,
    },
    /// Emitted once on fatal errors, as the final line.
    Fatal { timestamp_ms: i64, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(String),
    #[error("trace channel closed")]
    Closed,
    #[error("trace worker failed: {0}")]
    Join(String),
}

/// Append-only sink for trace events.
pub trait TraceSink: Send + Sync {
    fn record(&self, event: TraceEvent) -> Result<(), TraceError>;
}

/// Sink writing JSON Lines to a file via a background worker thread.
#[derive(Clone)]
pub struct JsonlTraceSink {
    sender: mpsc::Sender<TraceEvent>,
}

pub struct TraceWorker {
    handle: Option<std::thread::JoinHandle<Result<(), TraceError>>>,
}

impl TraceWorker {
    /// Wait for the writer to drain. Drop all sink clones first.
    pub fn join(mut self) -> Result<(), TraceError> {
        match self.handle.take() {
            Some(handle) => match handle.join() {
                Ok(result) => result,
                Err(_) => Err(TraceError::Join("trace worker panicked".to_string())),
            },
            None => Ok(()),
        }
    }
}

impl JsonlTraceSink {
    pub fn new(path: impl AsRef<Path>) -> Result<(Self, TraceWorker), TraceError> {
        let file = std::fs::File::create(path)?;
        let (sender, receiver) = mpsc::channel::<TraceEvent>();
        let handle = std::thread::spawn(move || write_trace_loop(file, receiver));
        Ok((
            Self { sender },
            TraceWorker {
                handle: Some(handle),
            },
        ))
    }
}

impl TraceSink for JsonlTraceSink {
    fn record(&self, event: TraceEvent) -> Result<(), TraceError> {
        self.sender.send(event).map_err(|_| TraceError::Closed)
    }
}

fn write_trace_loop(
    file: std::fs::File,
    receiver: mpsc::Receiver<TraceEvent>,
) -> Result<(), TraceError> {
    let mut writer = BufWriter::new(file);
    for event in receiver {
        let line = serde_json::to_string(&event).map_err(|e| TraceError::Serde(e.to_string()))?;
        writeln!(writer, "{line}")?;
        // Line-atomic: readers may tail the file while the run is live.
        writer.flush()?;
    }
    Ok(())
}

pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

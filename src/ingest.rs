// Roomsense - Concurrent sensor telemetry aggregation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Ingestion loop: the single writer of the bounded history.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::{IngestError, SourceError};
use crate::history::BoundedHistory;
use crate::sample::Sample;
use crate::source::LineSource;

/// Default wait for a line before re-checking for shutdown.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(250);

/// Counters shared between the ingestion loop and status readers.
#[derive(Debug, Default)]
pub struct IngestStats {
    /// Lines pulled from the source
    pub lines_read: AtomicU64,
    /// Lines parsed and appended
    pub accepted: AtomicU64,
    /// Malformed lines discarded
    pub rejected: AtomicU64,
    /// Transient read failures skipped
    pub read_errors: AtomicU64,
    /// Whether the loop is running
    pub running: AtomicBool,
}

impl IngestStats {
    /// Plain copy of the counters.
    pub fn snapshot(&self) -> IngestStatsSnapshot {
        IngestStatsSnapshot {
            lines_read: self.lines_read.load(Ordering::SeqCst),
            accepted: self.accepted.load(Ordering::SeqCst),
            rejected: self.rejected.load(Ordering::SeqCst),
            read_errors: self.read_errors.load(Ordering::SeqCst),
            running: self.running.load(Ordering::SeqCst),
        }
    }
}

/// Point-in-time copy of [`IngestStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct IngestStatsSnapshot {
    pub lines_read: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub read_errors: u64,
    pub running: bool,
}

/// Cloneable handle requesting the loop to stop.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop after its current read.
    pub fn shutdown(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Why the loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Shutdown was requested
    Shutdown,
    /// The source closed permanently
    SourceClosed,
}

/// Pulls lines from a source, parses them and appends them to the history.
pub struct IngestionLoop<S: LineSource> {
    source: S,
    history: Arc<BoundedHistory>,
    poll_timeout: Duration,
    shutdown: ShutdownHandle,
    stats: Arc<IngestStats>,
}

impl<S: LineSource> IngestionLoop<S> {
    /// Create a loop over `source` feeding `history`.
    pub fn new(source: S, history: Arc<BoundedHistory>) -> Self {
        Self {
            source,
            history,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            shutdown: ShutdownHandle::new(),
            stats: Arc::new(IngestStats::default()),
        }
    }

    /// Set how long a single read may wait for data.
    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    /// Use an externally created shutdown handle.
    pub fn with_shutdown(mut self, shutdown: ShutdownHandle) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Handle that stops the loop.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Shared counters.
    pub fn stats(&self) -> Arc<IngestStats> {
        Arc::clone(&self.stats)
    }

    /// Handle one raw line. Returns whether it was appended.
    pub fn ingest_line(&self, line: &str) -> bool {
        self.stats.lines_read.fetch_add(1, Ordering::SeqCst);
        match Sample::parse(line) {
            Ok(sample) => {
                self.history.append(sample);
                self.stats.accepted.fetch_add(1, Ordering::SeqCst);
                true
            }
            Err(e) => {
                debug!("Discarding line: {}", e);
                self.stats.rejected.fetch_add(1, Ordering::SeqCst);
                false
            }
        }
    }

    /// Run until shutdown is requested or the source closes.
    ///
    /// The source is dropped (released) when this returns.
    pub fn run(mut self) -> Result<IngestOutcome, IngestError> {
        let name = self.source.describe();
        self.stats.running.store(true, Ordering::SeqCst);
        info!("Ingestion started from {}", name);

        let result = self.pump();

        self.stats.running.store(false, Ordering::SeqCst);
        let stats = self.stats.snapshot();
        match &result {
            Ok(IngestOutcome::Shutdown) => info!(
                "Ingestion from {} stopped: {} accepted, {} rejected",
                name, stats.accepted, stats.rejected
            ),
            Ok(IngestOutcome::SourceClosed) => warn!(
                "Source {} closed: {} accepted, {} rejected",
                name, stats.accepted, stats.rejected
            ),
            Err(e) => warn!("Ingestion from {} failed: {}", name, e),
        }
        result
    }

    fn pump(&mut self) -> Result<IngestOutcome, IngestError> {
        loop {
            if self.shutdown.is_shutdown() {
                return Ok(IngestOutcome::Shutdown);
            }

            match self.source.read_line(self.poll_timeout) {
                Ok(Some(line)) => {
                    self.ingest_line(&line);
                }
                // Idle: read_line already waited up to poll_timeout
                Ok(None) => {}
                Err(SourceError::Closed) => return Ok(IngestOutcome::SourceClosed),
                Err(SourceError::Read(reason)) => {
                    warn!("Read error on {}: {}", self.source.describe(), reason);
                    self.stats.read_errors.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(self.poll_timeout);
                }
                Err(e @ SourceError::Unavailable { .. }) => return Err(e.into()),
            }
        }
    }
}

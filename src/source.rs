// Roomsense - Concurrent sensor telemetry aggregation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Line source abstraction
//!
//! This module provides the [`LineSource`] trait the ingestion loop reads
//! from, and implementations for in-memory scripts, arbitrary byte readers
//! and (with the `serial` feature) serial ports.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};

use crate::error::SourceError;

/// Trait for line-oriented telemetry sources
pub trait LineSource {
    /// Whether a line can be read without waiting
    fn is_ready(&mut self) -> bool;

    /// Read one line, waiting at most `timeout` for it to arrive.
    ///
    /// Returns `Ok(None)` when no line arrived in time, and
    /// [`SourceError::Closed`] once the source is permanently exhausted.
    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, SourceError>;

    /// Human readable name for logs
    fn describe(&self) -> String;
}

impl<S: LineSource + ?Sized> LineSource for Box<S> {
    fn is_ready(&mut self) -> bool {
        (**self).is_ready()
    }

    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, SourceError> {
        (**self).read_line(timeout)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// A scripted in-memory source for tests and local replay
#[derive(Debug, Default)]
pub struct MemorySource {
    /// Pending items; `Err` entries simulate transient read failures
    pending: VecDeque<Result<String, SourceError>>,
    /// Whether the source reports closure once drained
    closed: bool,
}

impl MemorySource {
    /// Create an empty, open source
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source that yields `lines` then reports closure
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut source = Self::new();
        for line in lines {
            source.push_line(line);
        }
        source.close();
        source
    }

    /// Queue a line
    pub fn push_line(&mut self, line: impl Into<String>) {
        self.pending.push_back(Ok(line.into()));
    }

    /// Queue a transient read failure
    pub fn push_error(&mut self, reason: impl Into<String>) {
        self.pending.push_back(Err(SourceError::Read(reason.into())));
    }

    /// Report closure once the queued items are drained
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Number of queued items
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl LineSource for MemorySource {
    fn is_ready(&mut self) -> bool {
        !self.pending.is_empty()
    }

    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, SourceError> {
        match self.pending.pop_front() {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(e)) => Err(e),
            None if self.closed => Err(SourceError::Closed),
            None => {
                // Nothing can arrive while we hold &mut self
                thread::sleep(timeout);
                Ok(None)
            }
        }
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Read failures in a row after which a source counts as closed
pub const MAX_CONSECUTIVE_READ_ERRORS: u32 = 3;

/// Message from the reader thread
type ReaderItem = Result<String, SourceError>;

/// A source reading lines from any byte stream on a dedicated thread
///
/// The reader thread does the blocking I/O and hands complete lines over a
/// channel, so [`LineSource::read_line`] can wait with a timeout instead of
/// blocking indefinitely.
pub struct ReaderSource {
    name: String,
    rx: Receiver<ReaderItem>,
    /// Item peeked by `is_ready`
    peeked: Option<ReaderItem>,
    closed: bool,
    reader: Option<JoinHandle<()>>,
}

impl ReaderSource {
    /// Start reading lines from `reader` on a new thread
    pub fn spawn<R>(name: impl Into<String>, reader: R) -> Result<Self, SourceError>
    where
        R: Read + Send + 'static,
    {
        let name = name.into();
        let (tx, rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name(format!("roomsense-reader-{}", name))
            .spawn(move || {
                let mut reader = BufReader::new(reader);
                let mut buf = Vec::new();
                let mut consecutive_errors = 0u32;
                loop {
                    buf.clear();
                    let item = match reader.read_until(b'\n', &mut buf) {
                        Ok(0) => break,
                        Ok(_) => {
                            consecutive_errors = 0;
                            match String::from_utf8(buf.clone()) {
                                Ok(line) => Ok(line),
                                // Kept as a line so the parser rejects it like any other garbage
                                Err(_) => Ok(String::from_utf8_lossy(&buf).into_owned()),
                            }
                        }
                        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                        Err(e) => {
                            consecutive_errors += 1;
                            Err(SourceError::Read(e.to_string()))
                        }
                    };
                    if tx.send(item).is_err() {
                        // Receiver dropped: source released
                        break;
                    }
                    if consecutive_errors >= MAX_CONSECUTIVE_READ_ERRORS {
                        // Dropping the sender reports closure
                        break;
                    }
                }
            })
            .map_err(|e| SourceError::Unavailable {
                source_name: name.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            name,
            rx,
            peeked: None,
            closed: false,
            reader: Some(handle),
        })
    }

    /// Open a file (or FIFO / character device) and read lines from it
    pub fn open_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| SourceError::Unavailable {
            source_name: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::spawn(path.display().to_string(), file)
    }

    /// Read lines from standard input
    pub fn stdin() -> Result<Self, SourceError> {
        Self::spawn("stdin", std::io::stdin())
    }

    fn on_disconnect(&mut self) -> Result<Option<String>, SourceError> {
        if !self.closed {
            debug!("Reader for {} reached end of stream", self.name);
            self.closed = true;
            if let Some(handle) = self.reader.take() {
                if handle.join().is_err() {
                    warn!("Reader thread for {} panicked", self.name);
                }
            }
        }
        Err(SourceError::Closed)
    }
}

impl LineSource for ReaderSource {
    fn is_ready(&mut self) -> bool {
        if self.peeked.is_some() {
            return true;
        }
        match self.rx.try_recv() {
            Ok(item) => {
                self.peeked = Some(item);
                true
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => false,
        }
    }

    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, SourceError> {
        if let Some(item) = self.peeked.take() {
            return item.map(Some);
        }
        if self.closed {
            return Err(SourceError::Closed);
        }
        match self.rx.recv_timeout(timeout) {
            Ok(item) => item.map(Some),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => self.on_disconnect(),
        }
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

impl std::fmt::Debug for ReaderSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderSource")
            .field("name", &self.name)
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(feature = "serial")]
pub use serial::{SerialSource, DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT};

#[cfg(feature = "serial")]
mod serial {
    use super::*;
    use std::io::ErrorKind;

    /// Default baud rate of the reference board
    pub const DEFAULT_BAUD_RATE: u32 = 115_200;

    /// Default bound on a single blocking read
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

    /// A source reading lines from a serial port
    pub struct SerialSource {
        path: String,
        reader: BufReader<Box<dyn serialport::SerialPort>>,
        line: Vec<u8>,
        consecutive_errors: u32,
        closed: bool,
    }

    impl SerialSource {
        /// Open `path` at `baud_rate`; `timeout` bounds each blocking read
        pub fn open(path: &str, baud_rate: u32, timeout: Duration) -> Result<Self, SourceError> {
            let port = serialport::new(path, baud_rate)
                .timeout(timeout)
                .open()
                .map_err(|e| SourceError::Unavailable {
                    source_name: path.to_string(),
                    reason: e.to_string(),
                })?;

            Ok(Self {
                path: path.to_string(),
                reader: BufReader::new(port),
                line: Vec::new(),
                consecutive_errors: 0,
                closed: false,
            })
        }

        fn on_error(&mut self, reason: String) -> Result<Option<String>, SourceError> {
            self.consecutive_errors += 1;
            if self.consecutive_errors >= MAX_CONSECUTIVE_READ_ERRORS {
                warn!("Serial port {} failing repeatedly, closing: {}", self.path, reason);
                self.closed = true;
                return Err(SourceError::Closed);
            }
            Err(SourceError::Read(reason))
        }
    }

    impl LineSource for SerialSource {
        fn is_ready(&mut self) -> bool {
            !self.reader.buffer().is_empty()
                || self
                    .reader
                    .get_ref()
                    .bytes_to_read()
                    .map(|n| n > 0)
                    .unwrap_or(false)
        }

        fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, SourceError> {
            if self.closed {
                return Err(SourceError::Closed);
            }
            if let Err(e) = self.reader.get_mut().set_timeout(timeout) {
                return self.on_error(e.to_string());
            }

            // Partial lines survive a timeout in `self.line`
            match self.reader.read_until(b'\n', &mut self.line) {
                Ok(0) => {
                    self.closed = true;
                    Err(SourceError::Closed)
                }
                Ok(_) if self.line.ends_with(b"\n") => {
                    self.consecutive_errors = 0;
                    let line = String::from_utf8_lossy(&self.line).into_owned();
                    self.line.clear();
                    Ok(Some(line))
                }
                Ok(_) => {
                    self.consecutive_errors = 0;
                    Ok(None)
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => Ok(None),
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    self.closed = true;
                    Err(SourceError::Closed)
                }
                Err(e) => self.on_error(e.to_string()),
            }
        }

        fn describe(&self) -> String {
            self.path.clone()
        }
    }
}

//! Error types for Roomsense
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

/// Result type alias for Roomsense operations
pub type Result<T> = std::result::Result<T, RoomsenseError>;

/// Main error type for Roomsense operations
#[derive(Error, Debug)]
pub enum RoomsenseError {
    /// Parse error
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Source error
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// History error
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    /// Export error
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Ingestion error
    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),
}

/// Errors while parsing a raw telemetry line
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Line does not hold exactly three finite numbers
    #[error("Malformed line {line:?}: {reason}")]
    Malformed { line: String, reason: String },
}

impl ParseError {
    pub(crate) fn malformed(line: &str, reason: impl Into<String>) -> Self {
        ParseError::Malformed {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by a line source
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// Source could not be opened
    #[error("Source {source_name} unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },

    /// Source closed permanently
    #[error("Source closed")]
    Closed,

    /// Transient read failure
    #[error("Read error: {0}")]
    Read(String),
}

/// Errors related to the bounded history
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// History cannot hold zero samples
    #[error("History capacity must be greater than 0")]
    ZeroCapacity,
}

/// Errors during CSV export
#[derive(Error, Debug)]
pub enum ExportError {
    /// CSV serialization failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Destination could not be written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config value out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors terminating the ingestion loop abnormally
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IngestError {
    /// Source failed in a way the loop cannot recover from
    #[error("Source failure: {0}")]
    Source(#[from] SourceError),
}

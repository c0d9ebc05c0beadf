//! # Roomsense - Concurrent sensor telemetry aggregation
//!
//! Ingests a line-oriented stream of light / distance / temperature readings,
//! keeps a bounded rolling history per sensor, and derives averages, extrema,
//! smoothed trends and threshold alerts from it.
//!
//! ## Key Features
//!
//! - **Bounded memory**: fixed-capacity ring per channel, oldest value evicted
//! - **Atomic appends**: all channels advance together, readers never see a torn tick
//! - **Robust ingestion**: malformed lines are dropped, the loop keeps going
//! - **Full-log export**: every accepted sample, written as CSV on demand
//!
//! ## Quick Start
//!
//! ```rust
//! use roomsense::{Channel, IngestionLoop, MemorySource, Monitor, RoomsenseConfig, TrendDirection};
//!
//! let monitor = Monitor::new(&RoomsenseConfig::default()).unwrap();
//!
//! // Feed the history from a source (a serial port or file in production)
//! let source = MemorySource::from_lines(["120,45,19.5", "not a reading", "118,44,19.6"]);
//! IngestionLoop::new(source, monitor.history()).run().unwrap();
//!
//! // Query it
//! assert_eq!(monitor.snapshot().len(), 2);
//! assert_eq!(monitor.trend(Channel::Light), TrendDirection::Insufficient);
//! let alerts = monitor.alerts();
//! assert!(alerts.lighting_on && alerts.heating_on);
//! ```
//!
//! ## Modules
//!
//! - [`sample`]: Samples, channels and the line parser
//! - [`history`]: Bounded shared history
//! - [`source`]: Line source abstraction
//! - [`ingest`]: Ingestion loop
//! - [`analytics`]: Averages, extrema and trends
//! - [`alert`]: Threshold alerts
//! - [`export`]: CSV export
//! - [`monitor`]: Query facade for the presentation layer

// Modules
pub mod alert;
pub mod analytics;
pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod ingest;
pub mod monitor;
pub mod sample;
pub mod source;

// Re-exports for convenient access
pub use alert::{evaluate, AlertState, Settings, Thresholds};
pub use analytics::{
    cumulative_average, extrema_and_dispersion, trend, windowed_average, AnalyticsConfig,
    ChannelAnalytics, ChannelSummary, TrendDirection,
};
pub use config::{HistoryConfig, IngestConfig, RoomsenseConfig};
pub use error::{
    ConfigError, ExportError, HistoryError, IngestError, ParseError, Result, RoomsenseError,
    SourceError,
};
pub use export::{export_snapshot, write_samples, ExportOutcome};
pub use history::{BoundedHistory, HistorySnapshot};
pub use ingest::{IngestOutcome, IngestStats, IngestStatsSnapshot, IngestionLoop, ShutdownHandle};
pub use monitor::{Monitor, MonitorReport};
pub use sample::{Channel, Sample};
pub use source::{LineSource, MemorySource, ReaderSource, MAX_CONSECUTIVE_READ_ERRORS};

#[cfg(feature = "serial")]
pub use source::SerialSource;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Roomsense Server - HTTP front end for Roomsense telemetry
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # Roomsense Server
//!
//! Reads sensor lines from a file, stdin or a serial port on a background
//! thread and serves analytics, alerts and Prometheus metrics over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! # Replay a capture file
//! roomsense-server --input capture.txt
//!
//! # Read from stdin on a custom port
//! cat capture.txt | roomsense-server --input - --port 9090
//!
//! # Read from a microcontroller (requires the `serial` feature)
//! roomsense-server --serial /dev/ttyACM0 --baud 115200
//! ```

mod api;
mod metrics;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use api::AppState;
use clap::Parser;
use roomsense::{
    IngestOutcome, IngestionLoop, LineSource, Monitor, ReaderSource, RoomsenseConfig,
    SourceError,
};
use tokio::net::TcpListener;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

/// Roomsense telemetry server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8050")]
    port: u16,

    /// Line source file ("-" for stdin)
    #[arg(short, long, conflicts_with = "serial")]
    input: Option<PathBuf>,

    /// Serial port device
    #[arg(short, long)]
    serial: Option<String>,

    /// Serial baud rate
    #[arg(short, long, default_value = "115200")]
    baud: u32,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// History capacity per channel (overrides config)
    #[arg(long)]
    capacity: Option<usize>,

    /// CSV export destination
    #[arg(long, default_value = "sensor_data.csv")]
    export_path: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

type BoxedSource = Box<dyn LineSource + Send>;

fn load_config(args: &Args) -> Result<RoomsenseConfig, roomsense::ConfigError> {
    let mut config = match &args.config {
        Some(path) => RoomsenseConfig::from_json_file(path)?,
        None => RoomsenseConfig::default(),
    };
    if let Some(capacity) = args.capacity {
        config.history.capacity = capacity;
    }
    config.validate()?;
    Ok(config)
}

fn open_source(args: &Args) -> Result<BoxedSource, SourceError> {
    if let Some(input) = &args.input {
        let source = if input.as_os_str() == "-" {
            ReaderSource::stdin()?
        } else {
            ReaderSource::open_file(input)?
        };
        return Ok(Box::new(source));
    }

    if let Some(port) = &args.serial {
        return open_serial(port, args.baud);
    }

    Err(SourceError::Unavailable {
        source_name: "none".to_string(),
        reason: "pass --input <file|-> or --serial <port>".to_string(),
    })
}

#[cfg(feature = "serial")]
fn open_serial(port: &str, baud: u32) -> Result<BoxedSource, SourceError> {
    let source =
        roomsense::SerialSource::open(port, baud, roomsense::source::DEFAULT_READ_TIMEOUT)?;
    Ok(Box::new(source))
}

#[cfg(not(feature = "serial"))]
fn open_serial(port: &str, _baud: u32) -> Result<BoxedSource, SourceError> {
    Err(SourceError::Unavailable {
        source_name: port.to_string(),
        reason: "built without the `serial` feature".to_string(),
    })
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Roomsense Server v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let source = match open_source(&args) {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to open telemetry source: {}", e);
            std::process::exit(1);
        }
    };
    let source_name = source.describe();

    let monitor = match Monitor::new(&config) {
        Ok(monitor) => monitor,
        Err(e) => {
            error!("Failed to create history: {}", e);
            std::process::exit(1);
        }
    };

    let ingest = IngestionLoop::new(source, monitor.history())
        .with_poll_timeout(config.ingest.poll_timeout());
    let shutdown = ingest.shutdown_handle();
    let stats = ingest.stats();

    let ingest_thread = match thread::Builder::new()
        .name("roomsense-ingest".to_string())
        .spawn(move || ingest.run())
    {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to spawn ingestion thread: {}", e);
            std::process::exit(1);
        }
    };
    info!("Ingesting from {}", source_name);

    let state = Arc::new(AppState {
        monitor,
        stats,
        source_name,
        export_path: args.export_path.clone(),
        start_time: Instant::now(),
    });

    let app = api::router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            shutdown.shutdown();
            std::process::exit(1);
        }
    };
    info!("Starting server on http://{}", addr);
    info!("Metrics endpoint: http://{}/metrics", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
    }

    // Stop ingestion and wait for the thread to leave its poll
    shutdown.shutdown();
    match tokio::task::spawn_blocking(move || ingest_thread.join()).await {
        Ok(Ok(Ok(IngestOutcome::Shutdown))) => info!("Ingestion stopped"),
        Ok(Ok(Ok(IngestOutcome::SourceClosed))) => info!("Ingestion had already ended"),
        Ok(Ok(Err(e))) => error!("Ingestion failed: {}", e),
        Ok(Err(_)) => error!("Ingestion thread panicked"),
        Err(e) => error!("Failed to join ingestion thread: {}", e),
    }

    info!("Roomsense Server stopped");
}

// Roomsense Server - Prometheus metrics definitions
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Prometheus metrics for Roomsense monitoring.
//!
//! This module defines all Prometheus metrics exposed by the server and
//! refreshes them from a [`MonitorReport`] on every scrape.

use lazy_static::lazy_static;
use prometheus::{register_gauge, register_gauge_vec, Encoder, Gauge, GaugeVec, TextEncoder};
use roomsense::{AlertState, IngestStatsSnapshot, MonitorReport};

lazy_static! {
    // ============================================================
    // Sensor Metrics (from MonitorReport)
    // ============================================================

    /// Latest value per channel.
    pub static ref SENSOR_VALUE: GaugeVec = register_gauge_vec!(
        "roomsense_sensor_value",
        "Latest sensor value per channel",
        &["channel"]
    ).unwrap();

    /// Average over the retained history per channel.
    pub static ref SENSOR_AVERAGE: GaugeVec = register_gauge_vec!(
        "roomsense_sensor_average",
        "Average over the retained history per channel",
        &["channel"]
    ).unwrap();

    /// Average over the recent window per channel.
    pub static ref SENSOR_WINDOWED_AVERAGE: GaugeVec = register_gauge_vec!(
        "roomsense_sensor_windowed_average",
        "Average over the recent window per channel",
        &["channel"]
    ).unwrap();

    /// Standard deviation over the retained history per channel.
    pub static ref SENSOR_STD_DEV: GaugeVec = register_gauge_vec!(
        "roomsense_sensor_std_dev",
        "Standard deviation over the retained history per channel",
        &["channel"]
    ).unwrap();

    /// Trend direction per channel.
    /// Values: 1 = up, 0 = flat or insufficient data, -1 = down
    pub static ref SENSOR_TREND: GaugeVec = register_gauge_vec!(
        "roomsense_sensor_trend",
        "Smoothed trend per channel (1=up, 0=flat, -1=down)",
        &["channel"]
    ).unwrap();

    /// Alert states (labeled by alert).
    pub static ref ALERT_ACTIVE: GaugeVec = register_gauge_vec!(
        "roomsense_alert_active",
        "Alert state (1=on, 0=off)",
        &["alert"]
    ).unwrap();

    /// Security mode (1 = armed).
    pub static ref SECURITY_MODE: Gauge = register_gauge!(
        "roomsense_security_mode",
        "Security mode (1=armed, 0=disarmed)"
    ).unwrap();

    /// Retained samples per channel.
    pub static ref HISTORY_LEN: Gauge = register_gauge!(
        "roomsense_history_len",
        "Samples retained per channel"
    ).unwrap();

    // ============================================================
    // Ingestion Metrics
    // ============================================================

    /// Samples accepted since start.
    pub static ref SAMPLES_ACCEPTED_TOTAL: Gauge = register_gauge!(
        "roomsense_samples_accepted_total",
        "Samples accepted since start"
    ).unwrap();

    /// Malformed lines discarded since start.
    pub static ref LINES_REJECTED_TOTAL: Gauge = register_gauge!(
        "roomsense_lines_rejected_total",
        "Malformed lines discarded since start"
    ).unwrap();

    /// Transient read errors since start.
    pub static ref READ_ERRORS_TOTAL: Gauge = register_gauge!(
        "roomsense_read_errors_total",
        "Transient source read errors since start"
    ).unwrap();

    /// Whether ingestion is running.
    pub static ref INGEST_RUNNING: Gauge = register_gauge!(
        "roomsense_ingest_running",
        "Ingestion loop state (1=running, 0=stopped)"
    ).unwrap();
}

fn flag(on: bool) -> f64 {
    if on {
        1.0
    } else {
        0.0
    }
}

/// Update sensor metrics from a report.
pub fn update_report_metrics(report: &MonitorReport) {
    for channel in &report.channels {
        let label = channel.channel.as_str();
        // Channels without data are left at their last value
        if let Some(v) = channel.latest {
            SENSOR_VALUE.with_label_values(&[label]).set(v);
        }
        if let Some(v) = channel.cumulative_average {
            SENSOR_AVERAGE.with_label_values(&[label]).set(v);
        }
        if let Some(v) = channel.windowed_average {
            SENSOR_WINDOWED_AVERAGE.with_label_values(&[label]).set(v);
        }
        if let Some(summary) = channel.summary {
            SENSOR_STD_DEV.with_label_values(&[label]).set(summary.std_dev);
        }
        SENSOR_TREND
            .with_label_values(&[label])
            .set(channel.trend.score() as f64);
    }

    update_alert_metrics(&report.alerts);
    SECURITY_MODE.set(flag(report.security_mode));
    HISTORY_LEN.set(
        report
            .channels
            .first()
            .map(|c| c.samples as f64)
            .unwrap_or(0.0),
    );
}

/// Update alert metrics.
pub fn update_alert_metrics(alerts: &AlertState) {
    ALERT_ACTIVE
        .with_label_values(&["lighting"])
        .set(flag(alerts.lighting_on));
    ALERT_ACTIVE
        .with_label_values(&["heating"])
        .set(flag(alerts.heating_on));
    ALERT_ACTIVE
        .with_label_values(&["intrusion"])
        .set(flag(alerts.intrusion_on));
}

/// Update ingestion counters.
pub fn update_ingest_metrics(stats: &IngestStatsSnapshot) {
    SAMPLES_ACCEPTED_TOTAL.set(stats.accepted as f64);
    LINES_REJECTED_TOTAL.set(stats.rejected as f64);
    READ_ERRORS_TOTAL.set(stats.read_errors as f64);
    INGEST_RUNNING.set(flag(stats.running));
}

/// Encode all metrics to Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

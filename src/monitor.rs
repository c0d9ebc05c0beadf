// Roomsense - Concurrent sensor telemetry aggregation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Query surface handed to the presentation layer.
//!
//! A [`Monitor`] owns shared handles to the history and the alert settings.
//! Clones are cheap and all refer to the same state, so one clone can feed
//! the ingestion loop while others answer queries.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::alert::{AlertState, Settings, Thresholds};
use crate::analytics::{self, AnalyticsConfig, ChannelAnalytics, ChannelSummary, TrendDirection};
use crate::config::RoomsenseConfig;
use crate::error::{ExportError, HistoryError};
use crate::export::{self, ExportOutcome};
use crate::history::{BoundedHistory, HistorySnapshot};
use crate::sample::{Channel, Sample};

/// Version of the report format.
pub const REPORT_VERSION: &str = "0.1.0";

/// Complete read-side view at one point in time.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorReport {
    /// Format version.
    pub version: String,
    /// When the report was built.
    pub generated_at: DateTime<Local>,
    /// Samples accepted since start.
    pub ticks: u64,
    /// Most recent sample.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<Sample>,
    /// Per-channel analytics, in record order.
    pub channels: Vec<ChannelAnalytics>,
    /// Thresholds used for `alerts`.
    pub thresholds: Thresholds,
    /// Security mode used for `alerts`.
    pub security_mode: bool,
    /// Alert states for `latest`.
    pub alerts: AlertState,
}

impl MonitorReport {
    /// Analytics of one channel.
    pub fn channel(&self, channel: Channel) -> Option<&ChannelAnalytics> {
        self.channels.iter().find(|c| c.channel == channel)
    }
}

/// Shared history, settings and analytics configuration.
#[derive(Debug, Clone)]
pub struct Monitor {
    history: Arc<BoundedHistory>,
    settings: Arc<Settings>,
    analytics: AnalyticsConfig,
}

impl Monitor {
    /// Build a monitor from configuration.
    pub fn new(config: &RoomsenseConfig) -> Result<Self, HistoryError> {
        let history = BoundedHistory::new(config.history.capacity)?;
        Ok(Self {
            history: Arc::new(history),
            settings: Arc::new(Settings::new(config.thresholds, config.security_mode)),
            analytics: config.analytics.clone(),
        })
    }

    /// Shared history (hand this to the ingestion loop).
    pub fn history(&self) -> Arc<BoundedHistory> {
        Arc::clone(&self.history)
    }

    /// Shared alert settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Consistent snapshot of every channel.
    pub fn snapshot(&self) -> HistorySnapshot {
        self.history.snapshot()
    }

    /// Retained values of one channel, oldest first.
    pub fn channel_history(&self, channel: Channel) -> Vec<f64> {
        self.history.channel(channel)
    }

    pub fn cumulative_average(&self, channel: Channel) -> Option<f64> {
        analytics::cumulative_average(&self.snapshot(), channel)
    }

    /// Recent average over the configured window.
    pub fn windowed_average(&self, channel: Channel) -> Option<f64> {
        analytics::windowed_average(&self.snapshot(), channel, self.analytics.average_window)
    }

    pub fn summary(&self, channel: Channel) -> Option<ChannelSummary> {
        analytics::extrema_and_dispersion(&self.snapshot(), channel)
    }

    /// Trend over the configured window.
    pub fn trend(&self, channel: Channel) -> TrendDirection {
        analytics::trend(&self.snapshot(), channel, self.analytics.trend_window)
    }

    /// Alert states for the latest sample under the current settings.
    pub fn alerts(&self) -> AlertState {
        self.settings.evaluate(self.history.latest().as_ref())
    }

    /// Every analytic and the alert states, all from one snapshot.
    pub fn report(&self) -> MonitorReport {
        let snapshot = self.snapshot();
        let thresholds = self.settings.thresholds();
        let security_mode = self.settings.security_mode();

        MonitorReport {
            version: REPORT_VERSION.to_string(),
            generated_at: Local::now(),
            ticks: snapshot.ticks,
            latest: snapshot.latest,
            channels: Channel::ALL
                .iter()
                .map(|&c| ChannelAnalytics::compute(&snapshot, c, &self.analytics))
                .collect(),
            thresholds,
            security_mode,
            alerts: crate::alert::evaluate(snapshot.latest.as_ref(), &thresholds, security_mode),
        }
    }

    /// Export the full log as CSV.
    pub fn export(&self, destination: impl AsRef<Path>) -> Result<ExportOutcome, ExportError> {
        export::export_snapshot(&self.history, destination)
    }
}

// Roomsense - Concurrent sensor telemetry aggregation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Read-side analytics over a history snapshot.
//!
//! Every function here is pure: it takes a [`HistorySnapshot`] (or a plain
//! series) and never touches the shared history. Empty input yields `None`
//! or [`TrendDirection::Insufficient`], never a division by zero.

use serde::{Deserialize, Serialize};

use crate::history::HistorySnapshot;
use crate::sample::Channel;

/// Default window for [`windowed_average`]: 20 samples, about 30 seconds at
/// the reference board's 1.5 s cadence.
pub const DEFAULT_AVERAGE_WINDOW: usize = 20;

/// Default window for [`trend`].
pub const DEFAULT_TREND_WINDOW: usize = 5;

/// Analytics window sizes, in samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Window for the recent average.
    pub average_window: usize,
    /// Window for each half of the trend comparison.
    pub trend_window: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            average_window: DEFAULT_AVERAGE_WINDOW,
            trend_window: DEFAULT_TREND_WINDOW,
        }
    }
}

/// Smoothed direction of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
    Insufficient,
}

impl TrendDirection {
    /// Arrow shown next to the channel.
    pub fn symbol(&self) -> &'static str {
        match self {
            TrendDirection::Up => "↑",
            TrendDirection::Down => "↓",
            TrendDirection::Flat => "→",
            TrendDirection::Insufficient => "?",
        }
    }

    /// Numeric score for bar charts and gauges: 1, -1 or 0.
    pub fn score(&self) -> i8 {
        match self {
            TrendDirection::Up => 1,
            TrendDirection::Down => -1,
            TrendDirection::Flat | TrendDirection::Insufficient => 0,
        }
    }
}

/// Extrema and dispersion of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelSummary {
    pub min: f64,
    pub max: f64,
    /// Sample standard deviation; 0 with a single sample.
    pub std_dev: f64,
}

/// Arithmetic mean of a series.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Mean of the last `min(window, len)` values.
pub fn tail_mean(values: &[f64], window: usize) -> Option<f64> {
    let take = window.min(values.len());
    mean(&values[values.len() - take..])
}

/// Min, max and sample standard deviation of a series.
pub fn summarize(values: &[f64]) -> Option<ChannelSummary> {
    let avg = mean(values)?;

    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    let std_dev = if values.len() > 1 {
        let n = values.len() as f64;
        let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / (n - 1.0);
        variance.max(0.0).sqrt()
    } else {
        0.0
    };

    Some(ChannelSummary { min, max, std_dev })
}

/// Two-window trend of a series.
///
/// Compares the mean of the last `window` values with the mean of the (up to)
/// `window` values right before them.
pub fn classify_trend(values: &[f64], window: usize) -> TrendDirection {
    if window == 0 || values.len() < window + 1 {
        return TrendDirection::Insufficient;
    }

    let split = values.len() - window;
    let previous_start = split.saturating_sub(window);

    let (recent, previous) = match (
        mean(&values[split..]),
        mean(&values[previous_start..split]),
    ) {
        (Some(r), Some(p)) => (r, p),
        _ => return TrendDirection::Insufficient,
    };

    if recent > previous {
        TrendDirection::Up
    } else if recent < previous {
        TrendDirection::Down
    } else {
        TrendDirection::Flat
    }
}

/// Mean over the whole retained window of a channel.
pub fn cumulative_average(snapshot: &HistorySnapshot, channel: Channel) -> Option<f64> {
    mean(snapshot.channel(channel))
}

/// Mean over the last `window` retained values of a channel.
pub fn windowed_average(snapshot: &HistorySnapshot, channel: Channel, window: usize) -> Option<f64> {
    tail_mean(snapshot.channel(channel), window)
}

/// Min, max and standard deviation of a channel.
pub fn extrema_and_dispersion(snapshot: &HistorySnapshot, channel: Channel) -> Option<ChannelSummary> {
    summarize(snapshot.channel(channel))
}

/// Smoothed trend of a channel.
pub fn trend(snapshot: &HistorySnapshot, channel: Channel, window: usize) -> TrendDirection {
    classify_trend(snapshot.channel(channel), window)
}

/// Every analytic for one channel, computed from the same snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelAnalytics {
    pub channel: Channel,
    pub latest: Option<f64>,
    pub samples: usize,
    pub cumulative_average: Option<f64>,
    pub windowed_average: Option<f64>,
    pub summary: Option<ChannelSummary>,
    pub trend: TrendDirection,
}

impl ChannelAnalytics {
    pub fn compute(snapshot: &HistorySnapshot, channel: Channel, config: &AnalyticsConfig) -> Self {
        let values = snapshot.channel(channel);
        Self {
            channel,
            latest: values.last().copied(),
            samples: values.len(),
            cumulative_average: mean(values),
            windowed_average: tail_mean(values, config.average_window),
            summary: summarize(values),
            trend: classify_trend(values, config.trend_window),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_empty() {
        assert_eq!(mean(&[]), None);
        assert_eq!(tail_mean(&[], 5), None);
        assert_eq!(tail_mean(&[1.0, 2.0], 0), None);
    }

    #[test]
    fn test_tail_mean() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(tail_mean(&values, 2), Some(3.5));
        assert_eq!(tail_mean(&values, 10), Some(2.5));
    }

    #[test]
    fn test_summarize_single_sample() {
        let summary = summarize(&[42.0]).unwrap();
        assert_eq!(summary.min, 42.0);
        assert_eq!(summary.max, 42.0);
        assert_eq!(summary.std_dev, 0.0);
    }

    #[test]
    fn test_summarize_sample_std_dev() {
        let summary = summarize(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(summary.min, 2.0);
        assert_eq!(summary.max, 9.0);
        // Sample (n-1) standard deviation
        assert_relative_eq!(summary.std_dev, 2.138_089_935, epsilon = 1e-6);
    }

    #[test]
    fn test_trend_up_down_flat() {
        let up = [1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0, 2.0];
        let mut down = up;
        down.reverse();

        assert_eq!(classify_trend(&up, 5), TrendDirection::Up);
        assert_eq!(classify_trend(&down, 5), TrendDirection::Down);
        assert_eq!(classify_trend(&[3.0; 10], 5), TrendDirection::Flat);
    }

    #[test]
    fn test_trend_insufficient() {
        assert_eq!(classify_trend(&[1.0; 5], 5), TrendDirection::Insufficient);
        assert_eq!(classify_trend(&[1.0; 10], 0), TrendDirection::Insufficient);
    }

    #[test]
    fn test_trend_short_previous_window() {
        // window + 1 samples: previous window holds a single value
        assert_eq!(
            classify_trend(&[10.0, 1.0, 1.0, 1.0, 1.0, 1.0], 5),
            TrendDirection::Down
        );
    }

    #[test]
    fn test_trend_direction_symbols() {
        assert_eq!(TrendDirection::Up.symbol(), "↑");
        assert_eq!(TrendDirection::Down.score(), -1);
        assert_eq!(TrendDirection::Insufficient.score(), 0);
    }

    #[test]
    fn test_channel_analytics_compute() {
        let snapshot = HistorySnapshot {
            light: vec![1.0, 2.0, 3.0],
            distance: vec![10.0, 10.0, 10.0],
            temperature: vec![20.0, 21.0, 22.0],
            latest: None,
            ticks: 3,
            capacity: 10,
        };
        let config = AnalyticsConfig {
            average_window: 2,
            trend_window: 1,
        };

        let light = ChannelAnalytics::compute(&snapshot, Channel::Light, &config);
        assert_eq!(light.latest, Some(3.0));
        assert_eq!(light.samples, 3);
        assert_eq!(light.cumulative_average, Some(2.0));
        assert_eq!(light.windowed_average, Some(2.5));
        assert_eq!(light.trend, TrendDirection::Up);

        let distance = ChannelAnalytics::compute(&snapshot, Channel::Distance, &config);
        assert_eq!(distance.trend, TrendDirection::Flat);
        assert_eq!(distance.summary.unwrap().std_dev, 0.0);
    }
}

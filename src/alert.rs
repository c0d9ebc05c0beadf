// Roomsense - Concurrent sensor telemetry aggregation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Threshold-based alert evaluation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::sample::Sample;

/// Alert thresholds. A reading strictly below a threshold trips it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Below this the room is considered dark
    pub light: f64,
    /// Below this (cm) the room is considered occupied
    pub distance: f64,
    /// Below this (°C) heating engages
    pub temperature: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            light: 200.0,
            distance: 200.0,
            temperature: 20.0,
        }
    }
}

impl Thresholds {
    /// Whether every threshold is a finite number.
    pub fn is_finite(&self) -> bool {
        self.light.is_finite() && self.distance.is_finite() && self.temperature.is_finite()
    }
}

/// Derived actuator / alarm states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AlertState {
    /// Room is dark and occupied
    pub lighting_on: bool,
    /// Room is cold
    pub heating_on: bool,
    /// Presence detected while security mode is armed
    pub intrusion_on: bool,
}

impl AlertState {
    /// Whether any alert is engaged.
    pub fn any(&self) -> bool {
        self.lighting_on || self.heating_on || self.intrusion_on
    }
}

/// Evaluate alerts for the latest sample.
///
/// With no sample every alert is off.
pub fn evaluate(latest: Option<&Sample>, thresholds: &Thresholds, security_mode: bool) -> AlertState {
    let Some(sample) = latest else {
        return AlertState::default();
    };

    let occupied = sample.distance_cm < thresholds.distance;

    AlertState {
        lighting_on: sample.light < thresholds.light && occupied,
        heating_on: sample.temperature_c < thresholds.temperature,
        intrusion_on: security_mode && occupied,
    }
}

/// Externally controlled alert settings.
///
/// Written by the presentation layer at any time, read by the core on every
/// evaluation.
#[derive(Debug, Default)]
pub struct Settings {
    thresholds: RwLock<Thresholds>,
    security_mode: AtomicBool,
}

impl Settings {
    pub fn new(thresholds: Thresholds, security_mode: bool) -> Self {
        Self {
            thresholds: RwLock::new(thresholds),
            security_mode: AtomicBool::new(security_mode),
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        *self.thresholds.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_thresholds(&self, thresholds: Thresholds) {
        *self.thresholds.write().unwrap_or_else(|e| e.into_inner()) = thresholds;
    }

    pub fn security_mode(&self) -> bool {
        self.security_mode.load(Ordering::SeqCst)
    }

    pub fn set_security_mode(&self, enabled: bool) {
        self.security_mode.store(enabled, Ordering::SeqCst);
    }

    /// Flip security mode, returning the new state.
    pub fn toggle_security_mode(&self) -> bool {
        !self.security_mode.fetch_xor(true, Ordering::SeqCst)
    }

    /// Evaluate alerts against the current settings.
    pub fn evaluate(&self, latest: Option<&Sample>) -> AlertState {
        evaluate(latest, &self.thresholds(), self.security_mode())
    }
}

// Roomsense - Concurrent sensor telemetry aggregation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Bounded per-channel history shared between the ingestion loop and readers.
//!
//! The three channel rings, the latest sample, the tick counter and the
//! unbounded full log live behind a single [`RwLock`], so an append is
//! observed by readers either entirely or not at all.

use std::collections::VecDeque;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use crate::error::HistoryError;
use crate::sample::{Channel, Sample};

/// Default number of samples retained per channel.
pub const DEFAULT_CAPACITY: usize = 50;

/// Fixed-capacity FIFO of scalar values, oldest first.
#[derive(Debug, Clone)]
struct Ring {
    values: VecDeque<f64>,
    capacity: usize,
}

impl Ring {
    fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, value: f64) {
        while self.values.len() >= self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }
}

#[derive(Debug)]
struct Inner {
    light: Ring,
    distance: Ring,
    temperature: Ring,
    latest: Option<Sample>,
    full_log: Vec<Sample>,
    ticks: u64,
}

impl Inner {
    fn ring(&self, channel: Channel) -> &Ring {
        match channel {
            Channel::Light => &self.light,
            Channel::Distance => &self.distance,
            Channel::Temperature => &self.temperature,
        }
    }
}

/// Point-in-time copy of the bounded history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySnapshot {
    /// Light values, oldest first
    pub light: Vec<f64>,
    /// Distance values, oldest first
    pub distance: Vec<f64>,
    /// Temperature values, oldest first
    pub temperature: Vec<f64>,
    /// Most recently appended sample
    pub latest: Option<Sample>,
    /// Samples accepted since start (including evicted ones)
    pub ticks: u64,
    /// Ring capacity
    pub capacity: usize,
}

impl HistorySnapshot {
    /// Values of one channel, oldest first.
    pub fn channel(&self, channel: Channel) -> &[f64] {
        match channel {
            Channel::Light => &self.light,
            Channel::Distance => &self.distance,
            Channel::Temperature => &self.temperature,
        }
    }

    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.light.len()
    }

    /// Whether no sample has been retained.
    pub fn is_empty(&self) -> bool {
        self.light.is_empty()
    }
}

/// Fixed-capacity history of the three sensor channels plus the full log.
///
/// [`BoundedHistory::append`] is the only mutator. It is meant to be called by
/// a single writer, but is safe alongside any number of concurrent readers.
#[derive(Debug)]
pub struct BoundedHistory {
    inner: RwLock<Inner>,
    capacity: usize,
}

impl BoundedHistory {
    /// Create a history retaining `capacity` samples per channel.
    pub fn new(capacity: usize) -> Result<Self, HistoryError> {
        if capacity == 0 {
            return Err(HistoryError::ZeroCapacity);
        }
        Ok(Self {
            inner: RwLock::new(Inner {
                light: Ring::new(capacity),
                distance: Ring::new(capacity),
                temperature: Ring::new(capacity),
                latest: None,
                full_log: Vec::new(),
                ticks: 0,
            }),
            capacity,
        })
    }

    /// Append a sample to all three channels and the full log at once.
    ///
    /// Exceeding the capacity evicts the oldest value of every channel.
    pub fn append(&self, sample: Sample) {
        let mut inner = self.write();
        inner.light.push(sample.light);
        inner.distance.push(sample.distance_cm);
        inner.temperature.push(sample.temperature_c);
        inner.latest = Some(sample);
        inner.full_log.push(sample);
        inner.ticks += 1;
    }

    /// Consistent copy of all channels taken under one lock.
    pub fn snapshot(&self) -> HistorySnapshot {
        let inner = self.read();
        HistorySnapshot {
            light: inner.light.to_vec(),
            distance: inner.distance.to_vec(),
            temperature: inner.temperature.to_vec(),
            latest: inner.latest,
            ticks: inner.ticks,
            capacity: self.capacity,
        }
    }

    /// Copy of one channel, oldest first.
    pub fn channel(&self, channel: Channel) -> Vec<f64> {
        self.read().ring(channel).to_vec()
    }

    /// Most recent sample.
    pub fn latest(&self) -> Option<Sample> {
        self.read().latest
    }

    /// Copy of every sample accepted since start.
    pub fn full_log(&self) -> Vec<Sample> {
        self.read().full_log.clone()
    }

    /// Number of samples in the full log.
    pub fn full_log_len(&self) -> usize {
        self.read().full_log.len()
    }

    /// Number of samples currently retained per channel.
    pub fn len(&self) -> usize {
        self.read().light.values.len()
    }

    /// Whether nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.read().ticks == 0
    }

    /// Samples accepted since start.
    pub fn ticks(&self) -> u64 {
        self.read().ticks
    }

    /// Per-channel capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // Every critical section leaves Inner consistent, so a poisoned lock
    // still guards valid data.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(v: f64) -> Sample {
        Sample::new(v, v * 10.0, v * 100.0)
    }

    #[test]
    fn test_history_new() {
        let history = BoundedHistory::new(10).unwrap();
        assert!(history.is_empty());
        assert_eq!(history.len(), 0);
        assert_eq!(history.capacity(), 10);
        assert!(history.latest().is_none());
    }

    #[test]
    fn test_history_zero_capacity() {
        assert_eq!(
            BoundedHistory::new(0).unwrap_err(),
            HistoryError::ZeroCapacity
        );
    }

    #[test]
    fn test_history_append() {
        let history = BoundedHistory::new(10).unwrap();
        history.append(sample(1.0));
        history.append(sample(2.0));

        assert_eq!(history.len(), 2);
        assert_eq!(history.ticks(), 2);
        assert_eq!(history.channel(Channel::Light), vec![1.0, 2.0]);
        assert_eq!(history.channel(Channel::Distance), vec![10.0, 20.0]);
        assert_eq!(history.channel(Channel::Temperature), vec![100.0, 200.0]);
        assert_eq!(history.latest().unwrap().light, 2.0);
    }

    #[test]
    fn test_history_eviction() {
        let history = BoundedHistory::new(3).unwrap();
        for i in 0..5 {
            history.append(sample(i as f64));
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.ticks(), 5);
        assert_eq!(history.channel(Channel::Light), vec![2.0, 3.0, 4.0]);
        assert_eq!(history.full_log_len(), 5);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let history = BoundedHistory::new(3).unwrap();
        history.append(sample(1.0));
        let snapshot = history.snapshot();
        history.append(sample(2.0));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.ticks, 1);
        assert_eq!(history.snapshot().len(), 2);
    }
}

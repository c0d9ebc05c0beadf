// Roomsense - Integration Tests
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! History, ingestion and concurrency integration tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use approx::assert_relative_eq;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use roomsense::*;

// ============================================================================
// Helper Functions
// ============================================================================

fn random_lines(rng: &mut StdRng, count: usize) -> Vec<String> {
    (0..count)
        .map(|_| {
            format!(
                "{:.1},{:.1},{:.2}",
                rng.gen_range(0.0..1023.0),
                rng.gen_range(2.0..400.0),
                rng.gen_range(-10.0..40.0)
            )
        })
        .collect()
}

fn ingest_all(lines: &[String], capacity: usize) -> Arc<BoundedHistory> {
    let history = Arc::new(BoundedHistory::new(capacity).unwrap());
    let source = MemorySource::from_lines(lines.iter().cloned());
    let outcome = IngestionLoop::new(source, Arc::clone(&history)).run().unwrap();
    assert_eq!(outcome, IngestOutcome::SourceClosed);
    history
}

fn channel_values(history: &BoundedHistory) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let snapshot = history.snapshot();
    (snapshot.light, snapshot.distance, snapshot.temperature)
}

// ============================================================================
// Section 1: Averages
// ============================================================================

#[test]
fn test_windowed_equals_cumulative_below_capacity() {
    let mut rng = StdRng::seed_from_u64(7);
    for n in 1..=50 {
        let history = ingest_all(&random_lines(&mut rng, n), 50);
        let snapshot = history.snapshot();

        for channel in Channel::ALL {
            let cumulative = cumulative_average(&snapshot, channel).unwrap();
            let windowed = windowed_average(&snapshot, channel, snapshot.len()).unwrap();
            assert_relative_eq!(cumulative, windowed, epsilon = 1e-9);
        }
    }
}

#[test]
fn test_empty_history_queries() {
    let history = BoundedHistory::new(10).unwrap();
    let snapshot = history.snapshot();

    for channel in Channel::ALL {
        assert_eq!(cumulative_average(&snapshot, channel), None);
        assert_eq!(windowed_average(&snapshot, channel, 20), None);
        assert_eq!(extrema_and_dispersion(&snapshot, channel), None);
        assert_eq!(trend(&snapshot, channel, 5), TrendDirection::Insufficient);
    }
}

// ============================================================================
// Section 2: Eviction
// ============================================================================

#[test]
fn test_capacity_plus_one_evicts_first() {
    let capacity = 8;
    let lines: Vec<String> = (0..=capacity)
        .map(|i| format!("{},{},{}", i, i + 100, i + 200))
        .collect();
    let history = ingest_all(&lines, capacity);

    let (light, distance, temperature) = channel_values(&history);
    assert_eq!(light.len(), capacity);
    assert_eq!(light[0], 1.0);
    assert_eq!(distance[0], 101.0);
    assert_eq!(temperature[0], 201.0);
    assert_eq!(history.ticks(), capacity as u64 + 1);
    assert_eq!(history.full_log_len(), capacity + 1);
}

#[test]
fn test_long_stream_stays_bounded() {
    let mut rng = StdRng::seed_from_u64(11);
    let history = ingest_all(&random_lines(&mut rng, 1000), 50);
    assert_eq!(history.len(), 50);
    assert_eq!(history.full_log_len(), 1000);
}

// ============================================================================
// Section 3: Malformed input
// ============================================================================

#[test]
fn test_malformed_lines_do_not_change_history() {
    let mut rng = StdRng::seed_from_u64(42);
    let valid = random_lines(&mut rng, 120);
    let garbage = [
        "",
        "1,2",
        "1,2,3,4",
        "abc,def,ghi",
        "12.5,,3",
        "NaN,1,2",
        "\u{fffd}\u{fffd},3,4",
    ];

    let mut mixed = Vec::new();
    for (i, line) in valid.iter().enumerate() {
        mixed.push(garbage[i % garbage.len()].to_string());
        mixed.push(line.clone());
    }

    let clean = ingest_all(&valid, 50);
    let noisy = ingest_all(&mixed, 50);

    assert_eq!(channel_values(&clean), channel_values(&noisy));
    assert_eq!(clean.ticks(), noisy.ticks());
}

#[test]
fn test_reader_source_end_to_end() {
    let data: &'static [u8] = b"100,50,25\r\ngarbage\r\n110,60,24\r\n";
    let history = Arc::new(BoundedHistory::new(10).unwrap());
    let source = ReaderSource::spawn("bytes", data).unwrap();

    let outcome = IngestionLoop::new(source, Arc::clone(&history)).run().unwrap();
    assert_eq!(outcome, IngestOutcome::SourceClosed);
    assert_eq!(history.channel(Channel::Light), vec![100.0, 110.0]);
}

#[test]
fn test_analytics_survive_source_closure() {
    let lines: Vec<String> = (0..10).map(|i| format!("{},50,20", i)).collect();
    let history = ingest_all(&lines, 50);

    // Source is gone; the last known history is still served
    let snapshot = history.snapshot();
    assert_eq!(trend(&snapshot, Channel::Light, 5), TrendDirection::Up);
    assert_eq!(cumulative_average(&snapshot, Channel::Distance), Some(50.0));
}

// ============================================================================
// Section 4: Concurrency
// ============================================================================

#[test]
fn test_concurrent_appends_and_snapshots_are_consistent() {
    const WRITES: usize = 5_000;
    const READERS: usize = 4;
    let capacity = 64;

    let history = Arc::new(BoundedHistory::new(capacity).unwrap());
    let done = Arc::new(AtomicBool::new(false));
    let barrier = Arc::new(Barrier::new(READERS + 1));

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let history = Arc::clone(&history);
            let done = Arc::clone(&done);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut last_ticks = 0;
                let mut reads = 0usize;
                while !done.load(Ordering::SeqCst) {
                    let s = history.snapshot();
                    assert_eq!(s.light.len(), s.distance.len());
                    assert_eq!(s.light.len(), s.temperature.len());
                    assert_eq!(s.light.len() as u64, s.ticks.min(capacity as u64));
                    assert!(s.ticks >= last_ticks, "ticks went backwards");
                    last_ticks = s.ticks;

                    // Every tick writes (t, t + 1, t + 2), so channels line up per slot
                    for i in 0..s.light.len() {
                        assert_eq!(s.distance[i], s.light[i] + 1.0);
                        assert_eq!(s.temperature[i], s.light[i] + 2.0);
                    }
                    if let Some(latest) = s.latest {
                        assert_eq!(Some(&latest.light), s.light.last());
                        assert_eq!(latest.light, (s.ticks - 1) as f64);
                    }
                    reads += 1;
                }
                reads
            })
        })
        .collect();

    barrier.wait();
    for t in 0..WRITES {
        let v = t as f64;
        history.append(Sample::new(v, v + 1.0, v + 2.0));
    }
    done.store(true, Ordering::SeqCst);

    for reader in readers {
        let reads = reader.join().expect("reader panicked");
        assert!(reads > 0);
    }
    assert_eq!(history.ticks(), WRITES as u64);
    assert_eq!(history.full_log_len(), WRITES);
}

#[test]
fn test_ingestion_thread_with_concurrent_reports() {
    let monitor = Monitor::new(&RoomsenseConfig::default()).unwrap();
    let lines: Vec<String> = (0..2_000).map(|i| format!("{},{},{}", i, i, i)).collect();
    let source = MemorySource::from_lines(lines);
    let ingest = IngestionLoop::new(source, monitor.history());

    let writer = thread::spawn(move || ingest.run());

    let reader_monitor = monitor.clone();
    let reader = thread::spawn(move || {
        for _ in 0..200 {
            let report = reader_monitor.report();
            let samples: Vec<usize> = report.channels.iter().map(|c| c.samples).collect();
            assert!(samples.iter().all(|&n| n == samples[0]));
            let _ = reader_monitor.alerts();
        }
    });

    assert_eq!(writer.join().unwrap().unwrap(), IngestOutcome::SourceClosed);
    reader.join().unwrap();
    assert_eq!(monitor.snapshot().ticks, 2_000);
}

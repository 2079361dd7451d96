//! Perf Monitor (C3): named timing samples and named counters, grounded on
//! the `AtomicU64` accounting in the teacher's `performance/metrics.rs`
//! `Metrics`, generalized from a fixed field set to arbitrary metric names
//! via `DashMap` (the teacher's concurrent-map crate, `performance/cache.rs`).

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;

#[derive(Debug, Default)]
struct TimerSamples {
    min_us: Mutex<Option<u64>>,
    max_us: Mutex<Option<u64>>,
    total_us: AtomicU64,
    count: AtomicU64,
}

impl TimerSamples {
    fn record(&self, duration: Duration) {
        let micros = duration.as_micros() as u64;
        self.total_us.fetch_add(micros, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let mut min = self.min_us.lock().unwrap();
        *min = Some(min.map_or(micros, |m| m.min(micros)));
        let mut max = self.max_us.lock().unwrap();
        *max = Some(max.map_or(micros, |m| m.max(micros)));
    }

    fn snapshot(&self) -> TimerSnapshot {
        let count = self.count.load(Ordering::Relaxed);
        let total = self.total_us.load(Ordering::Relaxed);
        TimerSnapshot {
            count,
            min_us: self.min_us.lock().unwrap().unwrap_or(0),
            max_us: self.max_us.lock().unwrap().unwrap_or(0),
            mean_us: if count > 0 { total / count } else { 0 },
            total_us: total,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TimerSnapshot {
    pub count: u64,
    pub min_us: u64,
    pub max_us: u64,
    pub mean_us: u64,
    pub total_us: u64,
}

/// A handle returned by [`PerfMonitor::start`]; dropping or calling
/// [`Acquisition::finish`] records the elapsed time against the metric.
pub struct Acquisition<'a> {
    monitor: &'a PerfMonitor,
    name: String,
    started_at: Instant,
    finished: bool,
}

impl Acquisition<'_> {
    pub fn finish(mut self) {
        self.monitor.record_timer(&self.name, self.started_at.elapsed());
        self.finished = true;
    }
}

impl Drop for Acquisition<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.monitor.record_timer(&self.name, self.started_at.elapsed());
        }
    }
}

/// Collects named timing samples and named counters under concurrent
/// access; used across the gateway, cache, and tool dispatch paths.
#[derive(Default)]
pub struct PerfMonitor {
    timers: DashMap<String, TimerSamples>,
    counters: DashMap<String, AtomicU64>,
}

impl PerfMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a scoped timer; record happens on `finish()` or on drop.
    pub fn start(&self, name: impl Into<String>) -> Acquisition<'_> {
        Acquisition {
            monitor: self,
            name: name.into(),
            started_at: Instant::now(),
            finished: false,
        }
    }

    pub fn record_timer(&self, name: &str, duration: Duration) {
        self.timers
            .entry(name.to_string())
            .or_default()
            .record(duration);
    }

    pub fn incr_counter(&self, name: &str, delta: u64) {
        self.counters
            .entry(name.to_string())
            .or_default()
            .fetch_add(delta, Ordering::Relaxed);
    }

    pub fn timer_snapshot(&self, name: &str) -> TimerSnapshot {
        self.timers
            .get(name)
            .map(|t| t.snapshot())
            .unwrap_or_default()
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_accumulates() {
        let monitor = PerfMonitor::new();
        monitor.incr_counter("tool_calls", 1);
        monitor.incr_counter("tool_calls", 2);
        assert_eq!(monitor.counter("tool_calls"), 3);
    }

    #[test]
    fn test_timer_snapshot_tracks_min_mean_max() {
        let monitor = PerfMonitor::new();
        monitor.record_timer("llm_call", Duration::from_millis(10));
        monitor.record_timer("llm_call", Duration::from_millis(30));
        let snapshot = monitor.timer_snapshot("llm_call");
        assert_eq!(snapshot.count, 2);
        assert_eq!(snapshot.min_us, 10_000);
        assert_eq!(snapshot.max_us, 30_000);
        assert_eq!(snapshot.mean_us, 20_000);
    }

    #[test]
    fn test_acquisition_records_on_drop() {
        let monitor = PerfMonitor::new();
        {
            let _guard = monitor.start("scoped");
        }
        assert_eq!(monitor.timer_snapshot("scoped").count, 1);
    }

    #[test]
    fn test_unknown_metric_returns_default_snapshot() {
        let monitor = PerfMonitor::new();
        assert_eq!(monitor.timer_snapshot("missing").count, 0);
    }
}

//! Metrics sink (C8.4): counters, gauges, histograms, and timers, each
//! sample carrying optional tags — a superset of `taskforge_ai::PerfMonitor`
//! (which only covers timers/counters for the gateway/cache hot path), used
//! for operator-facing dashboards across the whole task lifecycle.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
    Timer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSample {
    pub name: String,
    pub kind: MetricKind,
    pub value: f64,
    pub tags: HashMap<String, String>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MetricAggregate {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
}

impl MetricAggregate {
    fn observe(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum += value;
        self.count += 1;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

#[derive(Default)]
pub struct MetricsSink {
    samples: RwLock<Vec<MetricSample>>,
    aggregates: RwLock<HashMap<String, MetricAggregate>>,
}

impl MetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: impl Into<String>, kind: MetricKind, value: f64, tags: HashMap<String, String>) {
        let name = name.into();
        let sample = MetricSample {
            name: name.clone(),
            kind,
            value,
            tags,
            timestamp: chrono::Utc::now().timestamp_millis(),
        };
        if let Ok(mut aggregates) = self.aggregates.write() {
            aggregates.entry(name).or_default().observe(value);
        }
        if let Ok(mut samples) = self.samples.write() {
            samples.push(sample);
        }
    }

    pub fn counter(&self, name: impl Into<String>, delta: f64) {
        self.record(name, MetricKind::Counter, delta, HashMap::new());
    }

    pub fn gauge(&self, name: impl Into<String>, value: f64) {
        self.record(name, MetricKind::Gauge, value, HashMap::new());
    }

    pub fn aggregate(&self, name: &str) -> MetricAggregate {
        self.aggregates
            .read()
            .ok()
            .and_then(|aggregates| aggregates.get(name).cloned())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_aggregate_sums() {
        let sink = MetricsSink::new();
        sink.counter("tasks_completed", 1.0);
        sink.counter("tasks_completed", 1.0);
        let aggregate = sink.aggregate("tasks_completed");
        assert_eq!(aggregate.count, 2);
        assert_eq!(aggregate.sum, 2.0);
    }

    #[test]
    fn test_gauge_tracks_min_max_mean() {
        let sink = MetricsSink::new();
        sink.gauge("queue_depth", 3.0);
        sink.gauge("queue_depth", 7.0);
        let aggregate = sink.aggregate("queue_depth");
        assert_eq!(aggregate.min, 3.0);
        assert_eq!(aggregate.max, 7.0);
        assert_eq!(aggregate.mean(), 5.0);
    }
}

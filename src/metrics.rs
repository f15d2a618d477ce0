//! Latency instrumentation
//!
//! Backends receive a `MetricsSink` at construction and report one duration
//! per operation. Recording is observational only: a sink never sees the
//! operation's result and cannot change it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Identity of a latency series: operation name plus backend scope
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricName {
    pub operation: &'static str,
    pub scope: String,
}

impl MetricName {
    pub fn new(operation: &'static str, scope: impl Into<String>) -> Self {
        Self {
            operation,
            scope: scope.into(),
        }
    }
}

/// Destination for operation latencies
pub trait MetricsSink: Send + Sync {
    fn record_latency(&self, metric: &MetricName, elapsed: Duration);
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record_latency(&self, _metric: &MetricName, _elapsed: Duration) {}
}

/// Aggregated latencies for one series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyStats {
    pub count: u64,
    pub total: Duration,
    pub min: Duration,
    pub max: Duration,
}

impl LatencyStats {
    fn first(elapsed: Duration) -> Self {
        Self {
            count: 1,
            total: elapsed,
            min: elapsed,
            max: elapsed,
        }
    }

    fn record(&mut self, elapsed: Duration) {
        self.count = self.count.saturating_add(1);
        self.total = self.total.saturating_add(elapsed);
        self.min = self.min.min(elapsed);
        self.max = self.max.max(elapsed);
    }

    /// Mean latency, zero when nothing was recorded
    pub fn mean(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos((self.total.as_nanos() / self.count as u128) as u64)
    }
}

/// In-memory sink keeping count/total/min/max per series
#[derive(Debug, Default)]
pub struct LatencyRecorder {
    series: Mutex<HashMap<MetricName, LatencyStats>>,
}

impl LatencyRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stats for one series, if it has been recorded at least once
    pub fn stats(&self, operation: &str, scope: &str) -> Option<LatencyStats> {
        self.series
            .lock()
            .iter()
            .find(|(name, _)| name.operation == operation && name.scope == scope)
            .map(|(_, stats)| *stats)
    }

    /// Every series recorded so far, sorted by scope then operation
    pub fn snapshot(&self) -> Vec<(MetricName, LatencyStats)> {
        let mut all: Vec<_> = self
            .series
            .lock()
            .iter()
            .map(|(name, stats)| (name.clone(), *stats))
            .collect();
        all.sort_by(|a, b| (&a.0.scope, a.0.operation).cmp(&(&b.0.scope, b.0.operation)));
        all
    }
}

impl MetricsSink for LatencyRecorder {
    fn record_latency(&self, metric: &MetricName, elapsed: Duration) {
        let mut series = self.series.lock();
        match series.get_mut(metric) {
            Some(stats) => stats.record(elapsed),
            None => {
                series.insert(metric.clone(), LatencyStats::first(elapsed));
            }
        }
    }
}

/// Records the elapsed time when dropped, on success and error paths alike
pub(crate) struct LatencyTimer<'a> {
    sink: &'a Arc<dyn MetricsSink>,
    metric: &'a MetricName,
    started: Instant,
}

impl<'a> LatencyTimer<'a> {
    pub(crate) fn start(sink: &'a Arc<dyn MetricsSink>, metric: &'a MetricName) -> Self {
        Self {
            sink,
            metric,
            started: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer<'_> {
    fn drop(&mut self) {
        self.sink.record_latency(self.metric, self.started.elapsed());
    }
}

use crate::broadcast::PublishSummary;
use crate::processing::SolveBranch;
use serde::Serialize;
use std::sync::Mutex;

pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

/// Point-in-time copy of the relay counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub processed: usize,
    pub dropped: usize,
    pub exact: usize,
    pub flat: usize,
    pub ratio: usize,
    pub zero: usize,
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
    pub reconnects: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_processed(&self, branch: SolveBranch) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.processed += 1;
            match branch {
                SolveBranch::Exact => metrics.exact += 1,
                SolveBranch::Flat => metrics.flat += 1,
                SolveBranch::Ratio => metrics.ratio += 1,
                SolveBranch::ZeroDistance => metrics.zero += 1,
            }
        }
    }

    pub fn record_dropped(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.dropped += 1;
        }
    }

    pub fn record_publish(&self, summary: &PublishSummary) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.delivered += summary.delivered;
            metrics.skipped += summary.skipped;
            metrics.failed += summary.failed;
        }
    }

    pub fn record_reconnect(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.reconnects += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

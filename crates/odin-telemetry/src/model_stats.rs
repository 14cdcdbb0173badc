//! Per-model rolling averages

use serde::Serialize;

/// Rolling statistics for one model.
///
/// Averages use the incremental mean `avg += (x - avg) / n`. Once `n`
/// reaches the configured window the denominator stops growing, so the
/// average turns into an exponential moving average with weight
/// `1 / window` and stays numerically stable for long-lived processes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelStats {
    /// Total responses recorded
    pub requests: u64,

    /// Rolling average confidence (0.0-1.0)
    pub avg_confidence: f64,

    /// Rolling average processing time in seconds
    pub avg_processing_secs: f64,
}

impl ModelStats {
    pub(crate) fn record(&mut self, confidence: f64, processing_secs: f64, window: u64) {
        self.requests = self.requests.saturating_add(1);
        let n = self.requests.min(window.max(1)) as f64;
        self.avg_confidence += (confidence - self.avg_confidence) / n;
        self.avg_processing_secs += (processing_secs - self.avg_processing_secs) / n;
    }
}

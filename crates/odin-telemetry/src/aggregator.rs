//! Per-request latency and outcome aggregation
//!
//! The aggregator is advisory: no operation returns an error, and
//! malformed input is clamped or counted as an anomaly instead of being
//! propagated into the message flow.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::AggregatorConfig;
use crate::model_stats::ModelStats;
use crate::suggestions::{Suggestion, SuggestionLog};

/// Bottleneck key for requests slower than the advisory threshold
pub const HIGH_LATENCY: &str = "high_latency";

/// Bottleneck key for a success rate below the configured minimum
pub const LOW_SUCCESS_RATE: &str = "low_success_rate";

/// Bottleneck key recorded for a failure of the given type
pub fn error_key(error_type: &str) -> String {
    format!("error_{}", error_type)
}

/// Thread-safe collector of request latency, outcomes and per-model stats.
///
/// Cloning is cheap and every clone shares the same state.
#[derive(Clone)]
pub struct MetricsAggregator {
    inner: Arc<AggregatorInner>,
}

struct AggregatorInner {
    config: AggregatorConfig,
    successes: AtomicU64,
    failures: AtomicU64,
    unmatched_completions: AtomicU64,
    unmatched_failures: AtomicU64,
    clamped_inputs: AtomicU64,
    abandoned: AtomicU64,
    state: Mutex<AggregatorState>,
}

struct AggregatorState {
    in_flight: HashMap<String, Instant>,
    latencies: VecDeque<Duration>,
    models: HashMap<String, ModelStats>,
    bottlenecks: HashMap<String, u64>,
    suggestions: SuggestionLog,
}

impl AggregatorState {
    fn bump(&mut self, key: &str) {
        *self.bottlenecks.entry(key.to_string()).or_insert(0) += 1;
    }
}

/// Warnings decided under the lock and logged after it is released
#[derive(Default)]
struct Advisories {
    slow: Option<Duration>,
    low_success_rate: Option<f64>,
}

impl MetricsAggregator {
    /// Create an aggregator with the given configuration.
    ///
    /// Out-of-range values are saturated with
    /// [`AggregatorConfig::normalized`] instead of rejected.
    pub fn new(config: AggregatorConfig) -> Self {
        let normalized = config.clone().normalized();
        if normalized != config {
            warn!(?config, "Aggregator config out of range, using saturated values");
        }
        let config = normalized;

        let state = AggregatorState {
            in_flight: HashMap::new(),
            latencies: VecDeque::new(),
            models: HashMap::new(),
            bottlenecks: HashMap::new(),
            suggestions: SuggestionLog::new(
                config.suggestion_capacity,
                config.suggestion_cooldown(),
            ),
        };

        Self {
            inner: Arc::new(AggregatorInner {
                config,
                successes: AtomicU64::new(0),
                failures: AtomicU64::new(0),
                unmatched_completions: AtomicU64::new(0),
                unmatched_failures: AtomicU64::new(0),
                clamped_inputs: AtomicU64::new(0),
                abandoned: AtomicU64::new(0),
                state: Mutex::new(state),
            }),
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.inner.config
    }

    /// Record the start of a request.
    ///
    /// Starting an id that is already in flight restarts its clock.
    pub fn on_start(&self, request_id: impl Into<String>) {
        let now = Instant::now();
        self.inner.state.lock().in_flight.insert(request_id.into(), now);
    }

    /// Record the successful completion of a request started with
    /// [`on_start`](Self::on_start).
    ///
    /// A completion without a matching start is counted as an anomaly and
    /// leaves the success counter and latency window untouched.
    pub fn on_completed(&self, request_id: &str) {
        let now = Instant::now();
        let config = &self.inner.config;

        let mut advisories = Advisories::default();
        let latency = {
            let mut state = self.inner.state.lock();
            let started = state.in_flight.remove(request_id);
            let Some(started) = started else {
                drop(state);
                self.inner.unmatched_completions.fetch_add(1, Ordering::Relaxed);
                debug!(request_id, "Completion without matching start ignored");
                return;
            };

            let latency = now.saturating_duration_since(started);
            state.latencies.push_back(latency);
            while state.latencies.len() > config.window_capacity {
                state.latencies.pop_front();
            }
            self.inner.successes.fetch_add(1, Ordering::Relaxed);

            if latency > config.advisory_latency() {
                state.bump(HIGH_LATENCY);
                state.suggestions.offer(
                    HIGH_LATENCY,
                    format!(
                        "Latency of {:.1}ms exceeded the {}ms advisory threshold; consider caching or batching requests",
                        latency.as_secs_f64() * 1000.0,
                        config.advisory_latency_ms
                    ),
                    now,
                );
            }
            if latency > config.warn_latency() {
                advisories.slow = Some(latency);
            }
            advisories.low_success_rate = self.check_success_rate(&mut state, now);
            latency
        };

        metrics::counter!("odin_requests_completed_total").increment(1);
        metrics::histogram!("odin_request_latency_seconds").record(latency.as_secs_f64());
        self.emit(request_id, advisories);
    }

    /// Record a failed request.
    ///
    /// The failure is counted and tallied under `error_<type>` even when no
    /// start was recorded; the missing start is counted as an anomaly.
    pub fn on_failed(&self, request_id: &str, error_type: &str) {
        let now = Instant::now();
        let key = error_key(error_type);

        let advisories = {
            let mut state = self.inner.state.lock();
            if state.in_flight.remove(request_id).is_none() {
                self.inner.unmatched_failures.fetch_add(1, Ordering::Relaxed);
            }
            self.inner.failures.fetch_add(1, Ordering::Relaxed);

            state.bump(&key);
            state.suggestions.offer(
                &key,
                format!(
                    "Repeated '{}' failures; check the upstream dependency and consider retrying with backoff",
                    error_type
                ),
                now,
            );

            Advisories {
                slow: None,
                low_success_rate: self.check_success_rate(&mut state, now),
            }
        };

        debug!(request_id, error_type, "Request failed");
        metrics::counter!("odin_requests_failed_total", "error_type" => error_type.to_string())
            .increment(1);
        self.emit(request_id, advisories);
    }

    /// Fold one model response into that model's rolling averages.
    ///
    /// Confidence outside `[0, 1]` and negative or `NaN` processing times
    /// are clamped and counted.
    pub fn on_model_response(&self, model: &str, confidence: f64, processing_time_secs: f64) {
        let clamped_confidence = odin_core::types::clamp_score(confidence);
        let clamped_secs = odin_core::types::clamp_non_negative(processing_time_secs);
        if clamped_confidence != confidence || clamped_secs != processing_time_secs {
            self.inner.clamped_inputs.fetch_add(1, Ordering::Relaxed);
            debug!(
                model,
                confidence, processing_time_secs, "Clamped out-of-range model response"
            );
        }

        let window = self.inner.config.model_average_window;
        {
            let mut state = self.inner.state.lock();
            state
                .models
                .entry(model.to_string())
                .or_default()
                .record(clamped_confidence, clamped_secs, window);
        }

        metrics::counter!("odin_model_responses_total", "model" => model.to_string()).increment(1);
    }

    /// Run `future` as a tracked request.
    ///
    /// Calls [`on_start`](Self::on_start) before polling it, then
    /// [`on_completed`](Self::on_completed) on `Ok` or
    /// [`on_failed`](Self::on_failed) on `Err`, using `classify` to name
    /// the error type. The result is passed through unchanged.
    pub async fn track<F, T, E, C>(
        &self,
        request_id: impl Into<String>,
        future: F,
        classify: C,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        C: FnOnce(&E) -> String,
    {
        let request_id = request_id.into();
        self.on_start(request_id.clone());
        let result = future.await;
        match &result {
            Ok(_) => self.on_completed(&request_id),
            Err(e) => self.on_failed(&request_id, &classify(e)),
        }
        result
    }

    /// Drop in-flight records older than `max_age`, counting each as
    /// abandoned. Returns how many were dropped.
    pub fn evict_stale(&self, max_age: Duration) -> usize {
        let now = Instant::now();
        let evicted = {
            let mut state = self.inner.state.lock();
            let before = state.in_flight.len();
            state
                .in_flight
                .retain(|_, started| now.saturating_duration_since(*started) <= max_age);
            before - state.in_flight.len()
        };

        if evicted > 0 {
            self.inner
                .abandoned
                .fetch_add(evicted as u64, Ordering::Relaxed);
            warn!(evicted, "Dropped in-flight requests that never completed");
        }
        evicted
    }

    /// Copy the current state.
    ///
    /// The lock is held only while copying; statistics are computed on the
    /// returned snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        // counters are bumped under the same lock, so load them inside it
        let (successes, failures, latencies, models, bottlenecks, suggestions, in_flight) = {
            let state = self.inner.state.lock();
            (
                self.inner.successes.load(Ordering::Relaxed),
                self.inner.failures.load(Ordering::Relaxed),
                state.latencies.iter().copied().collect(),
                state.models.clone(),
                state.bottlenecks.clone(),
                state.suggestions.to_vec(),
                state.in_flight.len(),
            )
        };

        MetricsSnapshot {
            taken_at: Utc::now(),
            successes,
            failures,
            latencies,
            models,
            bottlenecks,
            suggestions,
            in_flight,
            anomalies: AnomalyCounts {
                unmatched_completions: self.inner.unmatched_completions.load(Ordering::Relaxed),
                unmatched_failures: self.inner.unmatched_failures.load(Ordering::Relaxed),
                clamped_inputs: self.inner.clamped_inputs.load(Ordering::Relaxed),
                abandoned: self.inner.abandoned.load(Ordering::Relaxed),
            },
        }
    }

    /// Reset all metrics
    pub fn reset(&self) {
        let mut state = self.inner.state.lock();
        state.in_flight.clear();
        state.latencies.clear();
        state.models.clear();
        state.bottlenecks.clear();
        state.suggestions.clear();
        for counter in [
            &self.inner.successes,
            &self.inner.failures,
            &self.inner.unmatched_completions,
            &self.inner.unmatched_failures,
            &self.inner.clamped_inputs,
            &self.inner.abandoned,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Returns the success rate when it is below the configured minimum and
    /// enough requests have been seen; records the bottleneck if so.
    fn check_success_rate(&self, state: &mut AggregatorState, now: Instant) -> Option<f64> {
        let config = &self.inner.config;
        let successes = self.inner.successes.load(Ordering::Relaxed);
        let failures = self.inner.failures.load(Ordering::Relaxed);
        let total = successes + failures;
        if total <= config.min_requests_for_rate {
            return None;
        }

        let rate = successes as f64 / total as f64;
        if rate >= config.min_success_rate {
            return None;
        }

        state.bump(LOW_SUCCESS_RATE);
        let added = state.suggestions.offer(
            LOW_SUCCESS_RATE,
            format!(
                "Success rate {:.1}% is below the {:.1}% target; review the error_* bottlenecks",
                rate * 100.0,
                config.min_success_rate * 100.0
            ),
            now,
        );
        // only warn as often as the suggestion cooldown allows
        added.then_some(rate)
    }

    fn emit(&self, request_id: &str, advisories: Advisories) {
        if let Some(latency) = advisories.slow {
            warn!(
                request_id,
                latency_ms = latency.as_secs_f64() * 1000.0,
                threshold_ms = self.inner.config.warn_latency_ms,
                "High request latency"
            );
        }
        if let Some(rate) = advisories.low_success_rate {
            warn!(
                success_rate = rate,
                threshold = self.inner.config.min_success_rate,
                "Success rate below target"
            );
        }
    }
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new(AggregatorConfig::default())
    }
}

/// Counts of tracking problems recovered locally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnomalyCounts {
    /// Completions with no matching start
    pub unmatched_completions: u64,

    /// Failures with no matching start
    pub unmatched_failures: u64,

    /// Model responses with out-of-range values
    pub clamped_inputs: u64,

    /// Requests evicted after never completing
    pub abandoned: u64,
}

/// Point-in-time copy of aggregator state
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub taken_at: DateTime<Utc>,
    pub successes: u64,
    pub failures: u64,

    /// Recent latencies, oldest first
    pub latencies: Vec<Duration>,

    pub models: HashMap<String, ModelStats>,
    pub bottlenecks: HashMap<String, u64>,

    /// Recent suggestions, oldest first
    pub suggestions: Vec<Suggestion>,

    /// Requests started but not yet finished
    pub in_flight: usize,

    pub anomalies: AnomalyCounts,
}

impl MetricsSnapshot {
    pub fn total_requests(&self) -> u64 {
        self.successes + self.failures
    }

    /// Successes over finished requests, `None` before any request finished
    pub fn success_rate(&self) -> Option<f64> {
        let total = self.total_requests();
        if total == 0 {
            None
        } else {
            Some(self.successes as f64 / total as f64)
        }
    }

    pub fn avg_latency(&self) -> Option<Duration> {
        if self.latencies.is_empty() {
            return None;
        }
        let total: Duration = self.latencies.iter().sum();
        Some(total / self.latencies.len() as u32)
    }

    pub fn median_latency(&self) -> Option<Duration> {
        let sorted = self.sorted_latencies();
        let len = sorted.len();
        match len {
            0 => None,
            _ if len % 2 == 1 => Some(sorted[len / 2]),
            _ => Some((sorted[len / 2 - 1] + sorted[len / 2]) / 2),
        }
    }

    /// Nearest-rank percentile of the latency window (`percentile` in 0-100)
    pub fn percentile_latency(&self, percentile: f64) -> Option<Duration> {
        let sorted = self.sorted_latencies();
        if sorted.is_empty() {
            return None;
        }
        let fraction = odin_core::types::clamp_score(percentile / 100.0);
        let index = (fraction * (sorted.len() - 1) as f64).round() as usize;
        Some(sorted[index.min(sorted.len() - 1)])
    }

    pub fn bottleneck(&self, key: &str) -> u64 {
        self.bottlenecks.get(key).copied().unwrap_or(0)
    }

    fn sorted_latencies(&self) -> Vec<Duration> {
        let mut sorted = self.latencies.clone();
        sorted.sort_unstable();
        sorted
    }
}

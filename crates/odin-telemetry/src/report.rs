//! Periodic metrics reporting
//!
//! A low-priority background task that wakes on a fixed interval, drops
//! abandoned in-flight requests, and logs a summary of the aggregator
//! state. It only reads snapshots and never blocks message flow.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::aggregator::{AnomalyCounts, MetricsAggregator, MetricsSnapshot};
use crate::model_stats::ModelStats;

const TOP_BOTTLENECKS: usize = 5;
const RECENT_SUGGESTIONS: usize = 5;

/// Serializable summary of a [`MetricsSnapshot`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    pub generated_at: DateTime<Utc>,
    pub total_requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub success_rate: Option<f64>,
    pub avg_latency_ms: Option<f64>,
    pub median_latency_ms: Option<f64>,
    pub p95_latency_ms: Option<f64>,
    pub in_flight: usize,

    /// Most frequent bottlenecks, highest count first
    pub top_bottlenecks: Vec<(String, u64)>,

    pub models: BTreeMap<String, ModelStats>,

    /// Latest suggestion messages, newest last
    pub recent_suggestions: Vec<String>,

    pub anomalies: AnomalyCounts,
}

impl MetricsReport {
    pub fn from_snapshot(snapshot: &MetricsSnapshot) -> Self {
        let as_ms = |d: Duration| d.as_secs_f64() * 1000.0;

        let mut top_bottlenecks: Vec<(String, u64)> = snapshot
            .bottlenecks
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        top_bottlenecks.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_bottlenecks.truncate(TOP_BOTTLENECKS);

        let skip = snapshot.suggestions.len().saturating_sub(RECENT_SUGGESTIONS);
        let recent_suggestions = snapshot.suggestions[skip..]
            .iter()
            .map(|s| s.message.clone())
            .collect();

        Self {
            generated_at: snapshot.taken_at,
            total_requests: snapshot.total_requests(),
            successes: snapshot.successes,
            failures: snapshot.failures,
            success_rate: snapshot.success_rate(),
            avg_latency_ms: snapshot.avg_latency().map(as_ms),
            median_latency_ms: snapshot.median_latency().map(as_ms),
            p95_latency_ms: snapshot.percentile_latency(95.0).map(as_ms),
            in_flight: snapshot.in_flight,
            top_bottlenecks,
            models: snapshot
                .models
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            recent_suggestions,
            anomalies: snapshot.anomalies,
        }
    }
}

/// Handle to a running reporter task
pub struct ReporterHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
    latest: watch::Receiver<Option<MetricsReport>>,
}

impl ReporterHandle {
    /// Most recent report, if one has been produced
    pub fn latest(&self) -> Option<MetricsReport> {
        self.latest.borrow().clone()
    }

    /// Subscribe to reports as they are produced
    pub fn subscribe(&self) -> watch::Receiver<Option<MetricsReport>> {
        self.latest.clone()
    }

    /// Stop the reporter and wait for it to exit
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            warn!("Metrics reporter exited abnormally: {}", e);
        }
    }
}

/// Spawn the periodic reporter on the current tokio runtime.
///
/// The interval and in-flight TTL come from the aggregator's config. The
/// first report is produced immediately, then once per
/// `report_interval_secs`.
pub fn spawn_reporter(aggregator: MetricsAggregator) -> ReporterHandle {
    let interval = aggregator.config().report_interval();
    let ttl = aggregator.config().in_flight_ttl();
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
    let (report_tx, report_rx) = watch::channel(None);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!("Metrics reporter started, interval {:?}", interval);

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = ticker.tick() => {
                    aggregator.evict_stale(ttl);
                    let report = MetricsReport::from_snapshot(&aggregator.snapshot());
                    log_report(&report);
                    report_tx.send_replace(Some(report));
                }
            }
        }

        info!("Metrics reporter stopped");
    });

    ReporterHandle {
        shutdown: Some(shutdown_tx),
        task,
        latest: report_rx,
    }
}

fn log_report(report: &MetricsReport) {
    info!(
        total = report.total_requests,
        success_rate = report.success_rate.unwrap_or(1.0),
        avg_latency_ms = report.avg_latency_ms.unwrap_or(0.0),
        median_latency_ms = report.median_latency_ms.unwrap_or(0.0),
        in_flight = report.in_flight,
        models = report.models.len(),
        "Metrics report"
    );
    for (kind, count) in &report.top_bottlenecks {
        debug!(bottleneck = %kind, count, "Bottleneck");
    }
    let anomalies = report.anomalies;
    if anomalies != AnomalyCounts::default() {
        info!(
            unmatched_completions = anomalies.unmatched_completions,
            unmatched_failures = anomalies.unmatched_failures,
            clamped_inputs = anomalies.clamped_inputs,
            abandoned = anomalies.abandoned,
            "Tracking anomalies"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AggregatorConfig;

    #[test]
    fn test_report_from_snapshot() {
        let aggregator = MetricsAggregator::new(AggregatorConfig {
            suggestion_cooldown_secs: 0,
            ..AggregatorConfig::default()
        });
        aggregator.on_start("r1");
        aggregator.on_completed("r1");
        for i in 0..3 {
            aggregator.on_failed(&format!("t{}", i), "timeout");
        }
        aggregator.on_failed("x", "auth");
        aggregator.on_model_response("gpt", 0.8, 0.2);

        let report = MetricsReport::from_snapshot(&aggregator.snapshot());
        assert_eq!(report.total_requests, 5);
        assert_eq!(report.successes, 1);
        assert_eq!(report.failures, 4);
        assert_eq!(report.success_rate, Some(0.2));
        assert!(report.avg_latency_ms.is_some());
        assert_eq!(
            report.top_bottlenecks,
            vec![("error_timeout".to_string(), 3), ("error_auth".to_string(), 1)]
        );
        assert_eq!(report.models["gpt"].requests, 1);
        assert_eq!(report.recent_suggestions.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reporter_publishes_and_stops() {
        let aggregator = MetricsAggregator::default();
        aggregator.on_failed("r1", "timeout");

        let handle = spawn_reporter(aggregator.clone());
        let mut reports = handle.subscribe();
        reports.changed().await.unwrap();
        assert_eq!(handle.latest().unwrap().failures, 1);

        aggregator.on_failed("r2", "timeout");
        tokio::time::advance(Duration::from_secs(61)).await;
        reports.changed().await.unwrap();
        assert_eq!(handle.latest().unwrap().failures, 2);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_reporter_keeps_running() {
        let aggregator = MetricsAggregator::new(AggregatorConfig {
            report_interval_secs: 0,
            ..AggregatorConfig::default()
        });

        let handle = spawn_reporter(aggregator.clone());
        let mut reports = handle.subscribe();
        reports.changed().await.unwrap();
        assert_eq!(handle.latest().unwrap().total_requests, 0);

        aggregator.on_failed("r1", "timeout");
        tokio::time::advance(Duration::from_secs(1)).await;
        reports.changed().await.unwrap();
        assert_eq!(handle.latest().unwrap().failures, 1);

        handle.shutdown().await;
    }
}

//! ODIN Telemetry
//!
//! In-process observability for ODIN message flows.
//!
//! Provides:
//! - Per-request latency windows and success/failure counters
//! - Per-model rolling averages of confidence and processing time
//! - Bottleneck tallies and rate-limited optimization suggestions
//! - A periodic reporter task that logs summaries
//!
//! Everything here is advisory. Nothing is persisted, and no operation can
//! fail or block the message flow it observes.

pub mod aggregator;
pub mod config;
pub mod model_stats;
pub mod report;
pub mod suggestions;

pub use aggregator::{error_key, AnomalyCounts, MetricsAggregator, MetricsSnapshot};
pub use config::AggregatorConfig;
pub use model_stats::ModelStats;
pub use report::{spawn_reporter, MetricsReport, ReporterHandle};
pub use suggestions::Suggestion;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::aggregator::{MetricsAggregator, MetricsSnapshot};
    pub use crate::config::AggregatorConfig;
    pub use crate::report::{spawn_reporter, MetricsReport};
}

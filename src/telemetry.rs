// src/telemetry.rs
//! Metric names and the one-time description of every series the pipeline
//! emits. No exporter is installed here; binaries and tests choose their own.

use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

pub const AGGREGATIONS_TOTAL: &str = "skyscript_aggregations_total";
pub const STALE_RESULTS_TOTAL: &str = "skyscript_stale_results_total";
pub const FETCH_ERRORS_TOTAL: &str = "skyscript_fetch_errors_total";
pub const AGGREGATE_MS: &str = "skyscript_aggregate_ms";

/// One-time metrics registration (so series show up on scrape).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(AGGREGATIONS_TOTAL, "Aggregations started for a debounced selection.");
        describe_counter!(
            STALE_RESULTS_TOTAL,
            "Aggregation results dropped because a newer selection superseded them."
        );
        describe_counter!(FETCH_ERRORS_TOTAL, "Upstream fetch/decode errors.");
        describe_histogram!(AGGREGATE_MS, "Wall time of one joined aggregation in milliseconds.");
    });
}

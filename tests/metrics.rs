// tests/metrics.rs
#![cfg(feature = "strict-metrics")]
mod common;

use std::time::Duration;

use chrono::NaiveDate;
use common::{aggregator, FakeTransport};
use metrics_exporter_prometheus::PrometheusBuilder;
use skyscript::{Dashboard, Selection};

#[tokio::test]
async fn pipeline_series_are_exposed() {
    // Install a local recorder for the test
    let handle = PrometheusBuilder::new().install_recorder().expect("recorder");

    let dash = Dashboard::spawn(aggregator(FakeTransport::instant()), Duration::from_millis(10));
    let mut rx = dash.subscribe();

    // One bad sign (fetch never starts) then a good selection.
    let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    dash.submit(Selection::new(d, "ar ies")).unwrap();
    rx.wait_for(|s| s.last_error.is_some()).await.unwrap();
    dash.submit(Selection::new(d, "aries")).unwrap();
    rx.wait_for(|s| s.current.is_some()).await.unwrap();
    dash.shutdown().await;

    let out = handle.render();
    assert!(out.contains("skyscript_aggregations_total"), "{out}");
    assert!(out.contains("skyscript_aggregate_ms"), "{out}");
}

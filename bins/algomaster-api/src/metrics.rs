// Prometheus metrics for code runs

use algomaster_common::types::RunSummary;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, IntCounterVec, TextEncoder,
};
use std::time::Duration;

lazy_static! {
    pub static ref RUNS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "runs_total",
        "Completed runs, by the backend that answered",
        &["backend"]
    )
    .expect("runs_total registers once");
    pub static ref TEST_CASES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "test_cases_total",
        "Evaluated test cases, by outcome",
        &["outcome"]
    )
    .expect("test_cases_total registers once");
    pub static ref RUN_DURATION_SECONDS: Histogram = register_histogram!(
        "run_duration_seconds",
        "Wall-clock time of a full run",
        vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]
    )
    .expect("run_duration_seconds registers once");
}

/// Force registration so `/metrics` lists every family from the start
pub fn register() {
    lazy_static::initialize(&RUNS_TOTAL);
    lazy_static::initialize(&TEST_CASES_TOTAL);
    lazy_static::initialize(&RUN_DURATION_SECONDS);
}

pub fn record_run(backend: &str, summary: &RunSummary, elapsed: Duration) {
    RUNS_TOTAL.with_label_values(&[backend]).inc();
    RUN_DURATION_SECONDS.observe(elapsed.as_secs_f64());

    let passed = summary.passed as u64;
    let failed = summary.results.len() as u64 - passed;
    // Cases never reached because of a compile error or rejection
    let skipped = summary.total.saturating_sub(summary.results.len()) as u64;

    TEST_CASES_TOTAL.with_label_values(&["passed"]).inc_by(passed);
    TEST_CASES_TOTAL.with_label_values(&["failed"]).inc_by(failed);
    TEST_CASES_TOTAL.with_label_values(&["skipped"]).inc_by(skipped);
}

pub fn render() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

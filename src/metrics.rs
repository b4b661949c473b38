use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Database Metrics (MongoDB)
    pub static ref DB_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "db_operations_total",
        "Total number of database operations",
        &["operation", "collection", "status"]
    )
    .unwrap();

    pub static ref DB_OPERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "db_operation_duration_seconds",
        "Database operation duration in seconds",
        &["operation", "collection"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .unwrap();

    // Sandbox runner metrics
    pub static ref SANDBOX_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "sandbox_requests_total",
        "Total number of sandbox execution requests",
        &["status"]
    )
    .unwrap();

    pub static ref SANDBOX_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "sandbox_request_duration_seconds",
        "Sandbox round trip duration in seconds (compile + run)",
        &["language"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0]
    )
    .unwrap();

    // Business Metrics
    pub static ref SUBMISSIONS_GRADED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "submissions_graded_total",
        "Total number of graded submissions",
        &["result"]
    )
    .unwrap();

    pub static ref TEST_CASES_EVALUATED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "test_cases_evaluated_total",
        "Total number of individual test cases evaluated",
        &["passed"]
    )
    .unwrap();

    pub static ref COMPLETIONS_RECORDED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "completions_recorded_total",
        "Total number of completion upserts",
        &["content_type"]
    )
    .unwrap();

    pub static ref LIMIT_BLOCKS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "limit_blocks_total",
        "Total number of attempts blocked by the weekly usage gate",
        &["kind"]
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Helper: track database operation with metrics
pub async fn track_db_operation<F, T>(
    operation: &str,
    collection: &str,
    future: F,
) -> Result<T, anyhow::Error>
where
    F: std::future::Future<Output = Result<T, anyhow::Error>>,
{
    let start = std::time::Instant::now();
    let result = future.await;
    let duration = start.elapsed().as_secs_f64();

    let status = if result.is_ok() { "success" } else { "error" };

    DB_OPERATIONS_TOTAL
        .with_label_values(&[operation, collection, status])
        .inc();

    DB_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation, collection])
        .observe(duration);

    result
}

//! Metrics and observability utilities
//!
//! Prometheus-style metrics through the `metrics` facade with
//! standardized naming. Nothing is recorded unless a recorder is installed.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Sanity Ranker metrics
pub const METRICS_PREFIX: &str = "sanity";

/// Buckets for ranking latency (in seconds); classifier requests are slow
pub const RANK_BUCKETS: &[f64] = &[
    0.005,  // 5ms
    0.025,  // 25ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
    60.00,  // 60s
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_rank_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of ranking requests"
    );

    describe_histogram!(
        format!("{}_rank_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Ranking latency in seconds"
    );

    describe_gauge!(
        format!("{}_rank_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of ranked documents before pagination"
    );

    describe_counter!(
        format!("{}_classifier_trainings_total", METRICS_PREFIX),
        Unit::Count,
        "Total classifier trainings"
    );

    describe_histogram!(
        format!("{}_classifier_training_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Classifier training latency in seconds"
    );

    describe_counter!(
        format!("{}_recommend_users_total", METRICS_PREFIX),
        Unit::Count,
        "Users visited by the recommendation job, by outcome"
    );

    describe_counter!(
        format!("{}_cache_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Total cache hits"
    );

    describe_counter!(
        format!("{}_cache_misses_total", METRICS_PREFIX),
        Unit::Count,
        "Total cache misses"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record ranking metrics
pub fn record_rank(duration_secs: f64, strategy: &str, result_count: usize) {
    counter!(
        format!("{}_rank_requests_total", METRICS_PREFIX),
        "strategy" => strategy.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_rank_duration_seconds", METRICS_PREFIX),
        "strategy" => strategy.to_string()
    )
    .record(duration_secs);

    gauge!(
        format!("{}_rank_results_count", METRICS_PREFIX),
        "strategy" => strategy.to_string()
    )
    .set(result_count as f64);
}

/// Helper to record classifier training metrics
pub fn record_training(duration_secs: f64, converged: bool) {
    counter!(
        format!("{}_classifier_trainings_total", METRICS_PREFIX),
        "converged" => converged.to_string()
    )
    .increment(1);

    histogram!(format!("{}_classifier_training_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Helper to record one user's outcome in the recommendation job
pub fn record_recommend_user(outcome: &str) {
    counter!(
        format!("{}_recommend_users_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Helper to record cache metrics
pub fn record_cache(hit: bool, cache_name: &str) {
    if hit {
        counter!(
            format!("{}_cache_hits_total", METRICS_PREFIX),
            "cache" => cache_name.to_string()
        )
        .increment(1);
    } else {
        counter!(
            format!("{}_cache_misses_total", METRICS_PREFIX),
            "cache" => cache_name.to_string()
        )
        .increment(1);
    }
}

//! Health check handlers

use crate::handlers::run_blocking;
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::time::Instant;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub data: CheckResult,
    pub features: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    fn from_outcome(outcome: sanity_common::Result<()>, start: Instant) -> Self {
        match outcome {
            Ok(()) => CheckResult {
                status: "up".to_string(),
                latency_ms: Some(start.elapsed().as_millis() as u64),
                error: None,
            },
            Err(e) => CheckResult {
                status: "down".to_string(),
                latency_ms: None,
                error: Some(e.to_string()),
            },
        }
    }

    fn is_up(&self) -> bool {
        self.status == "up"
    }
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: sanity_common::VERSION.to_string(),
    })
}

/// Readiness probe - data directory reachable and feature snapshot loadable
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let timeout = state.config.request_timeout();

    let start = Instant::now();
    let catalog = state.catalog.clone();
    let data = CheckResult::from_outcome(run_blocking(timeout, move || catalog.ping()).await, start);

    let start = Instant::now();
    let features = state.features.clone();
    let features = CheckResult::from_outcome(
        run_blocking(timeout, move || features.load().map(|_| ())).await,
        start,
    );

    let all_healthy = data.is_up() && features.is_up();
    let status = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadyResponse {
            status: if all_healthy { "ready" } else { "not_ready" }.to_string(),
            checks: HealthChecks { data, features },
        }),
    )
}

//! Sanity Ranker API
//!
//! Serves the ranking core over HTTP.
//! Handles:
//! - Interactive ranking (search, recency, random, more-like-this)
//! - Paper feature inspection and corpus statistics
//! - Observability (logging, metrics, request ids)

mod handlers;

use axum::{
    extract::{MatchedPath, Request},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use sanity_common::{
    config::{AppConfig, ObservabilityConfig},
    features::FileFeatureStore,
    metrics::{self, RequestMetrics, RANK_BUCKETS},
    store::{Catalog, JsonDirStore},
    FeatureStore,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub catalog: Arc<dyn Catalog>,
    pub features: Arc<dyn FeatureStore>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    init_tracing(&config.observability);
    info!("Starting Sanity Ranker API v{}", sanity_common::VERSION);

    // Initialize metrics
    if config.observability.metrics_port > 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .set_buckets_for_metric(Matcher::Suffix("seconds".to_string()), RANK_BUCKETS)?
            .install()?;
        info!("Metrics exporter listening on {}", addr);
    }
    metrics::register_metrics();

    // Open the collaborator stores
    info!(dir = %config.data.dir.display(), "Opening data directory");
    let catalog = JsonDirStore::open(&config.data.dir)?;
    let features = FileFeatureStore::new(config.features_path());

    let state = AppState {
        config: config.clone(),
        catalog: Arc::new(catalog),
        features: Arc::new(features),
    };

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Stdout subscriber; `RUST_LOG` overrides the configured level
fn init_tracing(config: &ObservabilityConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/", get(handlers::rank::rank))
        .route("/inspect", get(handlers::inspect::inspect))
        .route("/stats", get(handlers::stats::stats))
        .route_layer(middleware::from_fn(track_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // outermost last: the id is set before it is copied to the response
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Per-request counter and latency histogram
async fn track_metrics(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let timer = RequestMetrics::start(request.method().as_str(), &endpoint);

    let response = next.run(request).await;
    timer.finish(response.status().as_u16());
    response
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

//! HTTP serving of the exported model
//!
//! A thin axum app over the exported artifact: health probe, prediction
//! endpoint, and Prometheus metrics exposition. The loaded model lives in a
//! single swappable slot and is treated as immutable after load.

mod error;
mod handlers;
mod metrics;
mod state;

pub use error::ServeError;
pub use handlers::{HealthResponse, PredictionRequest, PredictionResponse};
pub use state::{AppState, LoadedModel};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub host: String,
    pub port: u16,
    /// Directory of the exported model artifact
    pub model_dir: PathBuf,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            model_dir: std::env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| crate::config::Settings::default().model_dir),
        }
    }
}

/// Build the application router over shared state.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/predict", post(handlers::predict))
        .route("/metrics", get(handlers::metrics_exposition))
        .layer(middleware::from_fn(track_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Record Prometheus metrics and a structured access log per request.
async fn track_requests(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let method = request.method().to_string();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let start = Instant::now();
    let response = next.run(request).await;
    let elapsed = start.elapsed().as_secs_f64();
    let status = response.status().as_u16();

    if metrics::should_track_path(&path) {
        metrics::record_request(&path, &method, status, elapsed);
        if status >= 500 {
            metrics::record_error(&path, &method);
        }
    }

    info!(
        request_id = %request_id,
        path = %path,
        method = %method,
        status_code = status,
        duration_ms = format!("{:.2}", elapsed * 1000.0),
        "request-complete"
    );

    response
}

/// Load the model (if present) and serve until interrupted.
pub async fn run_server(config: ServeConfig) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new());

    match state.load_from(&config.model_dir).await {
        Ok(loaded) => info!(
            model_version = %loaded.version,
            run_id = %loaded.run_id,
            source = %config.model_dir.display(),
            "loaded exported model"
        ),
        Err(err) => warn!(
            source = %config.model_dir.display(),
            error = %err,
            "no model loaded; /predict will return 503 until one is exported"
        ),
    }

    let app = create_router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "heartml API listening");
    axum::serve(listener, app).await?;

    Ok(())
}

//! HTTP surface for the churn service

pub mod error;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::service::ChurnService;

pub use error::ApiError;

/// Origins of the bundled dashboard dev servers
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://localhost:3000"];

/// Upload and request body ceiling (10 MiB)
pub const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub body_limit: usize,
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            body_limit: DEFAULT_BODY_LIMIT,
            request_timeout: Duration::from_secs(300),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Build the application router
pub fn router(service: Arc<ChurnService>, config: &ServerConfig) -> Router {
    Router::new()
        .route("/upload", post(handlers::upload))
        .route("/churn-summary", get(handlers::churn_summary))
        .route("/feature-importance", get(handlers::feature_importance))
        .route("/demographic-analysis", get(handlers::demographic_analysis))
        .route("/services-analysis", get(handlers::services_analysis))
        .route("/tenure-analysis", get(handlers::tenure_analysis))
        .route("/billing-analysis", get(handlers::billing_analysis))
        .route("/predict", post(handlers::predict))
        .route("/model-accuracy", get(handlers::model_accuracy))
        .route("/manual-predict", post(handlers::manual_predict))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(config.body_limit))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Skipping invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Serve until Ctrl-C
pub async fn serve(service: Arc<ChurnService>, config: ServerConfig) -> std::io::Result<()> {
    let app = router(service, &config);
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
    }
}

//! Weapon Detection API Server
//!
//! REST API and WebSocket server for detection, alerting and detection
//! statistics.

use axum::{
    extract::{DefaultBodyLimit, State},
    http::header,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_governor::GovernorLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use alerting::{AlertChannels, AlertManager};
use detector::{ObjectDetector, OnnxDetector};
use storage::DetectionLogger;

pub mod error;
pub mod logging;
pub mod pipeline;
pub mod rate_limit;
pub mod routes;
pub mod settings;

pub use error::ApiError;
pub use logging::init_logging;
pub use settings::Settings;

/// Service name reported by the health endpoint
pub const SERVICE_NAME: &str = "Weapon Detection API";

/// Shared handle to the application state
pub type SharedState = Arc<AppState>;

/// Application state shared across handlers
pub struct AppState {
    /// Loaded detector, None when the model failed to load
    pub detector: Option<Arc<dyn ObjectDetector>>,
    /// Alert gate and dispatcher
    pub alert_manager: AlertManager,
    /// Detection log
    pub detection_logger: DetectionLogger,
    /// Effective settings
    pub settings: Settings,
    /// Prometheus handle, installed by `run_server`
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create application state from already-built components
    pub fn new(
        detector: Option<Arc<dyn ObjectDetector>>,
        alert_manager: AlertManager,
        detection_logger: DetectionLogger,
        settings: Settings,
    ) -> Self {
        Self {
            detector,
            alert_manager,
            detection_logger,
            settings,
            metrics: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }

    /// Build every component from settings.
    ///
    /// A model that fails to load is logged and leaves the service up with
    /// detection endpoints answering 503.
    pub fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let detector: Option<Arc<dyn ObjectDetector>> =
            match OnnxDetector::load(settings.model.clone()) {
                Ok(detector) => {
                    info!("Detector ready, classes: {:?}", detector.class_names());
                    Some(Arc::new(detector))
                }
                Err(e) => {
                    error!("Detector unavailable: {}", e);
                    None
                }
            };

        let channels = AlertChannels::from_config(
            &settings.twilio,
            &settings.firebase,
            Duration::from_secs(settings.alerts.channel_timeout_secs),
        )?;
        let alert_manager = AlertManager::new(settings.alerts.clone(), channels);
        let detection_logger = DetectionLogger::new(&settings.storage.log_dir)?;

        Ok(Self::new(detector, alert_manager, detection_logger, settings))
    }
}

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub model_loaded: bool,
    /// Labels the loaded model reports, empty without a model
    pub classes: Vec<String>,
    pub version: String,
    pub uptime_seconds: u64,
    /// Seconds until the next alert may be dispatched
    pub alert_cooldown_remaining_secs: f64,
}

/// Create the application router
pub fn create_router(state: SharedState) -> Router {
    let body_limit = state.settings.server.max_body_bytes;

    Router::new()
        .route("/", get(health_handler))
        .route("/health", get(health_handler))
        .route("/detect/image", post(routes::detect::detect_image))
        .route("/detect/frame", post(routes::detect::detect_frame))
        .route("/ws/stream", get(routes::stream::ws_stream))
        .route("/config/alert", post(routes::config::configure_alerts))
        .route("/stats/detections", get(routes::stats::get_stats))
        .route(
            "/stats/detections/:date",
            get(routes::stats::get_detections_by_date),
        )
        .route("/admin/logs", delete(routes::admin::clear_logs))
        .route("/metrics", get(metrics_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let cooldown = state
        .alert_manager
        .remaining_cooldown()
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);

    Json(HealthResponse {
        status: "online".to_string(),
        service: SERVICE_NAME.to_string(),
        model_loaded: state.detector.is_some(),
        classes: state
            .detector
            .as_ref()
            .map(|d| d.class_names().to_vec())
            .unwrap_or_default(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        alert_cooldown_remaining_secs: cooldown,
    })
}

/// Prometheus exposition
async fn metrics_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let body = state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default();
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

/// Run the server until Ctrl-C
pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;

    info!("Model: {}", settings.model.model_path);
    info!("Minimum confidence: {}", settings.model.confidence_threshold);

    let addr: SocketAddr = settings.server.bind_addr.parse()?;
    let limits = rate_limit::RateLimitConfig::from(&settings.server);

    let mut state = AppState::from_settings(settings)?;
    state.metrics = Some(metrics);
    let mut app = create_router(Arc::new(state));

    match rate_limit::create_governor_config(&limits) {
        Some(config) => {
            rate_limit::spawn_limiter_cleanup(config.clone(), Duration::from_secs(60));
            app = app.layer(GovernorLayer { config });
        }
        None => warn!("Invalid rate limit settings {:?}, rate limiting disabled", limits),
    }

    info!("Starting API server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down...");
}

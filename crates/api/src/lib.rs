//! Face Quality API Server
//!
//! REST API returning a face quality report for one uploaded image:
//! - `POST /api/v1/face` with a multipart `image` field
//! - `GET /api/v1/health`

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use face_analysis::{FaceAnalyzer, FaceReport};
use face_models::ModelHandles;
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

pub mod config;
pub mod error;

pub use crate::config::ServiceConfig;
pub use crate::error::ApiError;

/// Multipart field carrying the upload
pub const IMAGE_FIELD: &str = "image";

/// Application state shared across handlers
pub struct AppState {
    /// Report pipeline, set once the models are loaded
    analyzer: OnceLock<FaceAnalyzer>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
    /// Largest accepted request body
    pub max_upload_bytes: usize,
}

impl AppState {
    /// State with no models yet; analysis requests get 503 until
    /// [`AppState::set_analyzer`] is called
    pub fn new(max_upload_bytes: usize) -> Self {
        Self {
            analyzer: OnceLock::new(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
            max_upload_bytes,
        }
    }

    /// Install the pipeline; returns false if one was already set
    pub fn set_analyzer(&self, analyzer: FaceAnalyzer) -> bool {
        self.analyzer.set(analyzer).is_ok()
    }

    pub fn analyzer(&self) -> Option<&FaceAnalyzer> {
        self.analyzer.get()
    }

    pub fn models_loaded(&self) -> bool {
        self.analyzer.get().is_some()
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub models_loaded: bool,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_upload_bytes;
    Router::new()
        .route("/api/v1/face", post(face_handler))
        .route("/api/v1/health", get(health_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Analyse the uploaded image
async fn face_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<FaceReport>, ApiError> {
    let analyzer = state
        .analyzer()
        .cloned()
        .ok_or_else(|| ApiError::Unavailable("models are still loading".to_string()))?;

    let (file_name, bytes) = read_image_field(&mut multipart).await?;
    debug!(file_name = %file_name, bytes = bytes.len(), "Upload received");

    let report = tokio::task::spawn_blocking(move || analyzer.analyze_blob(&file_name, &bytes))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(report))
}

async fn read_image_field(multipart: &mut Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(multipart_error)?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or(IMAGE_FIELD).to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.is_empty() {
            return Err(ApiError::BadRequest("uploaded image is empty".to_string()));
        }
        return Ok((file_name, bytes.to_vec()));
    }
    Err(ApiError::BadRequest(format!(
        "missing multipart field {:?}",
        IMAGE_FIELD
    )))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let models_loaded = state.models_loaded();
    Json(HealthResponse {
        status: if models_loaded { "healthy" } else { "loading" }.to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        models_loaded,
    })
}

/// Initialize logging; `RUST_LOG` takes precedence over `level`
pub fn init_logging(
    level: &str,
    json: bool,
) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    }
}

/// Serve until Ctrl-C, loading the models in the background.
///
/// Health checks answer as soon as the listener is bound; a model that fails
/// to load stops the server.
pub async fn run_server(config: ServiceConfig) -> Result<(), ApiError> {
    let addr = config.resolve_bind_addr(std::env::var("PORT").ok().as_deref())?;

    let state = Arc::new(AppState::new(config.max_upload_bytes));
    let app = create_router(state.clone());

    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
    });

    let paths = config.model_paths();
    let detector_settings = config.detector;
    let loaded = tokio::task::spawn_blocking(move || ModelHandles::load(&paths, detector_settings))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))
        .and_then(|result| result.map_err(ApiError::from));
    let models = match loaded {
        Ok(models) => models,
        Err(e) => {
            error!(error = %e, "Model loading failed, stopping server");
            server.abort();
            return Err(e);
        }
    };
    state.set_analyzer(FaceAnalyzer::new(
        config.analysis.clone(),
        models.detector,
        models.predictor,
    ));
    info!("Models ready, accepting analysis requests");

    server
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // no signal handler: run until killed
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

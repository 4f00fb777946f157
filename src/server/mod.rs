//! HTTP Server
//!
//! Exposes the slow + reverb pipeline over HTTP using axum.
//!
//! # Endpoints
//!
//! - `GET /` - Upload page
//! - `POST /process` - Multipart WAV upload, responds with the processed WAV
//! - `GET /health` - Liveness probe

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::SlowReverbError;
use crate::processing::{EffectParameters, SlowReverbProcessor};

const INDEX_HTML: &str = include_str!("index.html");

/// Room for multipart boundaries and the small text fields
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared application state
///
/// Holds no per-request data. `jobs` caps how many pipelines run on the
/// blocking pool at once.
pub struct AppState {
    pub config: Config,
    pub processor: SlowReverbProcessor,
    pub jobs: Arc<Semaphore>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let processor = SlowReverbProcessor::from_config(&config);
        let jobs = Arc::new(Semaphore::new(config.server.max_concurrent_jobs.min(Semaphore::MAX_PERMITS)));
        Self { config, processor, jobs }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub name: String,
    pub version: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    fn too_large(max_bytes: usize) -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("File too large. Maximum size is {}MB", max_bytes / (1024 * 1024)),
        )
    }
}

impl From<SlowReverbError> for ApiError {
    fn from(err: SlowReverbError) -> Self {
        let status = match &err {
            SlowReverbError::InvalidParameter { .. } | SlowReverbError::DurationExceeded { .. } => {
                StatusCode::BAD_REQUEST
            }
            SlowReverbError::UnsupportedFormat { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            SlowReverbError::Encoding { .. }
            | SlowReverbError::Config { .. }
            | SlowReverbError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

/// Parsed multipart form
struct UploadForm {
    file_name: Option<String>,
    data: Option<Bytes>,
    fields: HashMap<String, String>,
}

async fn read_form(multipart: &mut Multipart, max_upload_bytes: usize) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm { file_name: None, data: None, fields: HashMap::new() };

    let multipart_error = |e: axum::extract::multipart::MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::too_large(max_upload_bytes)
        } else {
            ApiError::new(e.status(), e.body_text())
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            form.file_name = Some(field.file_name().unwrap_or_default().to_string());
            form.data = Some(field.bytes().await.map_err(multipart_error)?);
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            form.fields.insert(name, value.trim().to_string());
        }
    }

    Ok(form)
}

fn parse_field<T: std::str::FromStr>(fields: &HashMap<String, String>, name: &str, error: &str) -> Result<Option<T>, ApiError> {
    match fields.get(name).filter(|v| !v.is_empty()) {
        Some(value) => value.parse::<T>().map(Some).map_err(|_| ApiError::bad_request(error)),
        None => Ok(None),
    }
}

/// Presets first, then explicit values, on top of the configured defaults
fn effect_parameters(fields: &HashMap<String, String>, defaults: EffectParameters) -> Result<EffectParameters, ApiError> {
    let mut params = defaults;

    if let Some(index) = parse_field::<usize>(fields, "speed", "Invalid speed value")? {
        params = params.with_speed_preset(index)?;
    }
    if let Some(index) = parse_field::<usize>(fields, "reverb", "Invalid reverb value")? {
        params = params.with_reverb_preset(index)?;
    }
    if let Some(v) = parse_field(fields, "speed_factor", "Invalid speed_factor value")? {
        params.speed_factor = v;
    }
    if let Some(v) = parse_field(fields, "room_size", "Invalid room_size value")? {
        params.room_size = v;
    }
    if let Some(v) = parse_field(fields, "damping", "Invalid damping value")? {
        params.damping = v;
    }
    if let Some(v) = parse_field(fields, "wet_level", "Invalid wet_level value")? {
        params.wet_level = v;
    }

    params.validate()?;
    Ok(params)
}

fn allowed_file(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
}

/// Attachment name for the processed file, restricted to a safe charset
pub fn download_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let safe: String = stem
        .chars()
        .map(|c| if c.is_ascii_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect();
    let safe = safe.trim_matches('.');
    if safe.is_empty() {
        "slowreverb.wav".to_string()
    } else {
        format!("slowreverb_{}.wav", safe)
    }
}

/// GET / - Upload page
async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        name: crate::NAME.to_string(),
        version: crate::VERSION.to_string(),
    })
}

/// POST /process - Slow down and reverb an uploaded WAV file
async fn process_upload(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    match handle_upload(&state, &mut multipart).await {
        Ok(response) => response,
        Err(err) => {
            warn!("Request failed ({}): {}", err.status, err.message);
            err.into_response()
        }
    }
}

async fn handle_upload(state: &AppState, multipart: &mut Multipart) -> Result<Response, ApiError> {
    let max_upload_bytes = state.config.limits.max_upload_bytes;
    let form = read_form(multipart, max_upload_bytes).await?;

    let (Some(file_name), Some(data)) = (form.file_name, form.data) else {
        return Err(ApiError::bad_request("No file provided"));
    };
    if file_name.is_empty() {
        return Err(ApiError::bad_request("No file selected"));
    }
    if !allowed_file(&file_name) {
        return Err(ApiError::bad_request("Only WAV files are supported"));
    }
    if data.len() > max_upload_bytes {
        return Err(ApiError::too_large(max_upload_bytes));
    }

    let params = effect_parameters(&form.fields, state.config.effects.parameters())?;
    info!("Processing {} ({} bytes): {}", file_name, data.len(), params);

    let processor = state.processor.clone();
    let jobs = state.jobs.clone();
    let job = async move {
        let permit = jobs
            .acquire_owned()
            .await
            .map_err(|_| ApiError::internal("Processing pool is closed"))?;
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            processor.process(&data, &params)
        })
        .await
        .map_err(|e| ApiError::internal(format!("Processing task failed: {}", e)))?
        .map_err(ApiError::from)
    };

    let output = tokio::time::timeout(state.config.request_timeout(), job)
        .await
        .map_err(|_| ApiError::new(StatusCode::GATEWAY_TIMEOUT, "Processing timed out"))??;

    let disposition = format!("attachment; filename=\"{}\"", download_name(&file_name));
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "audio/wav".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        output.bytes,
    )
        .into_response())
}

/// Create the axum router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = state.config.limits.max_upload_bytes + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/process", post(process_upload))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Start the server
pub async fn serve(state: Arc<AppState>, addr: &str) -> std::io::Result<()> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Starting slowreverb server on {}", listener.local_addr()?);
    axum::serve(listener, router).await?;

    Ok(())
}

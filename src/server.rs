use crate::config::Config;
use crate::detection::{self, Detection, ObjectDetector};
use crate::emirates::{self, EmiratesIdFront};
use crate::engines;
use crate::error::ScanError;
use crate::mrz::{self, CheckDigitReport, MrzRecord};
use crate::recognizer::TextRecognizer;
use crate::rectify::{Quad, Rectifier, RectifyParams, StepTiming};
use crate::vision::ImageprocVision;
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, State},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tempfile::NamedTempFile;
use tower_http::trace::TraceLayer;

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub recognizer: Arc<dyn TextRecognizer>,
    pub rectifier: Arc<Rectifier>,
    pub detector: Option<Arc<dyn ObjectDetector>>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, recognizer: Arc<dyn TextRecognizer>) -> Self {
        let rectifier = Rectifier::new(
            ImageprocVision,
            config.rectify_params(),
            config.output_dir(),
        )
        .with_retention(config.keep_rectified);

        Self {
            recognizer,
            rectifier: Arc::new(rectifier),
            detector: None,
            config: Arc::new(config),
        }
    }

    /// Serve `POST /detect` with `detector`
    pub fn with_detector(mut self, detector: Arc<dyn ObjectDetector>) -> Self {
        self.detector = Some(detector);
        self
    }
}

/// Decoded MRZ with its check digit verification
#[derive(Serialize)]
pub struct MrzResponse {
    pub record: MrzRecord,
    pub check_digits: CheckDigitReport,
    pub processing_time_ms: u64,
}

#[derive(Deserialize)]
pub struct MrzParseRequest {
    pub lines: Vec<String>,
}

/// Base64 image, optionally as a `data:` URL
#[derive(Deserialize)]
pub struct DetectRequest {
    pub image: String,
}

#[derive(Serialize)]
pub struct DetectResponse {
    pub detections: Vec<Detection>,
    pub processing_time_ms: u64,
}

/// Rectification response
#[derive(Serialize)]
pub struct RectifyResponse {
    /// Server-side copy in the cache directory
    pub output_path: PathBuf,
    /// The rectified PNG itself
    pub image_base64: String,
    pub width: u32,
    pub height: u32,
    pub corners: Quad,
    pub steps: Vec<StepTiming>,
    pub processing_time_ms: u64,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub engine: String,
    pub engine_description: String,
    pub supported_formats: Vec<String>,
    pub max_file_size_bytes: usize,
    pub rectify: RectifyParams,
    pub detector_available: bool,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_file_size + MULTIPART_OVERHEAD;

    Router::new()
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .route("/mrz", post(handle_mrz))
        .route("/mrz/parse", post(handle_mrz_parse))
        .route("/emirates-id/front", post(handle_emirates_front))
        .route("/rectify", post(handle_rectify))
        .route("/detect", post(handle_detect))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let recognizer = engines::init(&config)?;
    tracing::info!(
        "Text recognizer: {} ({})",
        recognizer.name(),
        recognizer.description()
    );

    let addr = format!("{}:{}", config.host, config.port);
    let app = router(AppState::new(config, recognizer));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Handle MRZ scans of a card back
async fn handle_mrz(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<MrzResponse>, ScanError> {
    let start = Instant::now();
    let upload = read_upload(multipart, state.config.max_file_size).await?;

    let recognizer = Arc::clone(&state.recognizer);
    let record = run_blocking(move || {
        let ocr = recognizer.recognize(upload.path())?;
        let lines = mrz::mrz_lines_from_text(&ocr.text);
        tracing::debug!(candidates = lines.len(), "MRZ lines extracted from OCR text");
        Ok(mrz::parse_td1(&lines)?)
    })
    .await?;

    Ok(Json(mrz_response(record, start)))
}

/// Handle MRZ lines that were read elsewhere
async fn handle_mrz_parse(
    payload: Result<Json<MrzParseRequest>, JsonRejection>,
) -> Result<Json<MrzResponse>, ScanError> {
    let start = Instant::now();
    let Json(request) = payload.map_err(|e| ScanError::InvalidRequest(e.body_text()))?;

    let record = mrz::parse_td1(&request.lines)?;
    Ok(Json(mrz_response(record, start)))
}

fn mrz_response(record: MrzRecord, start: Instant) -> MrzResponse {
    let check_digits = record.check_digits();
    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        "MRZ decoded in {}ms, check digits valid: {}",
        processing_time_ms,
        check_digits.all_valid()
    );

    MrzResponse {
        record,
        check_digits,
        processing_time_ms,
    }
}

/// Handle UAE identity card front scans
async fn handle_emirates_front(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Option<EmiratesIdFront>>, ScanError> {
    let upload = read_upload(multipart, state.config.max_file_size).await?;

    let recognizer = Arc::clone(&state.recognizer);
    let front = run_blocking(move || {
        let ocr = recognizer.recognize(upload.path())?;
        Ok(emirates::extract_front(&ocr))
    })
    .await?;

    Ok(Json(front))
}

/// Handle document rectification
async fn handle_rectify(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<RectifyResponse>, ScanError> {
    let start = Instant::now();
    let upload = read_upload(multipart, state.config.max_file_size).await?;

    let rectifier = Arc::clone(&state.rectifier);
    let (document, png) = run_blocking(move || {
        let document = rectifier.rectify(upload.path())?;
        let png = std::fs::read(&document.path)
            .map_err(|e| ScanError::Internal(format!("Failed to read rectified image: {}", e)))?;
        Ok((document, png))
    })
    .await?;

    let processing_time_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        "Rectified {}x{} document in {}ms",
        document.width,
        document.height,
        processing_time_ms
    );

    Ok(Json(RectifyResponse {
        output_path: document.path,
        image_base64: STANDARD.encode(png),
        width: document.width,
        height: document.height,
        corners: document.corners,
        steps: document.steps,
        processing_time_ms,
    }))
}

/// Handle object detection on a base64 image
async fn handle_detect(
    State(state): State<AppState>,
    payload: Result<Json<DetectRequest>, JsonRejection>,
) -> Result<Json<DetectResponse>, ScanError> {
    let start = Instant::now();
    let detector = state.detector.clone().ok_or(ScanError::DetectorUnavailable)?;
    let Json(request) = payload.map_err(|e| ScanError::InvalidRequest(e.body_text()))?;

    let detections = run_blocking(move || {
        Ok(detection::detect_base64(detector.as_ref(), &request.image)?)
    })
    .await?;

    let processing_time_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        "Detected {} objects in {}ms",
        detections.len(),
        processing_time_ms
    );

    Ok(Json(DetectResponse {
        detections,
        processing_time_ms,
    }))
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine: state.recognizer.name().to_string(),
        engine_description: state.recognizer.description().to_string(),
        supported_formats: state.recognizer.supported_formats(),
        max_file_size_bytes: state.config.max_file_size,
        rectify: state.config.rectify_params(),
        detector_available: state.detector.is_some(),
    })
}

/// Read the `file` field of a multipart upload into a temp file whose
/// extension matches the declared content type
async fn read_upload(
    mut multipart: Multipart,
    max_file_size: usize,
) -> Result<NamedTempFile, ScanError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ScanError::InvalidRequest(format!("Failed to parse multipart: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().map(|s| s.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| ScanError::InvalidRequest(format!("Failed to read file data: {}", e)))?;
        upload = Some((data, content_type));
    }

    let (data, content_type) = upload.ok_or(ScanError::MissingFile)?;

    if data.len() > max_file_size {
        return Err(ScanError::ImageTooLarge {
            size: data.len(),
            max: max_file_size,
        });
    }

    let mime = content_type.unwrap_or_else(|| "application/octet-stream".to_string());
    if !mime.starts_with("image/") {
        tracing::warn!("Received file with content type: {}", mime);
    }

    let mut temp_file = tempfile::Builder::new()
        .suffix(extension_for(&mime))
        .tempfile()
        .map_err(|e| ScanError::Internal(format!("Failed to create temp file: {}", e)))?;

    temp_file
        .write_all(&data)
        .map_err(|e| ScanError::Internal(format!("Failed to write temp file: {}", e)))?;

    Ok(temp_file)
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/png" => ".png",
        "image/jpeg" => ".jpg",
        "image/gif" => ".gif",
        "image/bmp" => ".bmp",
        "image/webp" => ".webp",
        "image/tiff" => ".tiff",
        _ => ".tmp",
    }
}

/// Run CPU bound work off the async runtime
async fn run_blocking<T, F>(work: F) -> Result<T, ScanError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ScanError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ScanError::Internal(format!("Worker task failed: {}", e)))?
}

//! OCRS engine implementation
//!
//! Pure Rust OCR engine using the ocrs library. No system dependencies required.
//! Downloads neural network models into the cache directory on first use.

use crate::config::Config;
use crate::error::ScanError;
use crate::recognizer::{RecognizedText, TextRecognizer};
use image::DynamicImage;
use ocrs::{DecodeMethod, ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default model URLs from the ocrs project
const DETECTION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten";
const RECOGNITION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten";

/// Text recognizer wrapping the ocrs library
pub struct OcrsEngine {
    engine: OcrEngine,
}

impl OcrsEngine {
    /// Create the engine, downloading models if needed
    pub fn new(config: &Config) -> Result<Self, ScanError> {
        let model_dir = config.cache_dir.join("models");

        let detection_model_path =
            ensure_model_downloaded(&model_dir, DETECTION_MODEL_URL, "text-detection.rten")?;
        let recognition_model_path =
            ensure_model_downloaded(&model_dir, RECOGNITION_MODEL_URL, "text-recognition.rten")?;

        let detection_model = Model::load_file(&detection_model_path).map_err(|e| {
            ScanError::InitializationError(format!("Failed to load detection model: {}", e))
        })?;
        let recognition_model = Model::load_file(&recognition_model_path).map_err(|e| {
            ScanError::InitializationError(format!("Failed to load recognition model: {}", e))
        })?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            decode_method: DecodeMethod::Greedy,
            ..Default::default()
        })
        .map_err(|e| {
            ScanError::InitializationError(format!("Failed to create OCR engine: {}", e))
        })?;

        tracing::info!("ocrs engine initialized successfully");

        Ok(Self { engine })
    }
}

impl TextRecognizer for OcrsEngine {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    fn description(&self) -> &'static str {
        "Pure Rust OCR engine - fast, no system dependencies required"
    }

    fn recognize_image(&self, image: &DynamicImage) -> Result<RecognizedText, ScanError> {
        // ImageSource::from_bytes expects RGB8 in HWC layout
        let rgb_img = image.to_rgb8();
        let dimensions = rgb_img.dimensions();

        let img_source = ImageSource::from_bytes(rgb_img.as_raw(), dimensions)
            .map_err(|e| ScanError::primitive("ocr input", e))?;

        let ocr_input = self
            .engine
            .prepare_input(img_source)
            .map_err(|e| ScanError::primitive("ocr prepare", e))?;

        let word_rects = self
            .engine
            .detect_words(&ocr_input)
            .map_err(|e| ScanError::primitive("ocr detect words", e))?;

        let line_rects = self.engine.find_text_lines(&ocr_input, &word_rects);

        let line_texts = self
            .engine
            .recognize_text(&ocr_input, &line_rects)
            .map_err(|e| ScanError::primitive("ocr recognize", e))?;

        // One block per recognized line
        let lines: Vec<String> = line_texts
            .iter()
            .filter_map(|line| line.as_ref())
            .map(|line| {
                line.words()
                    .map(|word| word.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|line| !line.trim().is_empty())
            .collect();

        tracing::debug!(lines = lines.len(), "ocrs recognition finished");

        Ok(RecognizedText::from_blocks(lines))
    }

    fn supported_formats(&self) -> Vec<String> {
        vec![
            "image/png".to_string(),
            "image/jpeg".to_string(),
            "image/gif".to_string(),
            "image/bmp".to_string(),
            "image/webp".to_string(),
            "image/tiff".to_string(),
        ]
    }
}

/// Ensure model is downloaded and return its path
fn ensure_model_downloaded(
    model_dir: &Path,
    url: &str,
    filename: &str,
) -> Result<PathBuf, ScanError> {
    std::fs::create_dir_all(model_dir).map_err(|e| {
        ScanError::InitializationError(format!("Failed to create model directory: {}", e))
    })?;

    let model_path = model_dir.join(filename);

    if !model_path.exists() {
        tracing::info!("Downloading {} (this may take a moment)...", filename);
        download_file(url, &model_path)?;
        tracing::info!("Downloaded {} to {:?}", filename, model_path);
    } else {
        tracing::info!("Using cached model from {:?}", model_path);
    }

    Ok(model_path)
}

/// Download a file from URL to path using ureq
fn download_file(url: &str, path: &Path) -> Result<(), ScanError> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| ScanError::InitializationError(format!("Failed to download model: {}", e)))?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        ScanError::InitializationError(format!("Failed to read response body: {}", e))
    })?;

    // A partial download must never sit at the cached path
    let partial = path.with_extension("part");
    let mut file = File::create(&partial).map_err(|e| {
        ScanError::InitializationError(format!("Failed to create model file: {}", e))
    })?;
    file.write_all(&buffer).map_err(|e| {
        ScanError::InitializationError(format!("Failed to write model file: {}", e))
    })?;
    std::fs::rename(&partial, path).map_err(|e| {
        ScanError::InitializationError(format!("Failed to move model file into place: {}", e))
    })?;

    Ok(())
}

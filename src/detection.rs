//! Object detector contract
//!
//! A detector takes a decoded image and returns labelled detections or a
//! typed failure. No model ships with this crate: a host embedding the server
//! implements [`ObjectDetector`] and registers it with
//! [`AppState::with_detector`](crate::server::AppState::with_detector), which
//! enables `POST /detect`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use serde::Serialize;
use thiserror::Error;

/// Tracking id reported when the detector does not track objects
pub const UNTRACKED: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub id: i32,
    pub labels: Vec<String>,
}

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Detection failed: {0}")]
    Detection(String),
}

pub trait ObjectDetector: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, DetectionError>;
}

/// Decode a base64 encoded image and run `detector` on it.
///
/// A `data:` URL prefix is accepted.
pub fn detect_base64<D>(detector: &D, payload: &str) -> Result<Vec<Detection>, DetectionError>
where
    D: ObjectDetector + ?Sized,
{
    let encoded = match payload.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => payload,
    };

    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| DetectionError::Decode(e.to_string()))?;
    let image =
        image::load_from_memory(&bytes).map_err(|e| DetectionError::Decode(e.to_string()))?;

    let detections = detector.detect(&image)?;
    tracing::debug!(count = detections.len(), "Detector finished");
    Ok(detections)
}

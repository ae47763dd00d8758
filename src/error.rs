use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::detection::DetectionError;
use crate::mrz::FormatError;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid MRZ: {0}")]
    Format(#[from] FormatError),

    #[error("No document detected in image")]
    NoDocumentDetected,

    #[error("{operation} failed: {message}")]
    PrimitiveFailure {
        operation: &'static str,
        message: String,
    },

    #[error(transparent)]
    Detection(#[from] DetectionError),

    #[error("No object detector is configured")]
    DetectorUnavailable,

    #[error("Failed to initialize text recognizer: {0}")]
    InitializationError(String),

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Missing file in request")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScanError {
    /// Wrap a failed call into the vision or OCR collaborator
    pub fn primitive(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::PrimitiveFailure {
            operation,
            message: err.to_string(),
        }
    }

    /// Stable machine-readable code used in HTTP error bodies
    pub fn code(&self) -> &'static str {
        match self {
            ScanError::Format(_) => "FORMAT_ERROR",
            ScanError::NoDocumentDetected => "NO_DOCUMENT_DETECTED",
            ScanError::PrimitiveFailure { .. } => "PRIMITIVE_FAILURE",
            ScanError::Detection(DetectionError::Decode(_)) => "INVALID_IMAGE",
            ScanError::Detection(DetectionError::Detection(_)) => "DETECTION_FAILED",
            ScanError::DetectorUnavailable => "DETECTOR_UNAVAILABLE",
            ScanError::InitializationError(_) => "INIT_ERROR",
            ScanError::ImageTooLarge { .. } => "IMAGE_TOO_LARGE",
            ScanError::MissingFile => "MISSING_FILE",
            ScanError::InvalidRequest(_) => "INVALID_REQUEST",
            ScanError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ScanError::Format(_) | ScanError::NoDocumentDetected => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ScanError::ImageTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ScanError::MissingFile
            | ScanError::InvalidRequest(_)
            | ScanError::Detection(DetectionError::Decode(_)) => StatusCode::BAD_REQUEST,
            ScanError::DetectorUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ScanError::PrimitiveFailure { .. }
            | ScanError::Detection(DetectionError::Detection(_))
            | ScanError::InitializationError(_)
            | ScanError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ScanError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_maps_to_unprocessable() {
        let err = ScanError::from(FormatError::LineCount {
            expected: 3,
            found: 2,
        });
        assert_eq!(err.code(), "FORMAT_ERROR");
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_primitive_failure_message_names_operation() {
        let err = ScanError::primitive("canny", "empty image");
        assert_eq!(err.to_string(), "canny failed: empty image");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_detection_errors_split_by_cause() {
        let decode = ScanError::from(DetectionError::Decode("bad base64".to_string()));
        assert_eq!(decode.code(), "INVALID_IMAGE");
        assert_eq!(decode.status(), StatusCode::BAD_REQUEST);

        let failed = ScanError::from(DetectionError::Detection("model crashed".to_string()));
        assert_eq!(failed.code(), "DETECTION_FAILED");
        assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failed.to_string(), "Detection failed: model crashed");

        assert_eq!(
            ScanError::DetectorUnavailable.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_image_too_large_status() {
        let err = ScanError::ImageTooLarge { size: 10, max: 5 };
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.code(), "IMAGE_TOO_LARGE");
    }
}

use crate::error::ScanError;
use image::{DynamicImage, GrayImage};

/// Convert image to single-channel grayscale
pub fn apply(image: &DynamicImage) -> Result<GrayImage, ScanError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ScanError::primitive("grayscale", "image is empty"));
    }
    Ok(image.to_luma8())
}

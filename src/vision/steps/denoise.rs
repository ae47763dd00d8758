use crate::error::ScanError;
use image::GrayImage;
use imageproc::morphology::{grayscale_open, Mask};

/// Grayscale morphological opening with a disk of `radius`.
/// Bright specks smaller than the disk disappear; larger shapes keep their
/// outline. Radius 0 is a no-op.
pub fn open(image: &GrayImage, radius: u8) -> Result<GrayImage, ScanError> {
    if radius == 0 {
        return Ok(image.clone());
    }
    if image.width() == 0 || image.height() == 0 {
        return Err(ScanError::primitive("morphological open", "image is empty"));
    }
    Ok(grayscale_open(image, &Mask::disk(radius)))
}

use crate::error::ScanError;
use image::{imageops::FilterType, DynamicImage, GenericImageView};

/// Shrink an image to fit within the working bounds, keeping its aspect
/// ratio. Images already inside the bounds are returned untouched so that
/// kernel sizes downstream see comparable scales.
pub fn apply(image: DynamicImage, max_width: u32, max_height: u32) -> Result<DynamicImage, ScanError> {
    if max_width == 0 || max_height == 0 {
        return Err(ScanError::primitive(
            "resize",
            format!("invalid working bounds {}x{}", max_width, max_height),
        ));
    }

    let (width, height) = image.dimensions();
    if width <= max_width && height <= max_height {
        return Ok(image);
    }

    tracing::debug!(width, height, max_width, max_height, "Shrinking to working resolution");
    Ok(image.resize(max_width, max_height, FilterType::Triangle))
}

use crate::error::ScanError;
use image::GrayImage;
use imageproc::filter::gaussian_blur_f32;

/// Gaussian blur to suppress high-frequency noise before edge detection.
/// A non-positive sigma leaves the image unchanged.
pub fn apply(image: &GrayImage, sigma: f32) -> Result<GrayImage, ScanError> {
    if !sigma.is_finite() {
        return Err(ScanError::primitive("gaussian blur", "sigma must be finite"));
    }
    if sigma <= 0.0 {
        return Ok(image.clone());
    }
    Ok(gaussian_blur_f32(image, sigma))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_blur_spreads_single_pixel() {
        let mut img = GrayImage::from_pixel(11, 11, Luma([0]));
        img.put_pixel(5, 5, Luma([255]));

        let result = apply(&img, 1.5).unwrap();

        assert!(result.get_pixel(5, 5).0[0] < 255);
        assert!(result.get_pixel(6, 5).0[0] > 0);
    }

    #[test]
    fn test_zero_sigma_is_identity() {
        let img = GrayImage::from_fn(8, 8, |x, y| Luma([(x * 30 + y) as u8]));
        assert_eq!(apply(&img, 0.0).unwrap(), img);
    }

    #[test]
    fn test_nan_sigma_fails() {
        let img = GrayImage::new(4, 4);
        assert!(apply(&img, f32::NAN).is_err());
    }
}

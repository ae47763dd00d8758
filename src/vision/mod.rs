//! Image-processing primitives consumed by the document rectifier
//!
//! [`VisionPrimitives`] is the seam between the rectification pipeline and
//! the library doing the pixel work. [`ImageprocVision`] implements it with
//! the `image` and `imageproc` crates.

pub mod steps;

use crate::error::ScanError;
use image::{DynamicImage, GrayImage, ImageFormat};
use imageproc::point::Point;
use std::path::Path;

pub use steps::contours::Contour;

/// Black-box image operations with standard image-processing semantics
pub trait VisionPrimitives: Send + Sync {
    fn load(&self, path: &Path) -> Result<DynamicImage, ScanError>;

    fn save(&self, image: &DynamicImage, path: &Path) -> Result<(), ScanError>;

    /// Shrink to fit `max_width` x `max_height`, keeping the aspect ratio
    fn resize_within(
        &self,
        image: DynamicImage,
        max_width: u32,
        max_height: u32,
    ) -> Result<DynamicImage, ScanError>;

    fn grayscale(&self, image: &DynamicImage) -> Result<GrayImage, ScanError>;

    /// Grayscale opening with a disk of `radius`, 0 to skip
    fn morphological_open(&self, image: &GrayImage, radius: u8) -> Result<GrayImage, ScanError>;

    fn gaussian_blur(&self, image: &GrayImage, sigma: f32) -> Result<GrayImage, ScanError>;

    fn canny(&self, image: &GrayImage, low: f32, high: f32) -> Result<GrayImage, ScanError>;

    fn dilate(&self, image: &GrayImage, radius: u8) -> Result<GrayImage, ScanError>;

    /// Flat list of contours with collinear points removed
    fn find_contours(&self, edges: &GrayImage) -> Result<Vec<Contour>, ScanError>;

    /// Enclosed area, independent of winding
    fn contour_area(&self, contour: &[Point<i32>]) -> f64;

    fn arc_length(&self, contour: &[Point<i32>], closed: bool) -> f64;

    /// Polygon approximation of a closed contour with tolerance `epsilon`
    fn approx_polygon(&self, contour: &[Point<i32>], epsilon: f64) -> Contour;

    fn warp_perspective(
        &self,
        image: &DynamicImage,
        from: [(f32, f32); 4],
        to: [(f32, f32); 4],
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, ScanError>;
}

/// Decode an image file, sniffing the format from its content so uploads
/// with a generic extension still load
pub fn load_image(path: &Path) -> Result<DynamicImage, ScanError> {
    image::ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| ScanError::primitive("load image", e))?
        .decode()
        .map_err(|e| ScanError::primitive("load image", e))
}

/// `image` + `imageproc` backed primitives
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageprocVision;

impl VisionPrimitives for ImageprocVision {
    fn load(&self, path: &Path) -> Result<DynamicImage, ScanError> {
        load_image(path)
    }

    fn save(&self, image: &DynamicImage, path: &Path) -> Result<(), ScanError> {
        image
            .save_with_format(path, ImageFormat::Png)
            .map_err(|e| ScanError::primitive("save image", e))
    }

    fn resize_within(
        &self,
        image: DynamicImage,
        max_width: u32,
        max_height: u32,
    ) -> Result<DynamicImage, ScanError> {
        steps::resize::apply(image, max_width, max_height)
    }

    fn grayscale(&self, image: &DynamicImage) -> Result<GrayImage, ScanError> {
        steps::grayscale::apply(image)
    }

    fn morphological_open(&self, image: &GrayImage, radius: u8) -> Result<GrayImage, ScanError> {
        steps::denoise::open(image, radius)
    }

    fn gaussian_blur(&self, image: &GrayImage, sigma: f32) -> Result<GrayImage, ScanError> {
        steps::blur::apply(image, sigma)
    }

    fn canny(&self, image: &GrayImage, low: f32, high: f32) -> Result<GrayImage, ScanError> {
        steps::edges::detect(image, low, high)
    }

    fn dilate(&self, image: &GrayImage, radius: u8) -> Result<GrayImage, ScanError> {
        steps::edges::close_gaps(image, radius)
    }

    fn find_contours(&self, edges: &GrayImage) -> Result<Vec<Contour>, ScanError> {
        Ok(steps::contours::find(edges))
    }

    fn contour_area(&self, contour: &[Point<i32>]) -> f64 {
        imageproc::geometry::contour_area(contour).abs()
    }

    fn arc_length(&self, contour: &[Point<i32>], closed: bool) -> f64 {
        imageproc::geometry::arc_length(contour, closed)
    }

    fn approx_polygon(&self, contour: &[Point<i32>], epsilon: f64) -> Contour {
        steps::contours::approximate_closed(contour, epsilon)
    }

    fn warp_perspective(
        &self,
        image: &DynamicImage,
        from: [(f32, f32); 4],
        to: [(f32, f32); 4],
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, ScanError> {
        steps::warp::apply(image, from, to, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(side: i32) -> Vec<Point<i32>> {
        vec![
            Point::new(0, 0),
            Point::new(side, 0),
            Point::new(side, side),
            Point::new(0, side),
        ]
    }

    #[test]
    fn test_area_ignores_winding() {
        let vision = ImageprocVision;
        let clockwise = square(10);
        let mut counter = clockwise.clone();
        counter.reverse();

        assert_eq!(vision.contour_area(&clockwise), 100.0);
        assert_eq!(vision.contour_area(&counter), 100.0);
    }

    #[test]
    fn test_arc_length_closed_and_open() {
        let vision = ImageprocVision;
        assert_eq!(vision.arc_length(&square(10), true), 40.0);
        assert_eq!(vision.arc_length(&square(10), false), 30.0);
    }

    #[test]
    fn test_save_and_load_round_trip_dimensions() {
        let vision = ImageprocVision;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let image = DynamicImage::ImageRgb8(image::RgbImage::new(12, 7));

        vision.save(&image, &path).unwrap();
        let loaded = vision.load(&path).unwrap();

        assert_eq!((loaded.width(), loaded.height()), (12, 7));
    }

    #[test]
    fn test_load_sniffs_format_ignoring_extension() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("upload.png");
        let generic = dir.path().join("upload.tmp");
        DynamicImage::ImageLuma8(GrayImage::new(4, 3)).save(&png).unwrap();
        std::fs::rename(&png, &generic).unwrap();

        let loaded = load_image(&generic).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (4, 3));
    }

    #[test]
    fn test_load_missing_file_is_primitive_failure() {
        let vision = ImageprocVision;
        let err = vision.load(Path::new("/nonexistent/photo.jpg")).unwrap_err();
        assert!(matches!(
            err,
            ScanError::PrimitiveFailure {
                operation: "load image",
                ..
            }
        ));
    }
}

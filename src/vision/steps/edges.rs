use crate::error::ScanError;
use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::morphology::dilate;

/// Two-threshold hysteresis (Canny) edge detection. Edge pixels are 255.
pub fn detect(image: &GrayImage, low: f32, high: f32) -> Result<GrayImage, ScanError> {
    if !(low >= 0.0 && low <= high) {
        return Err(ScanError::primitive(
            "canny",
            format!("thresholds must satisfy 0 <= low <= high, got {} / {}", low, high),
        ));
    }
    Ok(canny(image, low, high))
}

/// Grow edge pixels by `radius` (chessboard distance) to close small gaps
/// left by non-maximum suppression at corners. Radius 0 is a no-op.
pub fn close_gaps(edges: &GrayImage, radius: u8) -> Result<GrayImage, ScanError> {
    if radius == 0 {
        return Ok(edges.clone());
    }
    Ok(dilate(edges, Norm::LInf, radius))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_canny_finds_step_edge() {
        let img = GrayImage::from_fn(40, 20, |x, _| if x < 20 { Luma([0]) } else { Luma([255]) });

        let edges = detect(&img, 30.0, 90.0).unwrap();

        let edge_columns: Vec<u32> = (0..40)
            .filter(|&x| edges.get_pixel(x, 10).0[0] == 255)
            .collect();
        assert!(!edge_columns.is_empty());
        assert!(edge_columns.iter().all(|&x| (18..=21).contains(&x)));
    }

    #[test]
    fn test_canny_flat_image_has_no_edges() {
        let img = GrayImage::from_pixel(20, 20, Luma([128]));
        let edges = detect(&img, 30.0, 90.0).unwrap();
        assert!(edges.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_canny_rejects_inverted_thresholds() {
        let img = GrayImage::new(5, 5);
        assert!(detect(&img, 90.0, 30.0).is_err());
    }

    #[test]
    fn test_close_gaps_bridges_one_pixel_gap() {
        let mut edges = GrayImage::new(20, 5);
        for x in (2..9).chain(10..17) {
            edges.put_pixel(x, 2, Luma([255]));
        }

        let closed = close_gaps(&edges, 1).unwrap();

        assert_eq!(closed.get_pixel(9, 2).0[0], 255);
        assert_eq!(closed.get_pixel(9, 1).0[0], 255);
        assert_eq!(closed.get_pixel(9, 4).0[0], 0);
    }
}

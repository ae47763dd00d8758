use crate::error::ScanError;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};

/// Map the quadrilateral `from` onto `to` and sample the result into a
/// `width` x `height` image. Pixels outside the source become white.
pub fn apply(
    image: &DynamicImage,
    from: [(f32, f32); 4],
    to: [(f32, f32); 4],
    width: u32,
    height: u32,
) -> Result<DynamicImage, ScanError> {
    if width == 0 || height == 0 {
        return Err(ScanError::primitive(
            "perspective warp",
            format!("invalid output size {}x{}", width, height),
        ));
    }

    let projection = Projection::from_control_points(from, to).ok_or_else(|| {
        ScanError::primitive("perspective transform", "control points are degenerate")
    })?;

    let source = image.to_rgb8();
    let mut output = RgbImage::new(width, height);
    warp_into(
        &source,
        &projection,
        Interpolation::Bilinear,
        Rgb([255, 255, 255]),
        &mut output,
    );

    Ok(DynamicImage::ImageRgb8(output))
}

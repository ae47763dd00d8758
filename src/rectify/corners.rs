use crate::vision::{Contour, VisionPrimitives};
use imageproc::point::Point;

/// Four corners as `(x, y)`, ordered top-left, top-right, bottom-right,
/// bottom-left once passed through [`order_corners`]
pub type Quad = [(f32, f32); 4];

/// The best four-vertex polygon found among a set of contours
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub corners: [Point<i32>; 4],
    pub area: f64,
}

/// Scan `contours` for the largest one simplifying to exactly four vertices.
///
/// Contours with an area below `min_area` are noise. The polygon tolerance is
/// `approx_epsilon` times the contour perimeter. A later contour replaces the
/// current best only when its area is strictly larger.
pub fn largest_quadrilateral<V>(
    vision: &V,
    contours: &[Contour],
    min_area: f64,
    approx_epsilon: f64,
) -> Option<Candidate>
where
    V: VisionPrimitives + ?Sized,
{
    let mut best: Option<Candidate> = None;

    for contour in contours {
        let area = vision.contour_area(contour);
        if area < min_area {
            continue;
        }
        if best.as_ref().is_some_and(|b| area <= b.area) {
            continue;
        }

        let perimeter = vision.arc_length(contour, true);
        let polygon = vision.approx_polygon(contour, approx_epsilon * perimeter);
        if let [a, b, c, d] = polygon[..] {
            tracing::trace!(area, perimeter, "New largest quadrilateral");
            best = Some(Candidate {
                corners: [a, b, c, d],
                area,
            });
        }
    }

    best
}

/// Order four points as top-left, top-right, bottom-right, bottom-left.
///
/// Points are sorted by angle around their centroid (clockwise on screen,
/// since y grows downwards) and the cycle starts at the point with the
/// smallest `x + y`, ties going to the smaller `y`. The result depends only
/// on the set of points, so re-ordering an ordered quad is a no-op.
pub fn order_corners(points: Quad) -> Quad {
    let cx = points.iter().map(|p| p.0).sum::<f32>() / 4.0;
    let cy = points.iter().map(|p| p.1).sum::<f32>() / 4.0;

    let mut sorted = points;
    sorted.sort_by(|a, b| {
        let angle_a = (a.1 - cy).atan2(a.0 - cx);
        let angle_b = (b.1 - cy).atan2(b.0 - cx);
        angle_a
            .total_cmp(&angle_b)
            .then_with(|| a.0.total_cmp(&b.0))
            .then_with(|| a.1.total_cmp(&b.1))
    });

    let start = (0..4)
        .min_by(|&i, &j| {
            let (a, b) = (sorted[i], sorted[j]);
            (a.0 + a.1)
                .total_cmp(&(b.0 + b.1))
                .then_with(|| a.1.total_cmp(&b.1))
        })
        .unwrap_or(0);

    sorted.rotate_left(start);
    sorted
}

/// Output size for an ordered quad: the longer of each pair of opposite
/// edges, rounded to the nearest pixel and at least 1
pub fn output_dimensions(quad: &Quad) -> (u32, u32) {
    let [tl, tr, br, bl] = *quad;

    let width = distance(tl, tr).max(distance(bl, br));
    let height = distance(tl, bl).max(distance(tr, br));

    (to_pixels(width), to_pixels(height))
}

/// Destination corners for a `width` x `height` output, in quad order
pub fn destination(width: u32, height: u32) -> Quad {
    let right = width.saturating_sub(1) as f32;
    let bottom = height.saturating_sub(1) as f32;
    [(0.0, 0.0), (right, 0.0), (right, bottom), (0.0, bottom)]
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

fn to_pixels(length: f32) -> u32 {
    length.round().max(1.0) as u32
}

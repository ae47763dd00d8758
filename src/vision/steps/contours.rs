use imageproc::contours::find_contours;
use imageproc::geometry::approximate_polygon_dp;
use imageproc::point::Point;

use image::GrayImage;

/// A closed sequence of pixel positions
pub type Contour = Vec<Point<i32>>;

/// Every border in a binary image as a flat list, without hierarchy.
/// Runs of collinear points are reduced to their end points.
pub fn find(edges: &GrayImage) -> Vec<Contour> {
    find_contours::<i32>(edges)
        .into_iter()
        .map(|contour| compress_collinear(&contour.points))
        .filter(|points| !points.is_empty())
        .collect()
}

/// Drop points lying in the middle of a straight run
pub fn compress_collinear(points: &[Point<i32>]) -> Contour {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let cur = points[i];
            let next = points[(i + 1) % n];
            (cur.x - prev.x, cur.y - prev.y) != (next.x - cur.x, next.y - cur.y)
        })
        .map(|i| points[i])
        .collect()
}

/// Douglas-Peucker approximation of a closed contour.
///
/// The curve is split at the point farthest from its start and each half is
/// simplified as an open curve. Vertices lying within `epsilon` of the chord
/// between their neighbours are then dropped so the start point only
/// survives when it is a real corner.
pub fn approximate_closed(contour: &[Point<i32>], epsilon: f64) -> Contour {
    if contour.len() < 3 || epsilon <= 0.0 {
        return contour.to_vec();
    }

    let start = contour[0];
    let far = contour
        .iter()
        .enumerate()
        .max_by_key(|(_, p)| squared_distance(start, **p))
        .map(|(i, _)| i)
        .unwrap_or(0);
    if far == 0 {
        return vec![start];
    }

    let mut polygon = approximate_polygon_dp(&contour[..=far], epsilon, false);

    let mut back: Contour = contour[far..].to_vec();
    back.push(start);
    let back = approximate_polygon_dp(&back, epsilon, false);
    if back.len() > 2 {
        polygon.extend_from_slice(&back[1..back.len() - 1]);
    }

    drop_flat_vertices(polygon, epsilon)
}

fn drop_flat_vertices(mut polygon: Contour, epsilon: f64) -> Contour {
    let mut i = 0;
    while polygon.len() > 3 && i < polygon.len() {
        let n = polygon.len();
        let prev = polygon[(i + n - 1) % n];
        let next = polygon[(i + 1) % n];
        if distance_to_line(polygon[i], prev, next) <= epsilon {
            polygon.remove(i);
            i = 0;
        } else {
            i += 1;
        }
    }
    polygon
}

fn squared_distance(a: Point<i32>, b: Point<i32>) -> i64 {
    let dx = (a.x - b.x) as i64;
    let dy = (a.y - b.y) as i64;
    dx * dx + dy * dy
}

fn distance_to_line(p: Point<i32>, a: Point<i32>, b: Point<i32>) -> f64 {
    let (dx, dy) = ((b.x - a.x) as f64, (b.y - a.y) as f64);
    let length = dx.hypot(dy);
    if length == 0.0 {
        return ((p.x - a.x) as f64).hypot((p.y - a.y) as f64);
    }
    (dy * (p.x - a.x) as f64 - dx * (p.y - a.y) as f64).abs() / length
}

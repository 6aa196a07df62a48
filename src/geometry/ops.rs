//! Low-level primitives on points, segments and rings.

use super::types::{Point, Polygon};
use super::DUPLICATE_TOLERANCE;
use geo::{Centroid, ConvexHull, Coord, LineString};

const PARAM_EPSILON: f64 = 1e-9;

/// Intersection of segments `p1-p2` and `p3-p4`.
///
/// Returns the intersection point and its parameters along both segments.
/// Collinear overlapping segments report the first shared point of the
/// second segment that lies on the first.
pub fn segment_intersection(p1: Point, p2: Point, p3: Point, p4: Point) -> Option<(Point, f64, f64)> {
    let d1 = p2 - p1;
    let d2 = p4 - p3;
    let denom = d1.cross(&d2);
    let w = p3 - p1;

    if denom.abs() < PARAM_EPSILON * d1.norm().max(1.0) * d2.norm().max(1.0) {
        // Parallel: only collinear overlaps intersect.
        if w.cross(&d1).abs() > PARAM_EPSILON * d1.norm().max(1.0) {
            return None;
        }
        let len_sq = d1.dot(&d1);
        if len_sq <= f64::EPSILON {
            return None;
        }
        for (candidate, u) in [(p3, 0.0), (p4, 1.0)] {
            let t = (candidate - p1).dot(&d1) / len_sq;
            if (-PARAM_EPSILON..=1.0 + PARAM_EPSILON).contains(&t) {
                return Some((candidate, t, u));
            }
        }
        let t3 = (p3 - p1).dot(&d1) / len_sq;
        let t4 = (p4 - p1).dot(&d1) / len_sq;
        if t3.min(t4) < 0.0 && t3.max(t4) > 1.0 {
            let u = if (t4 - t3).abs() > f64::EPSILON { -t3 / (t4 - t3) } else { 0.0 };
            return Some((p1, 0.0, u));
        }
        return None;
    }

    let t = w.cross(&d2) / denom;
    let u = w.cross(&d1) / denom;
    let range = -PARAM_EPSILON..=1.0 + PARAM_EPSILON;
    if range.contains(&t) && range.contains(&u) {
        Some((p1 + d1 * t, t, u))
    } else {
        None
    }
}

/// Intersection of the infinite lines through `a0-a1` and `b0-b1`.
pub(crate) fn line_intersection(a0: Point, a1: Point, b0: Point, b1: Point) -> Option<Point> {
    let da = a1 - a0;
    let db = b1 - b0;
    let denom = da.cross(&db);
    if denom.abs() < 1e-12 {
        return None;
    }
    let t = (b0 - a0).cross(&db) / denom;
    Some(a0 + da * t)
}

/// Even-odd point-in-polygon test. Points on the boundary may go either way;
/// combine with [`distance_to_ring`] when the boundary matters.
pub fn contains_point(polygon: &Polygon, p: Point) -> bool {
    let pts = polygon.points();
    let n = pts.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (pts[i], pts[j]);
        if (pi.y > p.y) != (pj.y > p.y) {
            let x_cross = pj.x + (p.y - pj.y) / (pi.y - pj.y) * (pi.x - pj.x);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Closest point to `p` on segment `a-b`.
pub(crate) fn nearest_on_segment(a: Point, b: Point, p: Point) -> Point {
    let d = b - a;
    let len_sq = d.dot(&d);
    if len_sq <= f64::EPSILON {
        return a;
    }
    let t = ((p - a).dot(&d) / len_sq).clamp(0.0, 1.0);
    a + d * t
}

/// Closest point to `p` on the polygon's boundary.
pub fn nearest_point_on_ring(polygon: &Polygon, p: Point) -> Option<Point> {
    polygon
        .edges()
        .map(|(a, b)| nearest_on_segment(a, b, p))
        .min_by(|x, y| x.distance(&p).total_cmp(&y.distance(&p)))
}

/// Distance from `p` to the polygon's boundary (infinite for an empty ring).
pub fn distance_to_ring(polygon: &Polygon, p: Point) -> f64 {
    nearest_point_on_ring(polygon, p).map_or(f64::INFINITY, |q| q.distance(&p))
}

/// Whether `p` lies inside the polygon or within `tolerance` of its boundary.
pub fn covers_point(polygon: &Polygon, p: Point, tolerance: f64) -> bool {
    contains_point(polygon, p) || distance_to_ring(polygon, p) <= tolerance
}

/// Whether every vertex of `inner` is covered by `outer`.
pub fn covers(outer: &Polygon, inner: &Polygon, tolerance: f64) -> bool {
    !inner.is_empty() && inner.points().iter().all(|&p| covers_point(outer, p, tolerance))
}

/// Cast a ray from `origin` along `direction` and return the smallest
/// positive distance at which it hits the ring.
///
/// `direction` must be a unit vector; hits closer than `min_t` are ignored.
pub fn ray_cast(polygon: &Polygon, origin: Point, direction: Point, min_t: f64) -> Option<f64> {
    let mut best: Option<f64> = None;
    for (a, b) in polygon.edges() {
        let e = b - a;
        let denom = direction.cross(&e);
        if denom.abs() < 1e-12 {
            continue;
        }
        let w = a - origin;
        let t = w.cross(&e) / denom;
        let u = w.cross(&direction) / denom;
        if t > min_t && (-PARAM_EPSILON..=1.0 + PARAM_EPSILON).contains(&u) {
            best = Some(best.map_or(t, |b: f64| b.min(t)));
        }
    }
    best
}

/// Remove points closer than `tolerance` to their predecessor, including
/// the wrap-around between the last and first point.
pub fn remove_repeated_points(polygon: &Polygon, tolerance: f64) -> Polygon {
    let tol = tolerance.max(DUPLICATE_TOLERANCE);
    let mut out: Vec<Point> = Vec::with_capacity(polygon.len());
    for p in polygon.points() {
        if out.last().map_or(true, |last| last.distance(p) > tol) {
            out.push(*p);
        }
    }
    while out.len() > 1 {
        match (out.first(), out.last()) {
            (Some(first), Some(last)) if first.distance(last) <= tol => {
                out.pop();
            }
            _ => break,
        }
    }
    Polygon::new(out)
}

/// Convex hull of a point set in canonical orientation.
pub fn convex_hull(points: &[Point]) -> Polygon {
    if points.len() < 3 {
        return Polygon::new(points.to_vec());
    }
    let line: LineString<f64> = points.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
    let hull = line.convex_hull();
    Polygon::new(hull.exterior().coords().map(|c| Point::new(c.x, c.y)).collect()).oriented()
}

/// Area-weighted centroid, falling back to the vertex mean for rings
/// without area.
pub fn centroid(polygon: &Polygon) -> Option<Point> {
    if polygon.len() >= 3 && polygon.area() > super::AREA_EPSILON {
        let ring: LineString<f64> = polygon.points().iter().map(|p| Coord { x: p.x, y: p.y }).collect();
        if let Some(c) = geo::Polygon::new(ring, vec![]).centroid() {
            return Some(Point::new(c.x(), c.y()));
        }
    }
    polygon.vertex_mean()
}

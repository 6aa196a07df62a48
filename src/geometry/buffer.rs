//! Polygon offsetting with self-intersection trimming.
//!
//! # Algorithm
//!
//! 1. Displace every edge along its outward normal by `distance`.
//! 2. Rebuild the ring by intersecting consecutive displaced edges (miter),
//!    falling back to a bevel when the miter is too long and to a flat cap
//!    for near-reversals.
//! 3. Walk the raw ring, split it at self-intersections and keep the loop
//!    whose winding matches the input.

use super::ops::{line_intersection, segment_intersection};
use super::types::{signed_area, Point, Polygon};
use super::{AREA_EPSILON, DUPLICATE_TOLERANCE};
use crate::error::GeometryError;

/// When `cos(angle between consecutive edges) < this`, use a flat cap
/// instead of a miter join.
const FLAT_CAP_COS: f64 = -0.98;

/// Maximum miter distance as a multiple of `|distance|`.
const MITER_LIMIT: f64 = 4.0;

/// Collinearity threshold for [`clean_ring`].
const COLLINEAR_TOLERANCE: f64 = 1e-9;

/// Offset `polygon` by `distance` (positive grows, negative shrinks).
///
/// `buffer(p, 0.0)` only resolves self-intersections. The result keeps the
/// input's orientation; a zero-area input (e.g. a bowtie) yields the
/// canonical orientation.
///
/// # Errors
///
/// - [`GeometryError::InvalidInput`] for a non-finite distance or coordinate.
/// - [`GeometryError::Degenerate`] when fewer than three distinct points
///   remain, no positive-area loop survives, or an inward offset passed the
///   medial axis.
pub fn buffer(polygon: &Polygon, distance: f64) -> Result<Polygon, GeometryError> {
    if !distance.is_finite() {
        return Err(GeometryError::InvalidInput(format!(
            "buffer distance must be finite, got {}",
            distance
        )));
    }
    if polygon.points().iter().any(|p| !p.is_finite()) {
        return Err(GeometryError::InvalidInput(
            "polygon has non-finite coordinates".to_string(),
        ));
    }

    let points = clean_ring(polygon.points());
    if points.len() < 3 {
        return Err(GeometryError::Degenerate(format!(
            "polygon has {} distinct points",
            points.len()
        )));
    }

    let original_area = signed_area(&points);
    let winding_sign = if original_area < -AREA_EPSILON { -1.0 } else { 1.0 };

    let raw = if distance == 0.0 {
        points
    } else {
        if original_area.abs() <= AREA_EPSILON {
            return Err(GeometryError::Degenerate(
                "cannot offset a zero-area ring".to_string(),
            ));
        }
        offset_ring(&points, distance, winding_sign)?
    };

    let trimmed = trim_closed_loops(&raw, winding_sign);
    if trimmed.len() < 3 {
        return Err(GeometryError::Degenerate(
            "offset collapsed to fewer than 3 points".to_string(),
        ));
    }

    let result_area = signed_area(&trimmed);
    if result_area * winding_sign <= AREA_EPSILON {
        return Err(GeometryError::Degenerate(
            "offset left no positive-area polygon".to_string(),
        ));
    }

    // Inward offsets must shrink.
    if distance < 0.0 && result_area.abs() > original_area.abs() + AREA_EPSILON {
        return Err(GeometryError::Degenerate(
            "offset collapsed (passed through the medial axis)".to_string(),
        ));
    }

    log::debug!(
        "buffer by {}: {} -> {} points, area {:.2} -> {:.2}",
        distance,
        polygon.len(),
        trimmed.len(),
        original_area.abs(),
        result_area.abs()
    );

    Ok(Polygon::new(trimmed))
}

/// Outward normal of an edge direction for a ring of the given winding.
fn outward_normal(dir: Point, winding_sign: f64) -> Point {
    Point::new(dir.y, -dir.x) * winding_sign
}

/// Build the raw (untrimmed) offset ring.
fn offset_ring(points: &[Point], distance: f64, winding_sign: f64) -> Result<Vec<Point>, GeometryError> {
    let n = points.len();
    let mut segments: Vec<(Point, Point)> = Vec::with_capacity(n);
    let mut directions: Vec<Point> = Vec::with_capacity(n);

    for i in 0..n {
        let j = (i + 1) % n;
        let dir = (points[j] - points[i]).normalized().ok_or_else(|| {
            GeometryError::Degenerate("zero-length edge".to_string())
        })?;
        let offset = outward_normal(dir, winding_sign) * distance;
        segments.push((points[i] + offset, points[j] + offset));
        directions.push(dir);
    }

    let mut raw = Vec::with_capacity(n * 2);
    for i in 0..n {
        let prev = if i == 0 { n - 1 } else { i - 1 };
        push_corner(
            &mut raw,
            &segments[prev],
            &segments[i],
            directions[prev],
            directions[i],
            points[i],
            distance,
        );
    }
    Ok(raw)
}

/// Push the corner point(s) joining two displaced edges.
fn push_corner(
    raw: &mut Vec<Point>,
    seg_prev: &(Point, Point),
    seg_next: &(Point, Point),
    dir_prev: Point,
    dir_next: Point,
    original_corner: Point,
    distance: f64,
) {
    if dir_prev.dot(&dir_next) < FLAT_CAP_COS {
        raw.push(seg_prev.1);
        raw.push(seg_next.0);
        return;
    }

    match line_intersection(seg_prev.0, seg_prev.1, seg_next.0, seg_next.1) {
        Some(miter) if miter.distance(&original_corner) <= MITER_LIMIT * distance.abs() => {
            raw.push(miter);
        }
        Some(_) => {
            // Bevel.
            raw.push(seg_prev.1);
            raw.push(seg_next.0);
        }
        None => {
            // Parallel edges continue straight through the corner.
            raw.push(seg_next.0);
        }
    }
}

/// Remove consecutive duplicates (with wrap-around) and collinear vertices.
fn clean_ring(points: &[Point]) -> Vec<Point> {
    let mut deduped: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        if deduped
            .last()
            .map_or(true, |last| last.distance(&p) > DUPLICATE_TOLERANCE)
        {
            deduped.push(p);
        }
    }
    while deduped.len() > 1 {
        match (deduped.first(), deduped.last()) {
            (Some(first), Some(last)) if first.distance(last) <= DUPLICATE_TOLERANCE => {
                deduped.pop();
            }
            _ => break,
        }
    }
    if deduped.len() < 3 {
        return deduped;
    }

    let n = deduped.len();
    let cleaned: Vec<Point> = (0..n)
        .filter(|&i| {
            let prev = deduped[(i + n - 1) % n];
            let next = deduped[(i + 1) % n];
            let cross = (deduped[i] - prev).cross(&(next - deduped[i]));
            cross.abs() >= COLLINEAR_TOLERANCE
        })
        .map(|i| deduped[i])
        .collect();

    if cleaned.len() < 3 {
        deduped
    } else {
        cleaned
    }
}

fn are_adjacent(i: usize, j: usize, n: usize) -> bool {
    let diff = i.abs_diff(j);
    diff == 1 || diff == n - 1
}

/// First genuine crossing between non-adjacent edges.
///
/// Endpoint-to-endpoint touches are skipped; they occur where a ring
/// revisits a vertex and do not separate loops.
fn find_crossing(points: &[Point]) -> Option<(usize, usize, Point)> {
    let n = points.len();
    if n < 4 {
        return None;
    }
    let eps = 1e-7;
    for i in 0..n {
        for j in (i + 2)..n {
            if are_adjacent(i, j, n) {
                continue;
            }
            if let Some((pt, t, u)) = segment_intersection(
                points[i],
                points[(i + 1) % n],
                points[j],
                points[(j + 1) % n],
            ) {
                let t_at_end = t < eps || t > 1.0 - eps;
                let u_at_end = u < eps || u > 1.0 - eps;
                if t_at_end && u_at_end {
                    continue;
                }
                return Some((i, j, pt));
            }
        }
    }
    None
}

/// Split a ring at the crossing of edges `i < j` into its two loops.
fn split_at_crossing(points: &[Point], i: usize, j: usize, at: Point) -> (Vec<Point>, Vec<Point>) {
    let n = points.len();

    let mut a = Vec::with_capacity(j - i + 1);
    a.push(at);
    a.extend_from_slice(&points[(i + 1)..=j]);

    let mut b = Vec::with_capacity(n - (j - i) + 1);
    b.push(at);
    let mut idx = (j + 1) % n;
    loop {
        b.push(points[idx]);
        if idx == i {
            break;
        }
        idx = (idx + 1) % n;
    }

    (a, b)
}

/// Recursively remove self-intersection loops, keeping at each split the
/// loop whose winding matches `winding_sign` (or the larger one when both
/// or neither match). Each split strictly reduces the vertex count.
fn trim_closed_loops(points: &[Point], winding_sign: f64) -> Vec<Point> {
    let pts = clean_ring(points);
    if pts.len() < 4 {
        return pts;
    }
    match find_crossing(&pts) {
        None => pts,
        Some((i, j, at)) => {
            let (a, b) = split_at_crossing(&pts, i, j, at);
            let trimmed_a = trim_closed_loops(&a, winding_sign);
            let trimmed_b = trim_closed_loops(&b, winding_sign);
            let area_a = signed_area(&trimmed_a);
            let area_b = signed_area(&trimmed_b);
            let a_matches = area_a * winding_sign > 0.0;
            let b_matches = area_b * winding_sign > 0.0;
            match (a_matches, b_matches) {
                (true, false) => trimmed_a,
                (false, true) => trimmed_b,
                _ => {
                    if area_a.abs() >= area_b.abs() {
                        trimmed_a
                    } else {
                        trimmed_b
                    }
                }
            }
        }
    }
}

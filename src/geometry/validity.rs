//! Polygon validity checks and vertex simplification.

use super::ops::{remove_repeated_points, segment_intersection};
use super::types::{signed_area, Orientation, Point, Polygon};
use super::{AREA_EPSILON, DUPLICATE_TOLERANCE};
use serde::{Deserialize, Serialize};

/// One violated polygon invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PolygonIssue {
    /// A coordinate is NaN or infinite.
    NonFinite,
    /// Fewer than three distinct points.
    TooFewPoints { distinct: usize },
    /// Two non-adjacent edges cross or touch.
    SelfIntersection { at: Point },
    /// Enclosed area is (numerically) zero.
    ZeroArea,
    /// Negative signed area.
    ReversedOrientation,
}

/// Result of [`validate`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidityReport {
    pub issues: Vec<PolygonIssue>,
}

impl ValidityReport {
    /// No invariant is violated.
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// Valid up to orientation.
    pub fn is_simple(&self) -> bool {
        self.issues
            .iter()
            .all(|i| matches!(i, PolygonIssue::ReversedOrientation))
    }

    pub fn has_non_finite(&self) -> bool {
        self.issues.contains(&PolygonIssue::NonFinite)
    }

    pub fn has_too_few_points(&self) -> bool {
        self.issues
            .iter()
            .any(|i| matches!(i, PolygonIssue::TooFewPoints { .. }))
    }

    /// First reported self-intersection point.
    pub fn self_intersection(&self) -> Option<Point> {
        self.issues.iter().find_map(|i| match i {
            PolygonIssue::SelfIntersection { at } => Some(*at),
            _ => None,
        })
    }

    pub fn has_zero_area(&self) -> bool {
        self.issues.contains(&PolygonIssue::ZeroArea)
    }

    pub fn is_reversed(&self) -> bool {
        self.issues.contains(&PolygonIssue::ReversedOrientation)
    }
}

/// Check every polygon invariant and report the violated ones.
pub fn validate(polygon: &Polygon) -> ValidityReport {
    let mut issues = Vec::new();

    if polygon.points().iter().any(|p| !p.is_finite()) {
        issues.push(PolygonIssue::NonFinite);
        return ValidityReport { issues };
    }

    let distinct = polygon.distinct_point_count();
    if distinct < 3 {
        issues.push(PolygonIssue::TooFewPoints { distinct });
        return ValidityReport { issues };
    }

    let ring = remove_repeated_points(polygon, DUPLICATE_TOLERANCE);
    if let Some((_, _, at)) = find_self_intersection(ring.points()) {
        issues.push(PolygonIssue::SelfIntersection { at });
    }

    match ring.orientation() {
        Orientation::Degenerate => issues.push(PolygonIssue::ZeroArea),
        Orientation::CounterClockwise => issues.push(PolygonIssue::ReversedOrientation),
        Orientation::Clockwise => {}
    }

    ValidityReport { issues }
}

/// Whether the polygon satisfies every invariant.
pub fn is_valid(polygon: &Polygon) -> bool {
    validate(polygon).is_valid()
}

/// Whether the polygon is simple with positive area, in either orientation.
pub fn is_simple(polygon: &Polygon) -> bool {
    validate(polygon).is_simple()
}

/// Find the first pair of ring edges `(i, j)` that intersect although they
/// are not neighbours, or that fold back onto each other when they are.
pub fn find_self_intersection(points: &[Point]) -> Option<(usize, usize, Point)> {
    let n = points.len();
    if n < 3 {
        return None;
    }
    for i in 0..n {
        let (a0, a1) = (points[i], points[(i + 1) % n]);

        // Spike: the next edge runs straight back along this one.
        let next = points[(i + 2) % n];
        let d1 = a1 - a0;
        let d2 = next - a1;
        if d1.cross(&d2).abs() <= 1e-12 * d1.norm().max(1.0) * d2.norm().max(1.0) && d1.dot(&d2) < 0.0 {
            return Some((i, (i + 1) % n, a1));
        }

        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let (b0, b1) = (points[j], points[(j + 1) % n]);
            if let Some((at, _, _)) = segment_intersection(a0, a1, b0, b1) {
                return Some((i, j, at));
            }
        }
    }
    None
}

/// Remove duplicate and collinear vertices.
///
/// Vertices are dropped smallest-triangle first while the accumulated area
/// change stays within `epsilon`; the ring never drops below three points.
pub fn simplify(polygon: &Polygon, epsilon: f64) -> Polygon {
    let mut pts = remove_repeated_points(polygon, DUPLICATE_TOLERANCE).into_points();
    let budget = epsilon.max(0.0);
    let mut spent = 0.0;

    while pts.len() > 3 {
        let n = pts.len();
        let candidate = (0..n)
            .map(|i| {
                let tri = [pts[(i + n - 1) % n], pts[i], pts[(i + 1) % n]];
                (i, signed_area(&tri).abs())
            })
            .min_by(|a, b| a.1.total_cmp(&b.1));

        match candidate {
            Some((i, area)) if area <= AREA_EPSILON || spent + area <= budget => {
                spent += area;
                pts.remove(i);
            }
            _ => break,
        }
    }

    Polygon::new(pts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bowtie() -> Polygon {
        Polygon::from_coords(&[(0.0, 0.0), (10.0, 10.0), (10.0, 0.0), (0.0, 10.0)])
    }

    #[test]
    fn test_valid_rectangle() {
        let report = validate(&Polygon::rectangle(0.0, 0.0, 10.0, 5.0));
        assert!(report.is_valid());
        assert!(is_valid(&Polygon::rectangle(0.0, 0.0, 10.0, 5.0)));
    }

    #[test]
    fn test_reversed_is_simple_but_not_valid() {
        let poly = Polygon::rectangle(0.0, 0.0, 10.0, 5.0).reversed();
        let report = validate(&poly);
        assert!(report.is_reversed());
        assert!(report.is_simple());
        assert!(!report.is_valid());
    }

    #[test]
    fn test_bowtie_self_intersection() {
        let report = validate(&bowtie());
        let at = report.self_intersection().expect("bowtie crosses itself");
        assert!((at.x - 5.0).abs() < 1e-9 && (at.y - 5.0).abs() < 1e-9);
        assert!(!report.is_simple());
    }

    #[test]
    fn test_too_few_points() {
        let line = Polygon::from_coords(&[(0.0, 0.0), (10.0, 0.0), (0.0, 0.0), (10.0, 0.0)]);
        let report = validate(&line);
        assert_eq!(report.issues, vec![PolygonIssue::TooFewPoints { distinct: 2 }]);
    }

    #[test]
    fn test_non_finite_coordinates() {
        let poly = Polygon::from_coords(&[(0.0, 0.0), (f64::NAN, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        let report = validate(&poly);
        assert_eq!(report.issues, vec![PolygonIssue::NonFinite]);
        assert!(report.has_non_finite());
        assert!(!report.has_too_few_points());

        let far = Polygon::from_coords(&[(0.0, 0.0), (f64::INFINITY, 0.0), (0.0, 10.0)]);
        assert!(validate(&far).has_non_finite());
    }

    #[test]
    fn test_zero_area_collinear_ring() {
        let flat = Polygon::from_coords(&[(0.0, 0.0), (5.0, 0.0), (10.0, 0.0)]);
        let report = validate(&flat);
        assert!(report.has_zero_area());
    }

    #[test]
    fn test_simplify_removes_collinear_and_duplicates() {
        let poly = Polygon::from_coords(&[
            (0.0, 0.0),
            (5.0, 0.0),
            (10.0, 0.0),
            (10.0, 0.0),
            (10.0, 10.0),
            (0.0, 10.0),
        ]);
        let simple = simplify(&poly, 0.0);
        assert_eq!(simple.len(), 4);
        assert_eq!(simple.area(), 100.0);
    }

    #[test]
    fn test_simplify_respects_budget() {
        let poly = Polygon::from_coords(&[(0.0, 0.0), (5.0, -1.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        assert_eq!(simplify(&poly, 1.0).len(), 5);
        assert_eq!(simplify(&poly, 5.0).len(), 4);
    }

    #[test]
    fn test_simplify_never_below_three_points() {
        let tri = Polygon::from_coords(&[(0.0, 0.0), (10.0, 0.0), (5.0, 0.1)]);
        assert_eq!(simplify(&tri, 100.0).len(), 3);
    }
}

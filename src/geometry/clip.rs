//! Boolean operations backed by `geo`.

use super::types::{Orientation, Point, Polygon};
use super::validity::{is_simple, simplify};
use super::AREA_EPSILON;
use geo::{Area, BooleanOps, Coord, LineString, MultiPolygon};

type GeoPolygon = geo::Polygon<f64>;

fn to_geo(polygon: &Polygon) -> GeoPolygon {
    let ring: LineString<f64> = polygon
        .points()
        .iter()
        .map(|p| Coord { x: p.x, y: p.y })
        .collect();
    GeoPolygon::new(ring, vec![])
}

fn from_geo(polygon: &GeoPolygon) -> Polygon {
    Polygon::new(
        polygon
            .exterior()
            .coords()
            .map(|c| Point::new(c.x, c.y))
            .collect(),
    )
}

/// Largest part of a multi-polygon, or `None` if no part has positive area.
fn largest_part(parts: &MultiPolygon<f64>) -> Option<&GeoPolygon> {
    parts
        .iter()
        .filter(|p| p.unsigned_area() > AREA_EPSILON)
        .max_by(|a, b| a.unsigned_area().total_cmp(&b.unsigned_area()))
}

/// Drop collinear vertices the boolean op may leave behind and give the
/// result the requested winding.
fn finish(polygon: Polygon, like: Orientation) -> Polygon {
    let cleaned = simplify(&polygon, 0.0).oriented();
    if like == Orientation::CounterClockwise {
        cleaned.reversed()
    } else {
        cleaned
    }
}

/// Intersection of `polygon` with `boundary`.
///
/// Multi-part results keep the largest part. A disjoint pair, or an input
/// that is not a simple polygon, yields [`Polygon::empty`].
pub fn clip(polygon: &Polygon, boundary: &Polygon) -> Polygon {
    if !is_simple(polygon) || !is_simple(boundary) {
        log::debug!("clip skipped: non-simple input");
        return Polygon::empty();
    }
    let parts = to_geo(polygon).intersection(&to_geo(boundary));
    match largest_part(&parts) {
        Some(part) => {
            if parts.0.len() > 1 {
                log::debug!("clip produced {} parts, keeping the largest", parts.0.len());
            }
            finish(from_geo(part), polygon.orientation())
        }
        None => Polygon::empty(),
    }
}

/// Union of several simple polygons.
///
/// Returns `None` when the union does not form a single part (or when any
/// input is not simple); callers decide how to bridge the pieces.
pub fn union_all(polygons: &[Polygon]) -> Option<Polygon> {
    let mut acc: Option<MultiPolygon<f64>> = None;
    for polygon in polygons {
        if !is_simple(polygon) {
            return None;
        }
        let next = MultiPolygon::new(vec![to_geo(polygon)]);
        acc = Some(match acc {
            Some(current) => current.union(&next),
            None => next,
        });
    }
    let parts = acc?;
    let mut significant = parts.iter().filter(|p| p.unsigned_area() > AREA_EPSILON);
    let single = significant.next()?;
    if significant.next().is_some() {
        return None;
    }
    Some(finish(from_geo(single), Orientation::Clockwise))
}

/// Union of two simple polygons, `None` if they stay disjoint.
pub fn union(a: &Polygon, b: &Polygon) -> Option<Polygon> {
    union_all(&[a.clone(), b.clone()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_overlapping_rectangles() {
        let a = Polygon::rectangle(0.0, 0.0, 10.0, 10.0);
        let b = Polygon::rectangle(5.0, 5.0, 15.0, 15.0);
        let clipped = clip(&a, &b);
        assert!((clipped.area() - 25.0).abs() < 1e-9);
        assert!(clipped.signed_area() > 0.0);
        assert_eq!(clipped.bounds().map(|b| (b.x0, b.top, b.x1, b.bottom)), Some((5.0, 5.0, 10.0, 10.0)));
    }

    #[test]
    fn test_clip_disjoint_is_empty() {
        let a = Polygon::rectangle(0.0, 0.0, 10.0, 10.0);
        let b = Polygon::rectangle(20.0, 20.0, 30.0, 30.0);
        assert!(clip(&a, &b).is_empty());
    }

    #[test]
    fn test_clip_follows_input_orientation() {
        let a = Polygon::rectangle(0.0, 0.0, 10.0, 10.0).reversed();
        let b = Polygon::rectangle(5.0, 0.0, 15.0, 10.0);
        let clipped = clip(&a, &b);
        assert!(clipped.signed_area() < 0.0);
        assert!((clipped.area() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_clip_keeps_largest_part() {
        // U shape clipped by a horizontal band leaves two legs.
        let u = Polygon::from_coords(&[
            (0.0, 0.0),
            (4.0, 0.0),
            (4.0, 6.0),
            (6.0, 6.0),
            (6.0, 0.0),
            (12.0, 0.0),
            (12.0, 10.0),
            (0.0, 10.0),
        ])
        .oriented();
        let band = Polygon::rectangle(-1.0, 1.0, 13.0, 5.0);
        let clipped = clip(&u, &band);
        assert!((clipped.area() - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_clip_non_simple_input_is_empty() {
        let bowtie = Polygon::from_coords(&[(0.0, 0.0), (10.0, 10.0), (10.0, 0.0), (0.0, 10.0)]);
        let page = Polygon::rectangle(0.0, 0.0, 100.0, 100.0);
        assert!(clip(&bowtie, &page).is_empty());
    }

    #[test]
    fn test_union_bridged_rectangles() {
        let a = Polygon::rectangle(0.0, 0.0, 100.0, 20.0);
        let bridge = Polygon::rectangle(100.0, 0.0, 110.0, 20.0);
        let b = Polygon::rectangle(110.0, 0.0, 210.0, 20.0);
        let merged = union_all(&[a, bridge, b]).unwrap();
        assert_eq!(merged.len(), 4);
        assert!((merged.area() - 210.0 * 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_union_disjoint_is_none() {
        let a = Polygon::rectangle(0.0, 0.0, 10.0, 10.0);
        let b = Polygon::rectangle(20.0, 0.0, 30.0, 10.0);
        assert!(union(&a, &b).is_none());
    }
}

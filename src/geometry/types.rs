//! Value types: points, polygons, baselines and bounding boxes.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

/// A point (or displacement vector) in image coordinates.
///
/// Image coordinates grow to the right (`x`) and downward (`y`).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate (downward)
    pub y: f64,
}

/// Displacement vectors share the point representation.
pub type Vector = Point;

impl Point {
    /// Create a new point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Length of the point interpreted as a vector.
    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Unit vector in the same direction, `None` for a zero vector.
    pub fn normalized(&self) -> Option<Point> {
        let len = self.norm();
        if len <= f64::EPSILON {
            return None;
        }
        Some(Point::new(self.x / len, self.y / len))
    }

    /// 2D cross product (z component of the 3D cross product).
    pub fn cross(&self, other: &Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Dot product.
    pub fn dot(&self, other: &Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Whether both coordinates are finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point::new(x, y)
    }
}

/// Winding of a polygon ring in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    /// Positive shoelace area; clockwise on screen. This is the canonical
    /// orientation for stored polygons.
    Clockwise,
    /// Negative shoelace area.
    CounterClockwise,
    /// Zero area.
    Degenerate,
}

/// A closed polygon ring.
///
/// The ring is implicitly closed: the first point is never repeated at the
/// end. Invalid rings (too few points, self-intersections) can still be
/// stored so that validation can report them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    /// Create a polygon from its ring, dropping an explicit closing point.
    pub fn new(mut points: Vec<Point>) -> Self {
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        Self { points }
    }

    /// The explicit empty polygon (e.g. the result of a disjoint clip).
    pub fn empty() -> Self {
        Self { points: Vec::new() }
    }

    /// Create a polygon from `(x, y)` tuples.
    pub fn from_coords(coords: &[(f64, f64)]) -> Self {
        Self::new(coords.iter().map(|&c| Point::from(c)).collect())
    }

    /// Axis-aligned rectangle in canonical orientation.
    pub fn rectangle(x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self::new(vec![
            Point::new(x0, top),
            Point::new(x1, top),
            Point::new(x1, bottom),
            Point::new(x0, bottom),
        ])
    }

    /// Ring points.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Consume the polygon and return its ring points.
    pub fn into_points(self) -> Vec<Point> {
        self.points
    }

    /// Number of stored ring points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the polygon has no points at all.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of pairwise distinct points.
    pub fn distinct_point_count(&self) -> usize {
        let mut distinct: Vec<Point> = Vec::with_capacity(self.points.len());
        for p in &self.points {
            if !distinct.iter().any(|d| d.distance(p) <= super::DUPLICATE_TOLERANCE) {
                distinct.push(*p);
            }
        }
        distinct.len()
    }

    /// Edges of the ring as `(start, end)` pairs, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Shoelace signed area (positive for canonical orientation).
    pub fn signed_area(&self) -> f64 {
        signed_area(&self.points)
    }

    /// Absolute enclosed area.
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Winding of the ring.
    pub fn orientation(&self) -> Orientation {
        let area = self.signed_area();
        if area > super::AREA_EPSILON {
            Orientation::Clockwise
        } else if area < -super::AREA_EPSILON {
            Orientation::CounterClockwise
        } else {
            Orientation::Degenerate
        }
    }

    /// The same ring traversed in the opposite direction.
    pub fn reversed(&self) -> Polygon {
        let mut points = self.points.clone();
        points.reverse();
        Polygon { points }
    }

    /// The ring in canonical orientation (reversed if it winds negatively).
    pub fn oriented(self) -> Polygon {
        if self.orientation() == Orientation::CounterClockwise {
            self.reversed()
        } else {
            self
        }
    }

    /// Bounding box of the ring, `None` if empty.
    pub fn bounds(&self) -> Option<BBox> {
        BBox::from_points(&self.points)
    }

    /// Mean of the ring vertices.
    pub fn vertex_mean(&self) -> Option<Point> {
        mean(&self.points)
    }
}

/// Shoelace signed area of a ring given as points.
pub(crate) fn signed_area(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| points[i].cross(&points[(i + 1) % n]))
        .sum();
    twice / 2.0
}

fn mean(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some(Point::new(sx / n, sy / n))
}

/// An open polyline that text glyphs sit on, ordered left to right.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Baseline {
    points: Vec<Point>,
}

impl Baseline {
    /// Create a baseline from its points.
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Create a baseline from `(x, y)` tuples.
    pub fn from_coords(coords: &[(f64, f64)]) -> Self {
        Self::new(coords.iter().map(|&c| Point::from(c)).collect())
    }

    /// Baseline points.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Consume the baseline and return its points.
    pub fn into_points(self) -> Vec<Point> {
        self.points
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the baseline has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First point.
    pub fn first(&self) -> Option<Point> {
        self.points.first().copied()
    }

    /// Last point.
    pub fn last(&self) -> Option<Point> {
        self.points.last().copied()
    }

    /// Points with consecutive duplicates removed.
    pub fn deduplicated(&self) -> Vec<Point> {
        let mut out: Vec<Point> = Vec::with_capacity(self.points.len());
        for p in &self.points {
            if out
                .last()
                .map_or(true, |last| last.distance(p) > super::DUPLICATE_TOLERANCE)
            {
                out.push(*p);
            }
        }
        out
    }

    /// Whether the baseline has at least two distinct points.
    pub fn is_usable(&self) -> bool {
        self.deduplicated().len() >= 2
    }

    /// Total polyline length.
    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| w[0].distance(&w[1])).sum()
    }

    /// Mean y of the baseline points.
    pub fn mean_y(&self) -> Option<f64> {
        mean(&self.points).map(|p| p.y)
    }

    /// Bounding box, `None` if empty.
    pub fn bounds(&self) -> Option<BBox> {
        BBox::from_points(&self.points)
    }
}

/// Axis-aligned bounding box in image coordinates.
///
/// - `x0`: left edge
/// - `top`: top edge
/// - `x1`: right edge
/// - `bottom`: bottom edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl BBox {
    pub fn new(x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self {
            x0,
            top,
            x1,
            bottom,
        }
    }

    /// Bounding box of a point set, `None` if empty.
    pub fn from_points(points: &[Point]) -> Option<BBox> {
        let first = points.first()?;
        let init = BBox::new(first.x, first.y, first.x, first.y);
        Some(points.iter().skip(1).fold(init, |b, p| BBox {
            x0: b.x0.min(p.x),
            top: b.top.min(p.y),
            x1: b.x1.max(p.x),
            bottom: b.bottom.max(p.y),
        }))
    }

    /// Width of the bounding box.
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    /// Height of the bounding box.
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Center point.
    pub fn center(&self) -> Point {
        Point::new((self.x0 + self.x1) / 2.0, (self.top + self.bottom) / 2.0)
    }

    /// Compute the union of two bounding boxes.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            top: self.top.min(other.top),
            x1: self.x1.max(other.x1),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Horizontal gap from this box's right edge to `other`'s left edge.
    ///
    /// Negative when the boxes overlap horizontally.
    pub fn horizontal_gap_to(&self, other: &BBox) -> f64 {
        other.x0 - self.x1
    }

    /// Rectangle polygon covering the box.
    pub fn to_polygon(&self) -> Polygon {
        Polygon::rectangle(self.x0, self.top, self.x1, self.bottom)
    }
}

/// Shapes that can be moved by a displacement vector.
///
/// Translation is exact: coordinates are only added to, so translating by
/// `v` and then by `-v` restores integer-valued coordinates bit for bit.
pub trait Translate {
    /// Return a copy moved by `vector`.
    fn translate(&self, vector: Vector) -> Self;
}

impl Translate for Point {
    fn translate(&self, vector: Vector) -> Self {
        Point::new(self.x + vector.x, self.y + vector.y)
    }
}

impl Translate for Vec<Point> {
    fn translate(&self, vector: Vector) -> Self {
        self.iter().map(|p| p.translate(vector)).collect()
    }
}

impl Translate for Polygon {
    fn translate(&self, vector: Vector) -> Self {
        Polygon {
            points: self.points.translate(vector),
        }
    }
}

impl Translate for Baseline {
    fn translate(&self, vector: Vector) -> Self {
        Baseline {
            points: self.points.translate(vector),
        }
    }
}

impl Translate for BBox {
    fn translate(&self, vector: Vector) -> Self {
        BBox::new(
            self.x0 + vector.x,
            self.top + vector.y,
            self.x1 + vector.x,
            self.bottom + vector.y,
        )
    }
}

/// Move any translatable shape by `vector`.
pub fn translate<T: Translate>(shape: &T, vector: Vector) -> T {
    shape.translate(vector)
}

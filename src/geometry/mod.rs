//! Geometry kernel: value types and the polygon operations the processors
//! are built from.
//!
//! All operations are pure. They take shapes by reference and return new
//! values, so a failed operation always leaves the caller with its input.

mod buffer;
mod clip;
mod ops;
mod types;
mod validity;

pub use buffer::buffer;
pub use clip::{clip, union, union_all};
pub use ops::{
    centroid, contains_point, convex_hull, covers, covers_point, distance_to_ring,
    nearest_point_on_ring, ray_cast, remove_repeated_points, segment_intersection,
};
pub use types::{translate, BBox, Baseline, Orientation, Point, Polygon, Translate, Vector};
pub use validity::{
    find_self_intersection, is_simple, is_valid, simplify, validate, PolygonIssue, ValidityReport,
};

pub(crate) use ops::nearest_on_segment;

/// Points closer than this are the same point.
pub const DUPLICATE_TOLERANCE: f64 = 1e-9;

/// Areas at or below this are zero.
pub const AREA_EPSILON: f64 = 1e-9;

//! Baseline and line-polygon processing.
//!
//! The free functions are pure geometry on one line; [`BaselineProcessor`]
//! applies them to every line of a page and reports what it skipped.

use super::options::{BaselineOptions, BufferOptions, DEFAULT_LINE_HEIGHT};
use super::report::ProcessReport;
use crate::error::{GeometryError, Result};
use crate::geometry::{
    buffer, centroid, clip, contains_point, covers, covers_point, distance_to_ring, is_simple,
    nearest_point_on_ring, ray_cast, translate, BBox, Baseline, Point, Polygon, Vector,
    AREA_EPSILON, DUPLICATE_TOLERANCE,
};
use crate::model::{ElementId, Page};

/// Tolerance for points lying on a polygon boundary.
const ON_BOUNDARY: f64 = 1e-6;

/// Touch tolerance used by [`extend`].
pub const DEFAULT_TOUCH_EPSILON: f64 = 0.5;

// ============================================================
// Single-line operations
// ============================================================

/// Extend both endpoints of `baseline` along their end tangents until they
/// meet `boundary`, moving each by at most `max_extension`.
///
/// Endpoints already within [`DEFAULT_TOUCH_EPSILON`] of the boundary, or
/// lying outside it, are left where they are.
pub fn extend(baseline: &Baseline, boundary: &Polygon, max_extension: f64) -> Baseline {
    extend_within(baseline, boundary, max_extension, DEFAULT_TOUCH_EPSILON)
}

/// [`extend`] with an explicit touch tolerance.
pub fn extend_within(
    baseline: &Baseline,
    boundary: &Polygon,
    max_extension: f64,
    epsilon: f64,
) -> Baseline {
    let pts = baseline.deduplicated();
    if pts.len() < 2 || boundary.len() < 3 || max_extension <= 0.0 {
        return baseline.clone();
    }

    let n = pts.len();
    let start = extend_endpoint(pts[0], pts[1], boundary, max_extension, epsilon);
    let end = extend_endpoint(pts[n - 1], pts[n - 2], boundary, max_extension, epsilon);

    let mut out = pts;
    out[0] = start;
    out[n - 1] = end;
    Baseline::new(out)
}

/// Move `endpoint` away from `neighbour` until it hits the boundary.
fn extend_endpoint(
    endpoint: Point,
    neighbour: Point,
    boundary: &Polygon,
    max_extension: f64,
    epsilon: f64,
) -> Point {
    let Some(direction) = (endpoint - neighbour).normalized() else {
        return endpoint;
    };
    if distance_to_ring(boundary, endpoint) <= epsilon || !contains_point(boundary, endpoint) {
        return endpoint;
    }
    match ray_cast(boundary, endpoint, direction, ON_BOUNDARY) {
        Some(t) => endpoint + direction * t.min(max_extension),
        None => endpoint,
    }
}

/// Ribbon polygon of total height `height` around the baseline.
///
/// Each vertex is displaced by `height / 2` to both sides, perpendicular to
/// the local tangent (the central difference at interior vertices).
pub fn pseudo_polygon(baseline: &Baseline, height: f64) -> std::result::Result<Polygon, GeometryError> {
    if !height.is_finite() || height <= 0.0 {
        return Err(GeometryError::InvalidInput(format!(
            "pseudo-polygon height must be positive, got {}",
            height
        )));
    }
    let pts = baseline.deduplicated();
    if pts.len() < 2 {
        return Err(GeometryError::Degenerate(
            "baseline has fewer than 2 distinct points".to_string(),
        ));
    }

    let n = pts.len();
    let half = height / 2.0;
    let mut upper = Vec::with_capacity(n);
    let mut lower = Vec::with_capacity(n);
    for i in 0..n {
        let prev = pts[i.saturating_sub(1)];
        let next = pts[(i + 1).min(n - 1)];
        let tangent = (next - prev).normalized().ok_or_else(|| {
            GeometryError::Degenerate("baseline folds back onto itself".to_string())
        })?;
        let normal = Point::new(-tangent.y, tangent.x);
        upper.push(pts[i] + normal * half);
        lower.push(pts[i] - normal * half);
    }
    lower.reverse();
    upper.extend(lower);

    let ribbon = Polygon::new(upper).oriented();
    if ribbon.area() <= crate::geometry::AREA_EPSILON {
        return Err(GeometryError::Degenerate("pseudo-polygon has no area".to_string()));
    }
    Ok(ribbon)
}

/// Fit a line polygon into its parent boundary.
///
/// Clips the polygon to the parent; if that leaves nothing usable, clips the
/// pseudo-polygon of `baseline` instead.
///
/// # Errors
///
/// [`GeometryError::Degenerate`] when neither attempt leaves a polygon.
pub fn fit_to_parent(
    line_polygon: &Polygon,
    parent: &Polygon,
    baseline: Option<&Baseline>,
    height_hint: f64,
) -> std::result::Result<Polygon, GeometryError> {
    let clipped = clip(line_polygon, parent);
    if !clipped.is_empty() && is_simple(&clipped) {
        return Ok(clipped);
    }

    let baseline = baseline.ok_or_else(|| {
        GeometryError::Degenerate("line polygon does not fit and there is no baseline".to_string())
    })?;
    log::debug!("line polygon does not fit its parent, using the baseline pseudo-polygon");
    let pseudo = pseudo_polygon(baseline, height_hint)?;
    let clipped = clip(&pseudo, parent);
    if clipped.is_empty() {
        return Err(GeometryError::Degenerate(
            "pseudo-polygon lies outside the parent".to_string(),
        ));
    }
    Ok(clipped)
}

/// Horizontal midline of the polygon's bounding box, left to right.
pub fn derive_baseline(polygon: &Polygon) -> Option<Baseline> {
    let bbox = polygon.bounds()?;
    if bbox.width() <= DUPLICATE_TOLERANCE {
        return None;
    }
    let mid = (bbox.top + bbox.bottom) / 2.0;
    Some(Baseline::new(vec![
        Point::new(bbox.x0, mid),
        Point::new(bbox.x1, mid),
    ]))
}

/// Shift the polygon horizontally so its x-extent is centred over the
/// baseline's.
pub fn center_over_baseline(polygon: &Polygon, baseline: &Baseline) -> Polygon {
    match (polygon.bounds(), baseline.bounds()) {
        (Some(p), Some(b)) => {
            let dx = ((b.x0 - p.x0) + (b.x1 - p.x1)) / 2.0;
            translate(polygon, Vector::new(dx, 0.0))
        }
        _ => polygon.clone(),
    }
}

/// Move baseline points that lie outside `polygon` onto its boundary.
///
/// A point is moved only when the boundary is closer than both of its
/// neighbours, so the polyline keeps its shape. Returns the new baseline and
/// the number of moved points.
pub fn snap_baseline_into(baseline: &Baseline, polygon: &Polygon) -> (Baseline, usize) {
    let pts = baseline.points();
    let mut out: Vec<Point> = Vec::with_capacity(pts.len());
    let mut moved = 0;
    for (i, &p) in pts.iter().enumerate() {
        if covers_point(polygon, p, ON_BOUNDARY) {
            out.push(p);
            continue;
        }
        let Some(nearest) = nearest_point_on_ring(polygon, p) else {
            out.push(p);
            continue;
        };
        let d = p.distance(&nearest);
        let pred = out.last().map_or(f64::INFINITY, |q| q.distance(&p));
        let succ = pts.get(i + 1).map_or(f64::INFINITY, |q| q.distance(&p));
        if d < pred && d < succ {
            out.push(nearest);
            moved += 1;
        } else {
            out.push(p);
        }
    }
    (Baseline::new(out), moved)
}

/// Cut two overlapping polygons apart at the middle of their overlap.
///
/// Stacked polygons are cut horizontally, polygons side by side vertically,
/// depending on which axis separates their centroids more. `None` when they
/// do not overlap or one of them would vanish.
pub fn separate_overlap(first: &Polygon, second: &Polygon) -> Option<(Polygon, Polygon)> {
    let overlap = clip(first, second);
    if overlap.area() <= AREA_EPSILON {
        return None;
    }
    let cut = overlap.bounds()?;
    let (a, b) = (centroid(first)?, centroid(second)?);
    let all = first.bounds()?.union(&second.bounds()?);

    let (first_side, second_side) = if (b.y - a.y).abs() >= (b.x - a.x).abs() {
        let mid = (cut.top + cut.bottom) / 2.0;
        let above = Polygon::rectangle(all.x0, all.top, all.x1, mid);
        let below = Polygon::rectangle(all.x0, mid, all.x1, all.bottom);
        if a.y <= b.y {
            (above, below)
        } else {
            (below, above)
        }
    } else {
        let mid = (cut.x0 + cut.x1) / 2.0;
        let left = Polygon::rectangle(all.x0, all.top, mid, all.bottom);
        let right = Polygon::rectangle(mid, all.top, all.x1, all.bottom);
        if a.x <= b.x {
            (left, right)
        } else {
            (right, left)
        }
    };

    let first = clip(first, &first_side);
    let second = clip(second, &second_side);
    if first.is_empty() || second.is_empty() {
        return None;
    }
    Some((first, second))
}

/// Number of baseline points outside the polygon.
pub fn points_outside(baseline: &Baseline, polygon: &Polygon) -> usize {
    baseline
        .points()
        .iter()
        .filter(|&&p| !covers_point(polygon, p, ON_BOUNDARY))
        .count()
}

/// Default pseudo-polygon height for the lines of `container`.
///
/// Mean bounding-box height of the container's lines with simple polygons,
/// else `fallback_ratio` times the container height, else
/// [`DEFAULT_LINE_HEIGHT`].
pub fn estimate_line_height(page: &Page, container: ElementId, fallback_ratio: f64) -> f64 {
    let heights: Vec<f64> = page
        .lines_of(container)
        .into_iter()
        .filter_map(|id| page.get(id))
        .filter(|line| is_simple(&line.polygon))
        .filter_map(|line| line.polygon.bounds())
        .map(|b| b.height())
        .filter(|h| *h > 0.0)
        .collect();
    if !heights.is_empty() {
        return heights.iter().sum::<f64>() / heights.len() as f64;
    }
    page.get(container)
        .and_then(|c| c.polygon.bounds())
        .map(|b| b.height() * fallback_ratio)
        .filter(|h| *h > 0.0)
        .unwrap_or(DEFAULT_LINE_HEIGHT)
}

/// Piece of a left-to-right baseline between `x_lo` and `x_hi`, with
/// interpolated end points. `None` if the ranges do not overlap.
pub(crate) fn cut_baseline(baseline: &Baseline, x_lo: f64, x_hi: f64) -> Option<Baseline> {
    let mut pts = baseline.deduplicated();
    if pts.len() < 2 {
        return None;
    }
    if pts[0].x > pts[pts.len() - 1].x {
        pts.reverse();
    }
    let lo = x_lo.max(pts[0].x);
    let hi = x_hi.min(pts[pts.len() - 1].x);
    if hi - lo <= DUPLICATE_TOLERANCE {
        return None;
    }

    let mut out = vec![interpolate_at(&pts, lo)];
    out.extend(pts.iter().copied().filter(|p| p.x > lo && p.x < hi));
    out.push(interpolate_at(&pts, hi));
    Some(Baseline::new(out))
}

fn interpolate_at(pts: &[Point], x: f64) -> Point {
    for w in pts.windows(2) {
        let (a, b) = (w[0], w[1]);
        if x >= a.x.min(b.x) && x <= a.x.max(b.x) {
            let dx = b.x - a.x;
            if dx.abs() <= f64::EPSILON {
                return Point::new(x, a.y);
            }
            let t = (x - a.x) / dx;
            return Point::new(x, a.y + (b.y - a.y) * t);
        }
    }
    let (first, last) = (pts[0], pts[pts.len() - 1]);
    let y = if (first.x - x).abs() <= (last.x - x).abs() {
        first.y
    } else {
        last.y
    };
    Point::new(x, y)
}

// ============================================================
// Page drivers
// ============================================================

/// Applies the baseline operations to every line of a page.
#[derive(Debug, Clone, Default)]
pub struct BaselineProcessor {
    options: BaselineOptions,
}

impl BaselineProcessor {
    /// Create a processor; fails on invalid options.
    pub fn new(options: BaselineOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &BaselineOptions {
        &self.options
    }

    fn line_height(&self, page: &Page, container: ElementId) -> f64 {
        self.options.height_hint.unwrap_or_else(|| {
            estimate_line_height(page, container, self.options.fallback_height_ratio)
        })
    }

    /// `(container, container polygon if simple, lines)` for every container.
    fn containers(page: &Page) -> Vec<(ElementId, Option<Polygon>, Vec<ElementId>)> {
        page.line_containers()
            .into_iter()
            .filter_map(|c| {
                let el = page.get(c)?;
                let polygon = is_simple(&el.polygon).then(|| el.polygon.clone());
                Some((c, polygon, page.lines_of(c)))
            })
            .collect()
    }

    /// Extend every baseline to its line polygon (or, if that is unusable,
    /// to the container polygon).
    pub fn extend_baselines(&self, page: &mut Page) -> Result<ProcessReport> {
        let mut report = ProcessReport::new();
        for (_, container_polygon, lines) in Self::containers(page) {
            for id in lines {
                let line = page.element(id)?;
                let Some(baseline) = line.baseline.clone() else {
                    report.skip(id, &line.name, "no baseline");
                    continue;
                };
                let boundary = if is_simple(&line.polygon) {
                    line.polygon.clone()
                } else if let Some(container) = &container_polygon {
                    container.clone()
                } else {
                    report.skip(id, &line.name, "no usable boundary");
                    continue;
                };
                let extended = extend_within(
                    &baseline,
                    &boundary,
                    self.options.max_extension,
                    self.options.epsilon,
                );
                if extended != baseline {
                    page.element_mut(id)?.baseline = Some(extended);
                    report.processed += 1;
                }
            }
        }
        Ok(report)
    }

    /// Replace every line polygon by the pseudo-polygon of its baseline,
    /// clipped to the container.
    pub fn pseudo_polygons(&self, page: &mut Page) -> Result<ProcessReport> {
        let mut report = ProcessReport::new();
        for (container, container_polygon, lines) in Self::containers(page) {
            let height = self.line_height(page, container);
            for id in lines {
                let line = page.element(id)?;
                let name = line.name.clone();
                let Some(baseline) = line.baseline.clone() else {
                    report.skip(id, &name, "no baseline");
                    continue;
                };
                let pseudo = match pseudo_polygon(&baseline, height) {
                    Ok(p) => p,
                    Err(e) => {
                        report.skip(id, &name, e.to_string());
                        continue;
                    }
                };
                let fitted = match &container_polygon {
                    Some(parent) => clip(&pseudo, parent),
                    None => pseudo,
                };
                if fitted.is_empty() {
                    report.skip(id, &name, "pseudo-polygon lies outside the container");
                    continue;
                }
                page.element_mut(id)?.polygon = fitted;
                report.processed += 1;
            }
        }
        Ok(report)
    }

    /// Re-fit line polygons that are not within their container.
    pub fn fit_lines_to_parents(&self, page: &mut Page) -> Result<ProcessReport> {
        let mut report = ProcessReport::new();
        for (container, container_polygon, lines) in Self::containers(page) {
            let Some(parent) = container_polygon else {
                continue;
            };
            let height = self.line_height(page, container);
            for id in lines {
                let line = page.element(id)?;
                if covers(&parent, &line.polygon, ON_BOUNDARY) {
                    continue;
                }
                match fit_to_parent(&line.polygon, &parent, line.baseline.as_ref(), height) {
                    Ok(fitted) => {
                        page.element_mut(id)?.polygon = fitted;
                        report.processed += 1;
                    }
                    Err(e) => {
                        let name = line.name.clone();
                        report.skip(id, &name, e.to_string());
                    }
                }
            }
        }
        Ok(report)
    }

    /// Offset every line polygon, optionally clipping it to its container.
    pub fn buffer_lines(&self, page: &mut Page, options: &BufferOptions) -> Result<ProcessReport> {
        options.validate()?;
        let mut report = ProcessReport::new();
        for (_, container_polygon, lines) in Self::containers(page) {
            for &id in &lines {
                let line = page.element(id)?;
                let name = line.name.clone();
                let mut polygon = match buffer(&line.polygon, options.distance) {
                    Ok(p) => p,
                    Err(e) => {
                        report.skip(id, &name, e.to_string());
                        continue;
                    }
                };
                if options.fit_to_parent {
                    if let Some(parent) = &container_polygon {
                        polygon = clip(&polygon, parent);
                    }
                }
                if polygon.is_empty() {
                    report.skip(id, &name, "offset polygon lies outside the container");
                    continue;
                }
                page.element_mut(id)?.polygon = polygon;
                report.processed += 1;
            }
            if options.separate_overlaps {
                Self::separate_consecutive(page, &lines, &mut report)?;
            }
        }
        Ok(report)
    }

    /// Cut overlapping consecutive lines of every container apart.
    pub fn separate_overlapping_lines(&self, page: &mut Page) -> Result<ProcessReport> {
        let mut report = ProcessReport::new();
        for (_, _, lines) in Self::containers(page) {
            Self::separate_consecutive(page, &lines, &mut report)?;
        }
        Ok(report)
    }

    /// Separate each line from its predecessor in `lines`, in order.
    fn separate_consecutive(
        page: &mut Page,
        lines: &[ElementId],
        report: &mut ProcessReport,
    ) -> Result<()> {
        for pair in lines.windows(2) {
            let (prev, id) = (pair[0], pair[1]);
            let (first, second) = (&page.element(prev)?.polygon, &page.element(id)?.polygon);
            if !is_simple(first) || !is_simple(second) {
                continue;
            }
            if let Some((first, second)) = separate_overlap(first, second) {
                log::debug!(
                    "separated overlapping lines {} and {}",
                    page.element(prev)?.name,
                    page.element(id)?.name
                );
                page.element_mut(prev)?.polygon = first;
                page.element_mut(id)?.polygon = second;
                report.processed += 1;
            }
        }
        Ok(())
    }

    /// Give every line without a baseline the midline of its polygon.
    pub fn derive_missing_baselines(&self, page: &mut Page) -> Result<ProcessReport> {
        let mut report = ProcessReport::new();
        for id in page.lines() {
            let line = page.element(id)?;
            if line.baseline.as_ref().map_or(false, Baseline::is_usable) {
                continue;
            }
            match derive_baseline(&line.polygon) {
                Some(baseline) => {
                    page.element_mut(id)?.baseline = Some(baseline);
                    report.processed += 1;
                }
                None => {
                    let name = line.name.clone();
                    report.skip(id, &name, "polygon has no horizontal extent");
                }
            }
        }
        Ok(report)
    }

    /// Centre every line polygon horizontally over its baseline.
    pub fn center_polygons_over_baselines(&self, page: &mut Page) -> Result<ProcessReport> {
        let mut report = ProcessReport::new();
        for id in page.lines() {
            let line = page.element(id)?;
            let Some(baseline) = &line.baseline else {
                let name = line.name.clone();
                report.skip(id, &name, "no baseline");
                continue;
            };
            let centered = center_over_baseline(&line.polygon, baseline);
            if centered != line.polygon {
                page.element_mut(id)?.polygon = centered;
                report.processed += 1;
            }
        }
        Ok(report)
    }

    /// Move every baseline of the page by `vector`.
    pub fn translate_baselines(&self, page: &mut Page, vector: Vector) -> Result<ProcessReport> {
        let mut report = ProcessReport::new();
        for id in page.lines() {
            let line = page.element_mut(id)?;
            if let Some(baseline) = &line.baseline {
                line.baseline = Some(translate(baseline, vector));
                report.processed += 1;
            }
        }
        Ok(report)
    }

    /// Snap baseline points lying outside their line polygon.
    pub fn snap_baselines(&self, page: &mut Page) -> Result<ProcessReport> {
        let mut report = ProcessReport::new();
        for id in page.lines() {
            let line = page.element(id)?;
            let Some(baseline) = &line.baseline else {
                continue;
            };
            if !is_simple(&line.polygon) {
                continue;
            }
            let (snapped, moved) = snap_baseline_into(baseline, &line.polygon);
            let outside = points_outside(&snapped, &line.polygon);
            let name = line.name.clone();
            if moved > 0 {
                page.element_mut(id)?.baseline = Some(snapped);
                report.processed += 1;
            }
            if outside > 0 {
                report.skip(id, &name, format!("{} baseline points remain outside", outside));
            }
        }
        Ok(report)
    }
}

/// Bounding box of an element's geometry: the polygon, or the baseline if
/// the polygon is empty.
pub(crate) fn geometry_bounds(polygon: &Polygon, baseline: Option<&Baseline>) -> Option<BBox> {
    polygon
        .bounds()
        .or_else(|| baseline.and_then(Baseline::bounds))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boundary() -> Polygon {
        Polygon::rectangle(0.0, 0.0, 50.0, 20.0)
    }

    // ============================================================
    // extend
    // ============================================================

    #[test]
    fn test_extend_to_boundary() {
        let baseline = Baseline::from_coords(&[(10.0, 10.0), (40.0, 10.0)]);
        let extended = extend(&baseline, &boundary(), 100.0);
        assert_eq!(extended, Baseline::from_coords(&[(0.0, 10.0), (50.0, 10.0)]));
    }

    #[test]
    fn test_extend_limited_by_max_extension() {
        let baseline = Baseline::from_coords(&[(10.0, 10.0), (40.0, 10.0)]);
        let extended = extend(&baseline, &boundary(), 4.0);
        assert_eq!(extended, Baseline::from_coords(&[(6.0, 10.0), (44.0, 10.0)]));
    }

    #[test]
    fn test_extend_touching_and_outside_endpoints_unchanged() {
        let touching = Baseline::from_coords(&[(0.2, 10.0), (30.0, 10.0)]);
        let extended = extend(&touching, &boundary(), 100.0);
        assert_eq!(extended.first(), Some(Point::new(0.2, 10.0)));
        assert_eq!(extended.last(), Some(Point::new(50.0, 10.0)));

        let outside = Baseline::from_coords(&[(10.0, 10.0), (60.0, 10.0)]);
        let extended = extend(&outside, &boundary(), 100.0);
        assert_eq!(extended.last(), Some(Point::new(60.0, 10.0)));
        assert_eq!(extended.first(), Some(Point::new(0.0, 10.0)));
    }

    #[test]
    fn test_extend_follows_end_tangent() {
        let baseline = Baseline::from_coords(&[(10.0, 10.0), (20.0, 10.0), (30.0, 12.0)]);
        let extended = extend(&baseline, &boundary(), 100.0);
        let last = extended.last().unwrap();
        assert!((last.x - 50.0).abs() < 1e-9);
        assert!((last.y - 16.0).abs() < 1e-9);
        assert_eq!(extended.len(), 3);
    }

    // ============================================================
    // pseudo_polygon
    // ============================================================

    #[test]
    fn test_pseudo_polygon_straight() {
        let baseline = Baseline::from_coords(&[(0.0, 10.0), (100.0, 10.0)]);
        let poly = pseudo_polygon(&baseline, 8.0).unwrap();
        assert!(poly.signed_area() > 0.0);
        assert!((poly.area() - 800.0).abs() < 1e-9);
        let b = poly.bounds().unwrap();
        assert_eq!((b.x0, b.top, b.x1, b.bottom), (0.0, 6.0, 100.0, 14.0));
    }

    #[test]
    fn test_pseudo_polygon_polyline() {
        let baseline = Baseline::from_coords(&[(0.0, 10.0), (50.0, 10.0), (100.0, 20.0)]);
        let poly = pseudo_polygon(&baseline, 10.0).unwrap();
        assert_eq!(poly.len(), 6);
        assert!(crate::geometry::is_valid(&poly));
    }

    #[test]
    fn test_pseudo_polygon_degenerate() {
        let single = Baseline::from_coords(&[(5.0, 5.0), (5.0, 5.0)]);
        assert!(matches!(
            pseudo_polygon(&single, 10.0),
            Err(GeometryError::Degenerate(_))
        ));
        let baseline = Baseline::from_coords(&[(0.0, 0.0), (10.0, 0.0)]);
        assert!(matches!(
            pseudo_polygon(&baseline, 0.0),
            Err(GeometryError::InvalidInput(_))
        ));
    }

    // ============================================================
    // fit_to_parent
    // ============================================================

    #[test]
    fn test_fit_to_parent_clips() {
        let line = Polygon::rectangle(-10.0, 5.0, 60.0, 15.0);
        let fitted = fit_to_parent(&line, &boundary(), None, 10.0).unwrap();
        let b = fitted.bounds().unwrap();
        assert_eq!((b.x0, b.x1), (0.0, 50.0));
    }

    #[test]
    fn test_fit_to_parent_falls_back_to_baseline() {
        let degenerate = Polygon::from_coords(&[(5.0, 10.0), (45.0, 10.0)]);
        let baseline = Baseline::from_coords(&[(5.0, 10.0), (45.0, 10.0)]);
        let fitted = fit_to_parent(&degenerate, &boundary(), Some(&baseline), 6.0).unwrap();
        assert!((fitted.area() - 240.0).abs() < 1e-9);

        assert!(fit_to_parent(&degenerate, &boundary(), None, 6.0).is_err());
    }

    #[test]
    fn test_fit_to_parent_disjoint() {
        let line = Polygon::rectangle(100.0, 0.0, 150.0, 10.0);
        let baseline = Baseline::from_coords(&[(100.0, 8.0), (150.0, 8.0)]);
        assert!(matches!(
            fit_to_parent(&line, &boundary(), Some(&baseline), 10.0),
            Err(GeometryError::Degenerate(_))
        ));
    }

    // ============================================================
    // Supplementary operations
    // ============================================================

    #[test]
    fn test_derive_baseline_midline() {
        let poly = Polygon::rectangle(10.0, 0.0, 90.0, 20.0);
        assert_eq!(
            derive_baseline(&poly),
            Some(Baseline::from_coords(&[(10.0, 10.0), (90.0, 10.0)]))
        );
        assert_eq!(derive_baseline(&Polygon::empty()), None);
    }

    #[test]
    fn test_center_over_baseline() {
        let poly = Polygon::rectangle(0.0, 0.0, 40.0, 10.0);
        let baseline = Baseline::from_coords(&[(20.0, 8.0), (80.0, 8.0)]);
        let centered = center_over_baseline(&poly, &baseline);
        let b = centered.bounds().unwrap();
        assert_eq!((b.x0, b.x1), (30.0, 70.0));
    }

    #[test]
    fn test_snap_baseline_into() {
        let poly = Polygon::rectangle(0.0, 0.0, 100.0, 20.0);
        let baseline = Baseline::from_coords(&[(50.0, 21.0), (70.0, 15.0), (90.0, 15.0)]);
        let (snapped, moved) = snap_baseline_into(&baseline, &poly);
        assert_eq!(moved, 1);
        assert_eq!(snapped.first(), Some(Point::new(50.0, 20.0)));
        assert_eq!(points_outside(&snapped, &poly), 0);
    }

    #[test]
    fn test_snap_keeps_far_points() {
        let poly = Polygon::rectangle(0.0, 0.0, 100.0, 20.0);
        let baseline = Baseline::from_coords(&[(10.0, 60.0), (20.0, 65.0)]);
        let (snapped, moved) = snap_baseline_into(&baseline, &poly);
        assert_eq!(moved, 0);
        assert_eq!(snapped, baseline);
    }

    #[test]
    fn test_cut_baseline_interpolates() {
        let baseline = Baseline::from_coords(&[(0.0, 10.0), (100.0, 20.0)]);
        let cut = cut_baseline(&baseline, 25.0, 75.0).unwrap();
        assert_eq!(cut, Baseline::from_coords(&[(25.0, 12.5), (75.0, 17.5)]));
        assert!(cut_baseline(&baseline, 120.0, 150.0).is_none());
        let clamped = cut_baseline(&baseline, -50.0, 40.0).unwrap();
        assert_eq!(clamped.first(), Some(Point::new(0.0, 10.0)));
    }

    // ============================================================
    // Drivers
    // ============================================================

    #[test]
    fn test_estimate_line_height() {
        let mut page = Page::new(200.0, 200.0);
        let region = page.add_text_region("r", Polygon::rectangle(0.0, 0.0, 200.0, 100.0));
        assert_eq!(estimate_line_height(&page, region, 0.1), 10.0);
        page.add_line(region, "l1", Polygon::rectangle(0.0, 0.0, 100.0, 20.0)).unwrap();
        page.add_line(region, "l2", Polygon::rectangle(0.0, 30.0, 100.0, 60.0)).unwrap();
        assert_eq!(estimate_line_height(&page, region, 0.1), 25.0);
    }

    #[test]
    fn test_processor_extend_and_report() {
        let mut page = Page::new(200.0, 200.0);
        let region = page.add_text_region("r", Polygon::rectangle(0.0, 0.0, 200.0, 100.0));
        let l1 = page.add_line(region, "l1", boundary()).unwrap();
        page.element_mut(l1).unwrap().baseline =
            Some(Baseline::from_coords(&[(10.0, 10.0), (40.0, 10.0)]));
        page.add_line(region, "l2", boundary()).unwrap();

        let processor = BaselineProcessor::new(BaselineOptions::default()).unwrap();
        let report = processor.extend_baselines(&mut page).unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].name, "l2");
        assert_eq!(
            page.element(l1).unwrap().baseline,
            Some(Baseline::from_coords(&[(0.0, 10.0), (50.0, 10.0)]))
        );
    }

    #[test]
    fn test_processor_rejects_invalid_options() {
        let options = BaselineOptions::new().with_max_extension(-5.0);
        assert!(BaselineProcessor::new(options).is_err());
    }

    #[test]
    fn test_processor_translate_baselines_round_trip() {
        let mut page = Page::new(200.0, 200.0);
        let region = page.add_text_region("r", Polygon::rectangle(0.0, 0.0, 200.0, 100.0));
        let l1 = page.add_line(region, "l1", boundary()).unwrap();
        let original = Baseline::from_coords(&[(10.0, 10.0), (40.0, 11.0)]);
        page.element_mut(l1).unwrap().baseline = Some(original.clone());

        let processor = BaselineProcessor::default();
        processor.translate_baselines(&mut page, Vector::new(0.0, 7.0)).unwrap();
        processor.translate_baselines(&mut page, Vector::new(0.0, -7.0)).unwrap();
        assert_eq!(page.element(l1).unwrap().baseline, Some(original));
    }

    #[test]
    fn test_processor_pseudo_polygons_clip_to_container() {
        let mut page = Page::new(200.0, 200.0);
        let region = page.add_text_region("r", Polygon::rectangle(0.0, 0.0, 100.0, 100.0));
        let l1 = page.add_line(region, "l1", Polygon::empty()).unwrap();
        page.element_mut(l1).unwrap().baseline =
            Some(Baseline::from_coords(&[(10.0, 2.0), (90.0, 2.0)]));

        let processor =
            BaselineProcessor::new(BaselineOptions::new().with_height_hint(10.0)).unwrap();
        let report = processor.pseudo_polygons(&mut page).unwrap();
        assert_eq!(report.processed, 1);
        let b = page.element(l1).unwrap().polygon.bounds().unwrap();
        assert_eq!((b.x0, b.top, b.x1, b.bottom), (10.0, 0.0, 90.0, 7.0));
    }

    // ============================================================
    // Overlap separation
    // ============================================================

    fn assert_bounds(polygon: &Polygon, expected: (f64, f64, f64, f64)) {
        let b = polygon.bounds().unwrap();
        let got = (b.x0, b.top, b.x1, b.bottom);
        let close = |a: f64, b: f64| (a - b).abs() < 1e-9;
        assert!(
            close(got.0, expected.0)
                && close(got.1, expected.1)
                && close(got.2, expected.2)
                && close(got.3, expected.3),
            "{:?} != {:?}",
            got,
            expected
        );
    }

    #[test]
    fn test_separate_overlap_stacked() {
        let upper = Polygon::rectangle(0.0, 0.0, 100.0, 30.0);
        let lower = Polygon::rectangle(10.0, 20.0, 90.0, 50.0);
        let (a, b) = separate_overlap(&lower, &upper).unwrap();
        assert_bounds(&a, (10.0, 25.0, 90.0, 50.0));
        assert_bounds(&b, (0.0, 0.0, 100.0, 25.0));
        assert!(clip(&a, &b).area() < 1e-9);
    }

    #[test]
    fn test_separate_overlap_side_by_side() {
        let left = Polygon::rectangle(0.0, 0.0, 60.0, 20.0);
        let right = Polygon::rectangle(50.0, 0.0, 120.0, 20.0);
        let (a, b) = separate_overlap(&left, &right).unwrap();
        assert_bounds(&a, (0.0, 0.0, 55.0, 20.0));
        assert_bounds(&b, (55.0, 0.0, 120.0, 20.0));
    }

    #[test]
    fn test_separate_overlap_disjoint() {
        let a = Polygon::rectangle(0.0, 0.0, 10.0, 10.0);
        let b = Polygon::rectangle(0.0, 10.0, 10.0, 20.0);
        assert!(separate_overlap(&a, &b).is_none());
    }

    fn two_line_page() -> (Page, ElementId, ElementId) {
        let mut page = Page::new(300.0, 300.0);
        let region = page.add_text_region("r", Polygon::rectangle(0.0, 0.0, 200.0, 200.0));
        let l1 = page
            .add_line(region, "l1", Polygon::rectangle(0.0, 0.0, 100.0, 20.0))
            .unwrap();
        let l2 = page
            .add_line(region, "l2", Polygon::rectangle(0.0, 25.0, 100.0, 45.0))
            .unwrap();
        (page, l1, l2)
    }

    #[test]
    fn test_buffer_lines_separates_neighbours() {
        let (mut page, l1, l2) = two_line_page();
        let report = BaselineProcessor::default()
            .buffer_lines(&mut page, &BufferOptions::new(5.0))
            .unwrap();
        assert_eq!(report.processed, 3);

        let first = page.element(l1).unwrap().polygon.clone();
        let second = page.element(l2).unwrap().polygon.clone();
        assert_bounds(&first, (0.0, 0.0, 105.0, 22.5));
        assert_bounds(&second, (0.0, 22.5, 105.0, 50.0));
        assert!(clip(&first, &second).area() < 1e-9);
    }

    #[test]
    fn test_buffer_lines_can_keep_overlaps() {
        let (mut page, l1, l2) = two_line_page();
        let options = BufferOptions::new(5.0).with_separate_overlaps(false);
        BaselineProcessor::default().buffer_lines(&mut page, &options).unwrap();
        let overlap = clip(
            &page.element(l1).unwrap().polygon,
            &page.element(l2).unwrap().polygon,
        );
        assert!((overlap.area() - 525.0).abs() < 1e-6);
    }
}

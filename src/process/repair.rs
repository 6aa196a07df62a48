//! Validation and repair of layout geometry.
//!
//! [`Validator`] reports violated invariants without touching the page;
//! [`Repairer`] fixes what it can and tags every entity with an outcome.

use super::baseline::{
    derive_baseline, estimate_line_height, fit_to_parent, points_outside, pseudo_polygon,
    snap_baseline_into,
};
use super::deletion;
use super::options::RepairOptions;
use crate::error::{RepairError, Result};
use crate::geometry::{
    buffer, convex_hull, covers, is_simple, remove_repeated_points, simplify, validate, Baseline,
    Orientation, Point, Polygon, PolygonIssue,
};
use crate::model::{ElementId, ElementKind, Page};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Tolerance for vertices lying on a bounding polygon.
const COVER_TOLERANCE: f64 = 1e-6;

/// Severity of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// The entity breaks an invariant downstream code relies on.
    Error,
    /// Suspicious but usable.
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// What is wrong with an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IssueKind {
    /// Parent reference is dangling or of the wrong kind
    Orphaned,
    NonFinite,
    TooFewPoints { distinct: usize },
    SelfIntersection { at: Point },
    ZeroArea,
    ReversedOrientation,
    /// Polygon leaves the page bounds
    OutsidePage,
    /// Polygon is not within its parent's polygon
    OutsideParent,
    MissingBaseline,
    /// Baseline with fewer than two distinct points
    InvalidBaseline,
    BaselineOutsidePolygon { points: usize },
    /// Text-bearing element without text
    EmptyText,
}

impl IssueKind {
    pub fn severity(&self) -> Severity {
        match self {
            IssueKind::Orphaned
            | IssueKind::NonFinite
            | IssueKind::TooFewPoints { .. }
            | IssueKind::SelfIntersection { .. }
            | IssueKind::ZeroArea
            | IssueKind::OutsidePage
            | IssueKind::InvalidBaseline => Severity::Error,
            IssueKind::ReversedOrientation
            | IssueKind::OutsideParent
            | IssueKind::MissingBaseline
            | IssueKind::BaselineOutsidePolygon { .. }
            | IssueKind::EmptyText => Severity::Warning,
        }
    }

    /// Machine-readable issue code.
    pub fn code(&self) -> &'static str {
        match self {
            IssueKind::Orphaned => "ORPHANED",
            IssueKind::NonFinite => "NON_FINITE",
            IssueKind::TooFewPoints { .. } => "TOO_FEW_POINTS",
            IssueKind::SelfIntersection { .. } => "SELF_INTERSECTION",
            IssueKind::ZeroArea => "ZERO_AREA",
            IssueKind::ReversedOrientation => "REVERSED_ORIENTATION",
            IssueKind::OutsidePage => "OUTSIDE_PAGE",
            IssueKind::OutsideParent => "OUTSIDE_PARENT",
            IssueKind::MissingBaseline => "MISSING_BASELINE",
            IssueKind::InvalidBaseline => "INVALID_BASELINE",
            IssueKind::BaselineOutsidePolygon { .. } => "BASELINE_OUTSIDE_POLYGON",
            IssueKind::EmptyText => "EMPTY_TEXT",
        }
    }

    fn message(&self) -> String {
        match self {
            IssueKind::Orphaned => "parent reference is dangling or of the wrong kind".to_string(),
            IssueKind::NonFinite => "polygon has NaN or infinite coordinates".to_string(),
            IssueKind::TooFewPoints { distinct } => {
                format!("polygon has {} distinct points", distinct)
            }
            IssueKind::SelfIntersection { at } => {
                format!("polygon crosses itself at ({:.1}, {:.1})", at.x, at.y)
            }
            IssueKind::ZeroArea => "polygon has zero area".to_string(),
            IssueKind::ReversedOrientation => "polygon has reversed orientation".to_string(),
            IssueKind::OutsidePage => "polygon leaves the page bounds".to_string(),
            IssueKind::OutsideParent => "polygon is not within its parent".to_string(),
            IssueKind::MissingBaseline => "line has no baseline".to_string(),
            IssueKind::InvalidBaseline => "baseline has fewer than 2 distinct points".to_string(),
            IssueKind::BaselineOutsidePolygon { points } => {
                format!("{} baseline points lie outside the line polygon", points)
            }
            IssueKind::EmptyText => "text is empty".to_string(),
        }
    }
}

impl From<&PolygonIssue> for IssueKind {
    fn from(issue: &PolygonIssue) -> Self {
        match issue {
            PolygonIssue::NonFinite => IssueKind::NonFinite,
            PolygonIssue::TooFewPoints { distinct } => IssueKind::TooFewPoints {
                distinct: *distinct,
            },
            PolygonIssue::SelfIntersection { at } => IssueKind::SelfIntersection { at: *at },
            PolygonIssue::ZeroArea => IssueKind::ZeroArea,
            PolygonIssue::ReversedOrientation => IssueKind::ReversedOrientation,
        }
    }
}

/// A problem found on one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub id: ElementId,
    pub name: String,
    pub element_kind: ElementKind,
    pub issue: IssueKind,
    pub severity: Severity,
}

impl ValidationIssue {
    fn new(id: ElementId, name: &str, element_kind: ElementKind, issue: IssueKind) -> Self {
        Self {
            id,
            name: name.to_string(),
            element_kind,
            severity: issue.severity(),
            issue,
        }
    }

    /// Returns `true` if the issue is an error.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({} {})",
            self.severity,
            self.issue.code(),
            self.issue.message(),
            self.element_kind,
            self.name
        )
    }
}

// ============================================================
// Validation
// ============================================================

/// Check-only pass over a page.
#[derive(Debug, Clone, Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    /// Report every violated invariant, in tree order followed by
    /// unreachable elements.
    pub fn validate(&self, page: &Page) -> Vec<ValidationIssue> {
        let bounds = match page.bounds() {
            Ok(b) => Some(b),
            Err(e) => {
                log::warn!("skipping page-bounds checks: {}", e);
                None
            }
        };
        let mut issues = Vec::new();
        for id in visit_order(page) {
            issues.extend(self.check_element(page, id, bounds.as_ref()));
        }
        issues
    }

    /// Issues of one element.
    pub fn check_element(
        &self,
        page: &Page,
        id: ElementId,
        bounds: Option<&Polygon>,
    ) -> Vec<ValidationIssue> {
        let Some(el) = page.get(id) else {
            return Vec::new();
        };
        let mut found: Vec<IssueKind> = Vec::new();

        if page.is_orphan(id) {
            found.push(IssueKind::Orphaned);
        }

        let report = validate(&el.polygon);
        found.extend(report.issues.iter().map(IssueKind::from));
        let simple = report.is_simple();

        if simple {
            if let Some(bounds) = bounds {
                if !covers(bounds, &el.polygon, COVER_TOLERANCE) {
                    found.push(IssueKind::OutsidePage);
                }
            }
            let parent_polygon = el
                .parent
                .and_then(|p| page.get(p))
                .map(|p| &p.polygon)
                .filter(|p| is_simple(p));
            if let Some(parent) = parent_polygon {
                if el.kind.is_text_bearing() && !covers(parent, &el.polygon, COVER_TOLERANCE) {
                    found.push(IssueKind::OutsideParent);
                }
            }
        }

        if el.kind == ElementKind::TextLine {
            match &el.baseline {
                None => found.push(IssueKind::MissingBaseline),
                Some(b) if !b.is_usable() => found.push(IssueKind::InvalidBaseline),
                Some(b) if simple => {
                    let outside = points_outside(b, &el.polygon);
                    if outside > 0 {
                        found.push(IssueKind::BaselineOutsidePolygon { points: outside });
                    }
                }
                Some(_) => {}
            }
        }

        if el.kind.holds_lines() && page.lines_of(id).is_empty() {
            log::debug!("{} contains no text lines", el.name);
        }
        if el.kind.is_text_bearing() && el.has_blank_text() {
            found.push(IssueKind::EmptyText);
        }

        found
            .into_iter()
            .map(|issue| ValidationIssue::new(id, &el.name, el.kind, issue))
            .collect()
    }
}

/// Tree order first, then every element not reachable from the page.
fn visit_order(page: &Page) -> Vec<ElementId> {
    let mut order = page.tree_order();
    let mut seen: std::collections::HashSet<ElementId> = order.iter().copied().collect();
    for el in page.iter() {
        if seen.insert(el.id()) {
            order.push(el.id());
        }
    }
    order
}

// ============================================================
// Repair
// ============================================================

fn irreparable(mut entity: EntityReport, reason: String) -> Result<EntityReport> {
    entity.outcome = RepairOutcome::Irreparable(reason);
    Ok(entity)
}

/// One change applied to an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RepairAction {
    /// Vertices closer than the dedup tolerance dropped
    RemovedRepeatedPoints { points: usize },
    /// Degenerate line polygon replaced by its baseline pseudo-polygon
    SynthesizedFromBaseline,
    /// Duplicate or collinear vertices removed
    Simplified,
    /// Self-intersection loops trimmed
    ResolvedSelfIntersection,
    /// Replaced by the convex hull
    ConvexHull,
    ReversedOrientation,
    ClippedToPage,
    FittedToParent,
    DerivedBaseline,
    SnappedBaseline { points: usize },
}

/// Result of repairing one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RepairOutcome {
    Valid,
    Repaired(Vec<RepairAction>),
    Irreparable(String),
}

/// Outcome for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityReport {
    pub id: ElementId,
    pub name: String,
    pub kind: ElementKind,
    pub outcome: RepairOutcome,
    /// Problems that were noticed but need no repair
    pub warnings: Vec<String>,
}

/// Outcome of repairing a page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RepairReport {
    pub entities: Vec<EntityReport>,
    /// Names of irreparable entities removed from the page
    pub removed: Vec<String>,
}

impl RepairReport {
    pub fn valid_count(&self) -> usize {
        self.entities
            .iter()
            .filter(|e| e.outcome == RepairOutcome::Valid)
            .count()
    }

    pub fn repaired(&self) -> impl Iterator<Item = &EntityReport> {
        self.entities
            .iter()
            .filter(|e| matches!(e.outcome, RepairOutcome::Repaired(_)))
    }

    /// Irreparable entities as errors.
    pub fn irreparable(&self) -> Vec<RepairError> {
        self.entities
            .iter()
            .filter_map(|e| match &e.outcome {
                RepairOutcome::Irreparable(reason) => Some(RepairError::Irreparable {
                    name: e.name.clone(),
                    reason: reason.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Look up the outcome of an entity by name.
    pub fn outcome_of(&self, name: &str) -> Option<&RepairOutcome> {
        self.entities
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.outcome)
    }
}

/// Applies the repair table to every entity of a page.
#[derive(Debug, Clone, Default)]
pub struct Repairer {
    options: RepairOptions,
}

impl Repairer {
    /// Create a repairer; fails on invalid options.
    pub fn new(options: RepairOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &RepairOptions {
        &self.options
    }

    /// Repair every entity of the page.
    ///
    /// # Errors
    ///
    /// [`Error::MissingPageBounds`](crate::Error::MissingPageBounds) when
    /// page clipping is enabled and the page has no size; the page is not
    /// modified in that case.
    pub fn repair(&self, page: &mut Page) -> Result<RepairReport> {
        let bounds = if self.options.clip_to_page {
            Some(page.bounds()?)
        } else {
            None
        };

        let mut report = RepairReport::default();
        let mut heights: HashMap<ElementId, f64> = HashMap::new();
        for id in visit_order(page) {
            if !page.contains(id) {
                continue;
            }
            let entity = self.repair_element(page, id, bounds.as_ref(), &mut heights)?;
            if let RepairOutcome::Irreparable(reason) = &entity.outcome {
                log::warn!("{} is irreparable: {}", entity.name, reason);
            }
            report.entities.push(entity);
        }

        if self.options.remove_irreparable {
            let doomed: Vec<(ElementId, String)> = report
                .entities
                .iter()
                .filter(|e| matches!(e.outcome, RepairOutcome::Irreparable(_)))
                .map(|e| (e.id, e.name.clone()))
                .collect();
            for (id, name) in doomed {
                if page.contains(id) {
                    deletion::delete(page, id)?;
                    report.removed.push(name);
                }
            }
        }
        Ok(report)
    }

    /// Repair one entity in place.
    fn repair_element(
        &self,
        page: &mut Page,
        id: ElementId,
        bounds: Option<&Polygon>,
        heights: &mut HashMap<ElementId, f64>,
    ) -> Result<EntityReport> {
        let el = page.element(id)?.clone();
        let mut entity = EntityReport {
            id,
            name: el.name.clone(),
            kind: el.kind,
            outcome: RepairOutcome::Valid,
            warnings: Vec::new(),
        };
        if page.is_orphan(id) {
            return irreparable(
                entity,
                "parent reference is dangling or of the wrong kind".to_string(),
            );
        }

        let mut actions = Vec::new();
        let mut polygon = el.polygon.clone();
        let mut baseline = el.baseline.clone();
        let is_line = el.kind == ElementKind::TextLine;

        // Never dedup a polygon below three distinct points.
        let finite = polygon.points().iter().all(|p| p.is_finite());
        if finite && self.options.dedup_tolerance > 0.0 {
            let deduped = remove_repeated_points(&polygon, self.options.dedup_tolerance);
            if deduped.len() < polygon.len() && deduped.distinct_point_count() >= 3 {
                actions.push(RepairAction::RemovedRepeatedPoints {
                    points: polygon.len() - deduped.len(),
                });
                polygon = deduped;
            }
        }

        let validity = validate(&polygon);
        let mut degenerate = validity.has_non_finite() || validity.has_too_few_points();
        if !degenerate {
            if let Some(at) = validity.self_intersection() {
                match self.resolve_self_intersection(&polygon) {
                    Some((fixed, fixes)) => {
                        polygon = fixed;
                        actions.extend(fixes);
                    }
                    None if validity.has_zero_area() => degenerate = true,
                    None => {
                        return irreparable(
                            entity,
                            format!(
                                "self-intersection at ({:.1}, {:.1}) could not be resolved",
                                at.x, at.y
                            ),
                        );
                    }
                }
            } else if validity.has_zero_area() {
                degenerate = true;
            }
        }

        if degenerate {
            let usable = baseline.as_ref().filter(|b| b.is_usable());
            match (is_line, usable) {
                (true, Some(b)) => {
                    let height = self.line_height(page, el.parent, heights);
                    match pseudo_polygon(b, height) {
                        Ok(p) => {
                            polygon = p;
                            actions.push(RepairAction::SynthesizedFromBaseline);
                        }
                        Err(e) => return irreparable(entity, e.to_string()),
                    }
                }
                (true, None) => {
                    return irreparable(
                        entity,
                        "degenerate polygon and no usable baseline".to_string(),
                    )
                }
                (false, _) => return irreparable(entity, "degenerate polygon".to_string()),
            }
        }

        if self.options.fix_orientation && polygon.orientation() == Orientation::CounterClockwise {
            polygon = polygon.reversed();
            actions.push(RepairAction::ReversedOrientation);
        }

        if let Some(bounds) = bounds {
            if !covers(bounds, &polygon, COVER_TOLERANCE) {
                let clipped = crate::geometry::clip(&polygon, bounds);
                if clipped.is_empty() {
                    return irreparable(entity, "polygon lies outside the page bounds".to_string());
                }
                polygon = clipped;
                actions.push(RepairAction::ClippedToPage);
            }
        }

        if is_line && self.options.fit_to_parent {
            let parent_polygon = el
                .parent
                .and_then(|p| page.get(p))
                .map(|p| p.polygon.clone())
                .filter(is_simple);
            if let Some(parent) = parent_polygon {
                if !covers(&parent, &polygon, COVER_TOLERANCE) {
                    let height = self.line_height(page, el.parent, heights);
                    match fit_to_parent(&polygon, &parent, baseline.as_ref(), height) {
                        Ok(fitted) => {
                            polygon = fitted;
                            actions.push(RepairAction::FittedToParent);
                        }
                        Err(e) => entity.warnings.push(format!("not fitted to parent: {}", e)),
                    }
                }
            }
        }

        if is_line {
            if !baseline.as_ref().map_or(false, Baseline::is_usable) {
                if self.options.derive_missing_baselines {
                    if let Some(derived) = derive_baseline(&polygon) {
                        baseline = Some(derived);
                        actions.push(RepairAction::DerivedBaseline);
                    }
                } else {
                    entity.warnings.push("line has no usable baseline".to_string());
                }
            }
            if let Some(b) = &baseline {
                if self.options.snap_baselines && is_simple(&polygon) {
                    let (snapped, moved) = snap_baseline_into(b, &polygon);
                    let outside = points_outside(&snapped, &polygon);
                    if moved > 0 {
                        baseline = Some(snapped);
                        actions.push(RepairAction::SnappedBaseline { points: moved });
                    }
                    if outside > 0 {
                        entity
                            .warnings
                            .push(format!("{} baseline points remain outside", outside));
                    }
                }
            }
        }

        if el.kind.is_text_bearing() && el.has_blank_text() {
            entity.warnings.push("text is empty".to_string());
        }

        if !actions.is_empty() {
            log::debug!("repaired {}: {:?}", entity.name, actions);
            let target = page.element_mut(id)?;
            target.polygon = polygon;
            target.baseline = baseline;
            entity.outcome = RepairOutcome::Repaired(actions);
        }
        Ok(entity)
    }

    /// Simplify, then trim self-intersection loops, then (optionally) take
    /// the convex hull.
    fn resolve_self_intersection(&self, polygon: &Polygon) -> Option<(Polygon, Vec<RepairAction>)> {
        let simplified = simplify(polygon, self.options.simplify_epsilon);
        let mut actions = Vec::new();
        if simplified.len() != polygon.len() {
            actions.push(RepairAction::Simplified);
        }
        if is_simple(&simplified) {
            return Some((simplified, actions));
        }

        if let Ok(trimmed) = buffer(&simplified, 0.0) {
            if is_simple(&trimmed) {
                actions.push(RepairAction::ResolvedSelfIntersection);
                return Some((trimmed, actions));
            }
        }

        if self.options.convex_hull_fallback {
            let hull = convex_hull(polygon.points());
            if is_simple(&hull) {
                return Some((hull, vec![RepairAction::ConvexHull]));
            }
        }
        None
    }

    fn line_height(
        &self,
        page: &Page,
        container: Option<ElementId>,
        heights: &mut HashMap<ElementId, f64>,
    ) -> f64 {
        if let Some(height) = self.options.height_hint {
            return height;
        }
        match container {
            Some(c) => *heights
                .entry(c)
                .or_insert_with(|| {
                    estimate_line_height(page, c, self.options.fallback_height_ratio)
                }),
            None => super::options::DEFAULT_LINE_HEIGHT,
        }
    }
}

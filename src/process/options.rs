//! Processing options and configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Line height used when neither the lines nor their container give one.
pub const DEFAULT_LINE_HEIGHT: f64 = 32.0;

/// Options for reading-order sorting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortOptions {
    /// Maximum centroid distance between consecutive lines of one row
    pub vertical_gap: f64,

    /// Merge adjacent lines of a row closer than this (disabled if `None`)
    pub merge_gap: Option<f64>,

    /// Split a line at word gaps wider than this (disabled if `None`)
    pub split_gap: Option<f64>,

    /// Height of the pseudo-polygon used when a split part cannot be clipped
    pub height_hint: Option<f64>,
}

impl SortOptions {
    /// Create new sort options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the row threshold.
    pub fn with_vertical_gap(mut self, gap: f64) -> Self {
        self.vertical_gap = gap;
        self
    }

    /// Enable merging.
    pub fn with_merge_gap(mut self, gap: f64) -> Self {
        self.merge_gap = Some(gap);
        self
    }

    /// Enable splitting.
    pub fn with_split_gap(mut self, gap: f64) -> Self {
        self.split_gap = Some(gap);
        self
    }

    /// Enable merging and splitting with the same threshold.
    pub fn with_horizontal_gap(mut self, gap: f64) -> Self {
        self.merge_gap = Some(gap);
        self.split_gap = Some(gap);
        self
    }

    /// Set the fallback line height for re-fitted split parts.
    pub fn with_height_hint(mut self, height: f64) -> Self {
        self.height_hint = Some(height);
        self
    }

    /// Whether some word gaps qualify for both merging and splitting.
    pub fn has_overlapping_gaps(&self) -> bool {
        matches!((self.merge_gap, self.split_gap), (Some(m), Some(s)) if m > s)
    }

    /// Reject non-finite or negative thresholds.
    pub fn validate(&self) -> Result<()> {
        Error::check_threshold("vertical_gap", self.vertical_gap)?;
        if let Some(gap) = self.merge_gap {
            Error::check_threshold("merge_gap", gap)?;
        }
        if let Some(gap) = self.split_gap {
            Error::check_threshold("split_gap", gap)?;
        }
        if let Some(height) = self.height_hint {
            check_positive("height_hint", height)?;
        }
        Ok(())
    }
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            vertical_gap: 10.0,
            merge_gap: None,
            split_gap: None,
            height_hint: None,
        }
    }
}

/// Options for baseline and line-polygon processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineOptions {
    /// Longest distance an endpoint may be moved by `extend`
    pub max_extension: f64,

    /// Pseudo-polygon height; estimated per container when `None`
    pub height_hint: Option<f64>,

    /// Share of the container height used when no line height is known
    pub fallback_height_ratio: f64,

    /// Distance under which an endpoint already touches its boundary
    pub epsilon: f64,
}

impl BaselineOptions {
    /// Create new baseline options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum extension.
    pub fn with_max_extension(mut self, max_extension: f64) -> Self {
        self.max_extension = max_extension;
        self
    }

    /// Use a fixed pseudo-polygon height.
    pub fn with_height_hint(mut self, height: f64) -> Self {
        self.height_hint = Some(height);
        self
    }

    /// Set the fallback height ratio.
    pub fn with_fallback_height_ratio(mut self, ratio: f64) -> Self {
        self.fallback_height_ratio = ratio;
        self
    }

    /// Set the touch tolerance.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn validate(&self) -> Result<()> {
        Error::check_threshold("max_extension", self.max_extension)?;
        Error::check_threshold("epsilon", self.epsilon)?;
        if let Some(height) = self.height_hint {
            check_positive("height_hint", height)?;
        }
        check_ratio("fallback_height_ratio", self.fallback_height_ratio)
    }
}

impl Default for BaselineOptions {
    fn default() -> Self {
        Self {
            max_extension: 1000.0,
            height_hint: None,
            fallback_height_ratio: 0.1,
            epsilon: 0.5,
        }
    }
}

/// Options for offsetting line polygons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferOptions {
    /// Offset distance (positive grows, negative shrinks)
    pub distance: f64,

    /// Clip the offset polygon to the line's container
    pub fit_to_parent: bool,

    /// Cut overlapping consecutive lines apart after offsetting
    pub separate_overlaps: bool,
}

impl BufferOptions {
    pub fn new(distance: f64) -> Self {
        Self {
            distance,
            fit_to_parent: true,
            separate_overlaps: true,
        }
    }

    /// Enable or disable clipping to the container.
    pub fn with_fit_to_parent(mut self, fit: bool) -> Self {
        self.fit_to_parent = fit;
        self
    }

    /// Enable or disable cutting overlapping neighbours apart.
    pub fn with_separate_overlaps(mut self, separate: bool) -> Self {
        self.separate_overlaps = separate;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.distance.is_finite() {
            return Err(Error::Config(format!(
                "buffer distance must be finite, got {}",
                self.distance
            )));
        }
        Ok(())
    }
}

impl Default for BufferOptions {
    fn default() -> Self {
        Self::new(16.0)
    }
}

/// Options for validation and repair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairOptions {
    /// Reverse polygons with negative orientation
    pub fix_orientation: bool,

    /// Clip polygons that leave the page bounds
    pub clip_to_page: bool,

    /// Re-fit line polygons that leave their container
    pub fit_to_parent: bool,

    /// Derive a baseline for lines without one
    pub derive_missing_baselines: bool,

    /// Move baseline points that lie outside the line polygon
    pub snap_baselines: bool,

    /// Fall back to the convex hull for unresolvable self-intersections
    pub convex_hull_fallback: bool,

    /// Remove irreparable entities instead of leaving them in place
    pub remove_irreparable: bool,

    /// Area tolerance for vertex simplification
    pub simplify_epsilon: f64,

    /// Pseudo-polygon height for degenerate lines; estimated when `None`
    pub height_hint: Option<f64>,

    /// Share of the container height used when no line height is known
    pub fallback_height_ratio: f64,

    /// Vertices closer than this to their predecessor are dropped
    /// (0 disables)
    pub dedup_tolerance: f64,
}

impl RepairOptions {
    /// Create new repair options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clip_to_page(mut self, clip: bool) -> Self {
        self.clip_to_page = clip;
        self
    }

    pub fn with_fit_to_parent(mut self, fit: bool) -> Self {
        self.fit_to_parent = fit;
        self
    }

    pub fn with_derive_missing_baselines(mut self, derive: bool) -> Self {
        self.derive_missing_baselines = derive;
        self
    }

    pub fn with_snap_baselines(mut self, snap: bool) -> Self {
        self.snap_baselines = snap;
        self
    }

    pub fn with_convex_hull_fallback(mut self, enabled: bool) -> Self {
        self.convex_hull_fallback = enabled;
        self
    }

    pub fn with_remove_irreparable(mut self, remove: bool) -> Self {
        self.remove_irreparable = remove;
        self
    }

    pub fn with_simplify_epsilon(mut self, epsilon: f64) -> Self {
        self.simplify_epsilon = epsilon;
        self
    }

    pub fn with_height_hint(mut self, height: f64) -> Self {
        self.height_hint = Some(height);
        self
    }

    pub fn with_fallback_height_ratio(mut self, ratio: f64) -> Self {
        self.fallback_height_ratio = ratio;
        self
    }

    pub fn with_dedup_tolerance(mut self, tolerance: f64) -> Self {
        self.dedup_tolerance = tolerance;
        self
    }

    /// Only repair broken polygons; orientation, page overflow and
    /// baselines are left as parsed.
    pub fn structural_only() -> Self {
        Self {
            fix_orientation: false,
            clip_to_page: false,
            fit_to_parent: false,
            derive_missing_baselines: false,
            snap_baselines: false,
            dedup_tolerance: 0.0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        Error::check_threshold("simplify_epsilon", self.simplify_epsilon)?;
        Error::check_threshold("dedup_tolerance", self.dedup_tolerance)?;
        if let Some(height) = self.height_hint {
            check_positive("height_hint", height)?;
        }
        check_ratio("fallback_height_ratio", self.fallback_height_ratio)
    }
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            fix_orientation: true,
            clip_to_page: true,
            fit_to_parent: false,
            derive_missing_baselines: false,
            snap_baselines: true,
            convex_hull_fallback: false,
            remove_irreparable: false,
            simplify_epsilon: 1.0,
            height_hint: None,
            fallback_height_ratio: 0.1,
            dedup_tolerance: 1.0,
        }
    }
}

/// Hierarchy level addressed by deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletionLevel {
    /// Text regions, table regions and their contents
    Region,
    /// Text lines
    Line,
    /// Words
    Word,
}

impl fmt::Display for DeletionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeletionLevel::Region => "region",
            DeletionLevel::Line => "line",
            DeletionLevel::Word => "word",
        })
    }
}

impl FromStr for DeletionLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "region" => Ok(DeletionLevel::Region),
            "line" => Ok(DeletionLevel::Line),
            "word" => Ok(DeletionLevel::Word),
            other => Err(Error::Config(format!("unknown deletion level: {}", other))),
        }
    }
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    Error::check_threshold(name, value)?;
    if value == 0.0 {
        return Err(Error::Config(format!("{} must be positive", name)));
    }
    Ok(())
}

fn check_ratio(name: &str, value: f64) -> Result<()> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(Error::Config(format!("{} must be in (0, 1], got {}", name, value)));
    }
    Ok(())
}

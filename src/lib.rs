//! # layoutfix
//!
//! Geometry repair and reading-order engine for scanned-page layout trees.
//!
//! A page is a tree of regions, table cells, text lines, words and glyphs,
//! each carrying a polygon (and lines a baseline). This library validates
//! and repairs that geometry, fits lines to their containers, recomputes the
//! reading order and deletes entities while keeping text consistent.
//!
//! ## Quick Start
//!
//! ```no_run
//! use layoutfix::{Page, Pipeline, Polygon, SortOptions};
//!
//! fn main() -> layoutfix::Result<()> {
//!     let mut page = Page::new(2480.0, 3508.0);
//!     let region = page.add_text_region("r1", Polygon::rectangle(100.0, 100.0, 2300.0, 900.0));
//!     page.add_line(region, "r1_l1", Polygon::rectangle(120.0, 120.0, 2200.0, 180.0))?;
//!
//!     let report = Pipeline::new()
//!         .repair(Default::default())
//!         .sort(SortOptions::new().with_merge_gap(15.0))
//!         .run(&mut page)?;
//!     println!("{} steps, text:\n{}", report.steps.len(), page.plain_text());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Geometry kernel**: buffering, clipping, validity checks, simplification
//! - **Baselines**: extension to the parent boundary, pseudo-polygons, fitting
//! - **Reading order**: row grouping, line merging and splitting
//! - **Repair**: per-entity outcomes with optional removal of broken entities
//! - **Batch processing**: one document per worker on a fixed-size pool

pub mod batch;
pub mod error;
pub mod geometry;
pub mod model;
pub mod process;

// Re-export commonly used types
pub use batch::{BatchOptions, BatchProcessor, BatchReport, CancelToken, DocumentStatus};
pub use error::{Error, GeometryError, RepairError, Result};
pub use geometry::{BBox, Baseline, Orientation, Point, Polygon, Vector};
pub use model::{Element, ElementId, ElementKind, Page};
pub use process::{
    BaselineOptions, BaselineProcessor, BufferOptions, DeletionLevel, DeletionReport,
    ProcessReport, ReadingOrderSorter, RepairOptions, RepairReport, Repairer, SortOptions,
    SortReport, ValidationIssue, Validator,
};

use serde::{Deserialize, Serialize};

/// Validate a page without modifying it.
pub fn validate_page(page: &Page) -> Vec<ValidationIssue> {
    Validator::new().validate(page)
}

/// Repair a page with default options.
pub fn repair_page(page: &mut Page) -> Result<RepairReport> {
    Repairer::default().repair(page)
}

/// Sort every container of a page with default options.
pub fn sort_page(page: &mut Page) -> Result<SortReport> {
    ReadingOrderSorter::default().sort_page(page)
}

/// One configured pipeline step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Step {
    Repair(RepairOptions),
    Sort(SortOptions),
    ExtendBaselines(BaselineOptions),
    PseudoPolygons(BaselineOptions),
    FitLines(BaselineOptions),
    BufferLines(BufferOptions),
    SeparateLines,
    DeleteLevel(DeletionLevel),
    ClearText(DeletionLevel),
}

impl Step {
    fn validate(&self) -> Result<()> {
        match self {
            Step::Repair(o) => o.validate(),
            Step::Sort(o) => o.validate(),
            Step::ExtendBaselines(o) | Step::PseudoPolygons(o) | Step::FitLines(o) => o.validate(),
            Step::BufferLines(o) => o.validate(),
            Step::SeparateLines | Step::DeleteLevel(_) | Step::ClearText(_) => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Step::Repair(_) => "repair",
            Step::Sort(_) => "sort",
            Step::ExtendBaselines(_) => "extend baselines",
            Step::PseudoPolygons(_) => "pseudo-polygons",
            Step::FitLines(_) => "fit lines",
            Step::BufferLines(_) => "buffer lines",
            Step::SeparateLines => "separate lines",
            Step::DeleteLevel(_) => "delete level",
            Step::ClearText(_) => "clear text",
        }
    }
}

/// Report of one executed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepReport {
    Repair(RepairReport),
    Sort(SortReport),
    Baseline(ProcessReport),
    Deletion(DeletionReport),
    /// Number of elements whose text was erased
    ClearedText(usize),
}

/// Reports of every step, in execution order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineReport {
    pub steps: Vec<StepReport>,
}

/// Builder running a sequence of processing steps on a page.
///
/// # Example
///
/// ```no_run
/// use layoutfix::{BaselineOptions, DeletionLevel, Page, Pipeline};
///
/// let mut page = Page::new(1000.0, 1000.0);
/// let report = Pipeline::new()
///     .extend_baselines(BaselineOptions::new().with_max_extension(50.0))
///     .fit_lines(BaselineOptions::new())
///     .delete_level(DeletionLevel::Word)
///     .run(&mut page)?;
/// # Ok::<(), layoutfix::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    steps: Vec<Step>,
}

impl Pipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    fn then(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Validate and repair every entity.
    pub fn repair(self, options: RepairOptions) -> Self {
        self.then(Step::Repair(options))
    }

    /// Recompute the reading order of every container.
    pub fn sort(self, options: SortOptions) -> Self {
        self.then(Step::Sort(options))
    }

    /// Extend baselines to their container boundary.
    pub fn extend_baselines(self, options: BaselineOptions) -> Self {
        self.then(Step::ExtendBaselines(options))
    }

    /// Replace line polygons by baseline pseudo-polygons.
    pub fn pseudo_polygons(self, options: BaselineOptions) -> Self {
        self.then(Step::PseudoPolygons(options))
    }

    /// Fit line polygons into their containers.
    pub fn fit_lines(self, options: BaselineOptions) -> Self {
        self.then(Step::FitLines(options))
    }

    /// Grow or shrink line polygons.
    pub fn buffer_lines(self, options: BufferOptions) -> Self {
        self.then(Step::BufferLines(options))
    }

    /// Cut overlapping consecutive lines apart.
    pub fn separate_lines(self) -> Self {
        self.then(Step::SeparateLines)
    }

    /// Delete every element of a level.
    pub fn delete_level(self, level: DeletionLevel) -> Self {
        self.then(Step::DeleteLevel(level))
    }

    /// Erase text at a level, keeping geometry.
    pub fn clear_text(self, level: DeletionLevel) -> Self {
        self.then(Step::ClearText(level))
    }

    /// Configured steps.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Check every step's options.
    pub fn validate(&self) -> Result<()> {
        self.steps.iter().try_for_each(Step::validate)
    }

    /// Run all steps in order.
    ///
    /// Options of every step are validated before the page is touched. A
    /// failing step aborts the run; earlier steps stay applied.
    pub fn run(&self, page: &mut Page) -> Result<PipelineReport> {
        self.validate()?;
        let mut report = PipelineReport::default();
        for step in &self.steps {
            log::debug!("running step: {}", step.name());
            let step_report = match step {
                Step::Repair(o) => StepReport::Repair(Repairer::new(o.clone())?.repair(page)?),
                Step::Sort(o) => StepReport::Sort(ReadingOrderSorter::new(o.clone())?.sort_page(page)?),
                Step::ExtendBaselines(o) => {
                    StepReport::Baseline(BaselineProcessor::new(o.clone())?.extend_baselines(page)?)
                }
                Step::PseudoPolygons(o) => {
                    StepReport::Baseline(BaselineProcessor::new(o.clone())?.pseudo_polygons(page)?)
                }
                Step::FitLines(o) => StepReport::Baseline(
                    BaselineProcessor::new(o.clone())?.fit_lines_to_parents(page)?,
                ),
                Step::BufferLines(o) => {
                    StepReport::Baseline(BaselineProcessor::default().buffer_lines(page, o)?)
                }
                Step::SeparateLines => StepReport::Baseline(
                    BaselineProcessor::default().separate_overlapping_lines(page)?,
                ),
                Step::DeleteLevel(level) => {
                    StepReport::Deletion(process::delete_level(page, *level)?)
                }
                Step::ClearText(level) => StepReport::ClearedText(process::clear_text(page, *level)),
            };
            report.steps.push(step_report);
        }
        Ok(report)
    }
}

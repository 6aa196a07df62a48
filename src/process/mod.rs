//! Page processors: baseline operations, reading-order sorting,
//! validation/repair and deletion.
//!
//! Every processor works on one `&mut Page` at a time and reports per-entity
//! failures instead of aborting the page.

pub mod baseline;
pub mod deletion;
mod options;
pub mod reading_order;
pub mod repair;
mod report;

pub use baseline::BaselineProcessor;
pub use deletion::{clear_text, delete, delete_level, DeletionReport};
pub use options::{
    BaselineOptions, BufferOptions, DeletionLevel, RepairOptions, SortOptions,
    DEFAULT_LINE_HEIGHT,
};
pub use reading_order::{merge_lines, MergeRecord, ReadingOrderSorter, SortReport, SplitRecord};
pub use repair::{
    EntityReport, IssueKind, RepairAction, RepairOutcome, RepairReport, Repairer, Severity,
    ValidationIssue, Validator,
};
pub use report::{ProcessReport, SkippedEntity};

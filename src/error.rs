//! Error types for layoutfix.

use std::io;
use thiserror::Error;

/// Result type alias for layoutfix operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of a single geometric operation.
///
/// The operation that raised it leaves its input untouched, so callers can
/// always fall back to the unmodified shape.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// No positive-area simple shape remains.
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    /// The input cannot be processed at all (too few points, NaN, ...).
    #[error("invalid geometry input: {0}")]
    InvalidInput(String),
}

/// Structural inconsistencies that repair cannot fix.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepairError {
    /// The entity was flagged and left in place (or removed on request).
    #[error("{name} is irreparable: {reason}")]
    Irreparable {
        /// Document Model identifier of the entity
        name: String,
        /// Why no repair applies
        reason: String,
    },
}

/// Error types that can occur while processing a page.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Geometric operation failed.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Entity could not be repaired.
    #[error(transparent)]
    Repair(#[from] RepairError),

    /// Invalid threshold or distance, rejected before any mutation.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Referenced element does not exist in the page.
    #[error("Element not found: {0}")]
    MissingElement(String),

    /// Serialized page whose hierarchy links are inconsistent.
    #[error("Invalid page structure: {0}")]
    InvalidPage(String),

    /// Page has no usable bounds.
    #[error("Page bounds missing or empty ({0} x {1})")]
    MissingPageBounds(f64, f64),

    /// Processing of a document was cancelled.
    #[error("Processing cancelled: {0}")]
    Cancelled(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Check a distance-like threshold: finite and non-negative.
    pub(crate) fn check_threshold(name: &str, value: f64) -> Result<()> {
        if !value.is_finite() || value < 0.0 {
            return Err(Error::Config(format!(
                "{} must be a finite non-negative distance, got {}",
                name, value
            )));
        }
        Ok(())
    }
}

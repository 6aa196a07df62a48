//! Per-page processing reports.

use crate::model::ElementId;
use serde::{Deserialize, Serialize};

/// An entity a driver left unchanged, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedEntity {
    pub id: ElementId,
    pub name: String,
    pub reason: String,
}

/// Outcome of a page-level driver.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessReport {
    /// Entities that were changed
    pub processed: usize,

    /// Entities left as they were
    pub skipped: Vec<SkippedEntity>,
}

impl ProcessReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a skipped entity and log it.
    pub(crate) fn skip(&mut self, id: ElementId, name: &str, reason: impl Into<String>) {
        let reason = reason.into();
        log::warn!("skipping {}: {}", name, reason);
        self.skipped.push(SkippedEntity {
            id,
            name: name.to_string(),
            reason,
        });
    }

    /// Whether every entity was processed.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

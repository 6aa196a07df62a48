//! Parallel processing of independent documents.
//!
//! Each document is loaded, processed and committed by a single worker.
//! Workers pull document ids from a shared queue; a document whose
//! processing fails or is cancelled is dropped without being committed.

use crate::error::{Error, Result};
use crate::model::Page;
use crossbeam_channel::unbounded;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared cancellation flag, checked between documents and available to
/// the processing closure.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of every document not yet committed.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Error::Cancelled)` once cancellation was requested.
    pub fn check(&self, document: &str) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled(document.to_string()));
        }
        Ok(())
    }
}

/// Options for [`BatchProcessor`].
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Worker threads (0 = one per CPU)
    pub workers: usize,
}

impl BatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

/// Final state of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DocumentStatus {
    Committed,
    Failed(String),
    Cancelled,
}

/// Outcome of one document of a batch.
#[derive(Debug, Clone)]
pub struct DocumentOutcome<R> {
    pub id: String,
    pub status: DocumentStatus,
    /// Value returned by the processing closure, for committed documents
    pub result: Option<R>,
    pub elapsed: Duration,
}

/// Outcomes of a batch, in input order.
#[derive(Debug, Clone)]
pub struct BatchReport<R> {
    pub documents: Vec<DocumentOutcome<R>>,
}

impl<R> BatchReport<R> {
    fn count(&self, pred: impl Fn(&DocumentStatus) -> bool) -> usize {
        self.documents.iter().filter(|d| pred(&d.status)).count()
    }

    pub fn committed(&self) -> usize {
        self.count(|s| *s == DocumentStatus::Committed)
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, DocumentStatus::Failed(_)))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|s| *s == DocumentStatus::Cancelled)
    }

    /// Look up the outcome of a document.
    pub fn get(&self, id: &str) -> Option<&DocumentOutcome<R>> {
        self.documents.iter().find(|d| d.id == id)
    }
}

/// Runs load/process/commit over many documents on a fixed-size pool.
#[derive(Debug, Clone, Default)]
pub struct BatchProcessor {
    options: BatchOptions,
    cancel: CancelToken,
}

impl BatchProcessor {
    pub fn new(options: BatchOptions) -> Self {
        Self {
            options,
            cancel: CancelToken::new(),
        }
    }

    /// Token that cancels this processor's batches.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Process every document in `ids`.
    ///
    /// `load` builds the page, `process` mutates it and `commit` persists
    /// it. Failures are recorded per document; only pool creation can fail
    /// the whole batch.
    pub fn run<I, L, P, C, R>(&self, ids: I, load: L, process: P, commit: C) -> Result<BatchReport<R>>
    where
        I: IntoIterator,
        I::Item: Into<String>,
        L: Fn(&str) -> Result<Page> + Sync,
        P: Fn(&mut Page, &CancelToken) -> Result<R> + Sync,
        C: Fn(&str, &Page) -> Result<()> + Sync,
        R: Send,
    {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.options.workers)
            .build()
            .map_err(|e| Error::Other(format!("failed to build worker pool: {}", e)))?;

        let (work_tx, work_rx) = unbounded::<(usize, String)>();
        let mut total = 0;
        for (index, id) in ids.into_iter().enumerate() {
            // The receiver is alive, so sending cannot fail.
            let _ = work_tx.send((index, id.into()));
            total += 1;
        }
        drop(work_tx);
        let workers = pool.current_num_threads();
        log::info!("processing {} documents on {} workers", total, workers);

        let (done_tx, done_rx) = unbounded::<(usize, DocumentOutcome<R>)>();
        let (load, process, commit) = (&load, &process, &commit);
        pool.scope(|scope| {
            for _ in 0..workers {
                let work_rx = work_rx.clone();
                let done_tx = done_tx.clone();
                scope.spawn(move |_| {
                    while let Ok((index, id)) = work_rx.recv() {
                        let outcome = self.run_one(id, load, process, commit);
                        let _ = done_tx.send((index, outcome));
                    }
                });
            }
        });
        drop(done_tx);

        let mut finished: Vec<(usize, DocumentOutcome<R>)> = done_rx.into_iter().collect();
        finished.sort_by_key(|(index, _)| *index);
        let report = BatchReport {
            documents: finished.into_iter().map(|(_, outcome)| outcome).collect(),
        };
        log::info!(
            "batch finished: {} committed, {} failed, {} cancelled",
            report.committed(),
            report.failed(),
            report.cancelled()
        );
        Ok(report)
    }

    fn run_one<L, P, C, R>(&self, id: String, load: &L, process: &P, commit: &C) -> DocumentOutcome<R>
    where
        L: Fn(&str) -> Result<Page>,
        P: Fn(&mut Page, &CancelToken) -> Result<R>,
        C: Fn(&str, &Page) -> Result<()>,
    {
        let start = Instant::now();
        let finish = |id: String, status: DocumentStatus, result: Option<R>| DocumentOutcome {
            id,
            status,
            result,
            elapsed: start.elapsed(),
        };

        if self.cancel.is_cancelled() {
            return finish(id, DocumentStatus::Cancelled, None);
        }

        // A panic in any closure fails this document only.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            load(&id).and_then(|mut page| {
                let result = process(&mut page, &self.cancel)?;
                self.cancel.check(&id)?;
                commit(&id, &page)?;
                Ok(result)
            })
        }))
        .unwrap_or_else(|payload| Err(Error::Other(format!("panicked: {}", panic_message(&*payload)))));

        match outcome {
            Ok(result) => {
                log::debug!("committed {}", id);
                finish(id, DocumentStatus::Committed, Some(result))
            }
            Err(Error::Cancelled(_)) => {
                log::info!("cancelled {}", id);
                finish(id, DocumentStatus::Cancelled, None)
            }
            Err(e) => {
                log::warn!("document {} failed: {}", id, e);
                finish(id, DocumentStatus::Failed(e.to_string()), None)
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// Read a page stored as JSON.
pub fn read_page<P: AsRef<Path>>(path: P) -> Result<Page> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Write a page as JSON.
pub fn write_page<P: AsRef<Path>>(path: P, page: &Page) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, page)?;
    Ok(())
}

//! Services module - Pure business logic for the scan-and-merge workflow.
//!
//! The services are **framework-agnostic**: they know nothing about the menu,
//! the terminal or configuration files. Everything they need is passed in
//! explicitly, usually through a [`ProcessContext`].
//!
//! # Components
//!
//! - [`lock`]: One-process-per-watch-folder guard
//! - [`discovery`]: Deterministic listing of candidate PDFs
//! - [`placement`]: Conflict-safe move/copy and multi-destination fan-out
//! - [`routing`]: Archive, delete or error disposal of source files
//! - [`pdf`]: The [`PdfEngine`] seam and its `lopdf` implementation
//! - [`validation`]: Cheap file checks followed by a structural PDF check
//! - [`single`]: The single-file pipeline
//! - [`merge`]: The [`MergeOrchestrator`] interleave state machine
//!
//! # Failure handling
//!
//! Pipelines handle their own failures: implicated sources are already in the
//! error folder by the time a [`ProcessError`] is returned. Callers only have
//! to report it and count it (see [`ProcessError::is_failure`]).

pub mod discovery;
pub mod lock;
pub mod merge;
pub mod pdf;
pub mod placement;
pub mod routing;
pub mod single;
pub mod validation;

pub use discovery::{count_candidates, format_size, human_size, list_candidates};
pub use lock::{DirectoryLock, LockError, LockManager};
pub use merge::MergeOrchestrator;
pub use pdf::{LopdfEngine, PageSelection, PdfEngine, PdfError};
pub use placement::{FanOut, PlacementError};
pub use single::process_single_file;
pub use validation::ValidationError;

use crate::models::{Operation, WatchedDirectorySet};
use camino::Utf8PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Terminal outcome of a failed single-file or merge attempt.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("No PDF files found")]
    NoFiles,

    #[error("Need at least 2 PDF files to merge (found {0})")]
    NotEnoughFiles(usize),

    #[error("Failed to list PDF files: {0:#}")]
    Discovery(anyhow::Error),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Page count mismatch: {first} has {first_pages} pages, {second} has {second_pages} pages")]
    PageCountMismatch {
        first: String,
        first_pages: usize,
        second: String,
        second_pages: usize,
    },

    #[error("Failed to compose merged PDF: {0}")]
    Compose(#[from] PdfError),

    #[error("Output placement failed: {0}")]
    Placement(#[from] PlacementError),
}

impl ProcessError {
    /// Whether this counts as a failed operation. Having nothing to process
    /// is an idle state, not a failure.
    pub fn is_failure(&self) -> bool {
        !matches!(
            self,
            ProcessError::NoFiles | ProcessError::NotEnoughFiles(_) | ProcessError::Discovery(_)
        )
    }
}

/// Everything a pipeline needs for one run.
pub struct ProcessContext<'a, E: PdfEngine + ?Sized> {
    pub engine: &'a E,
    pub dirs: &'a WatchedDirectorySet,
    pub archive_mode: bool,
}

/// A completed operation, ready to be recorded for undo.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub description: String,
    pub operation: Operation,
    /// Partial placement and disposal problems that did not fail the operation.
    pub warnings: Vec<String>,
}

/// Structured `operation` event, one per attempted operation.
pub(crate) fn log_operation(kind: &str, first: &str, second: &str, result: &str) {
    tracing::info!(
        target: "blendpdf::operation",
        kind,
        first,
        second,
        result,
        "OPERATION: {} | {} {} | {}",
        kind,
        first,
        second,
        result
    );
}

/// Structured `performance` event with throughput in MB/s.
pub(crate) fn log_performance(kind: &str, duration: Duration, bytes: u64) {
    let seconds = duration.as_secs_f64();
    let mb_per_sec = if seconds > 0.0 {
        bytes as f64 / (1024.0 * 1024.0) / seconds
    } else {
        0.0
    };

    tracing::info!(
        target: "blendpdf::performance",
        kind,
        duration_ms = duration.as_millis() as u64,
        bytes,
        mb_per_sec,
        "PERFORMANCE: {} | Duration: {:?} | Size: {} bytes | Speed: {:.2} MB/s",
        kind,
        duration,
        bytes,
        mb_per_sec
    );
}

/// Move `sources` to the error folder and log the failed operation.
pub(crate) fn fail_sources(
    dirs: &WatchedDirectorySet,
    kind: &str,
    sources: &[Utf8PathBuf],
    error: ProcessError,
) -> ProcessError {
    tracing::error!("{} failed: {}", kind, error);

    let names: Vec<&str> = sources.iter().filter_map(|p| p.file_name()).collect();
    log_operation(
        kind,
        names.first().copied().unwrap_or_default(),
        names.get(1).copied().unwrap_or_default(),
        "FAILED",
    );

    routing::route_failure(sources, &dirs.error);
    error
}
